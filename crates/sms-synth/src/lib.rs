//! SMS Synth - resynthesis of spectral models
//!
//! This crate turns the frames produced by `sms-analysis` back into sound:
//! sinusoidal tracks through an oscillator bank or inverse-transform lobe
//! synthesis, the stochastic part as shaped noise, all overlap-added one hop
//! at a time.
//!
//! # Core Components
//!
//! ## Frame Synthesis
//!
//! - [`Synthesizer`] - One hop of audio per model frame
//! - [`SynthesisParams`] - Scratch buffers and frame history, resizable with
//!   [`SynthesisParams::change_hop`]
//! - [`OscillatorBank`] / [`advance_phases`] - Table-lookup oscillators with
//!   linear frequency and amplitude ramps
//! - [`synthesize_lobes`] - Blackman-Harris main lobes through an inverse
//!   transform
//! - [`StochasticSynthesis`] - Noise shaped by the stochastic coefficients
//!
//! ## Scheduling
//!
//! - [`ResynthesisScheduler`] - Output length, time stretch and frame
//!   interpolation over a [`FrameSource`](sms_core::FrameSource)
//!
//! ## Settings
//!
//! - [`SynthesisConfig`] - Output rate, mode, method, hop, stretch, gain and
//!   transposition
//!
//! # Example
//!
//! ```rust
//! use sms_core::{ModelFormat, ModelFrame, ModelHeader, SpectralModel, StochasticType};
//! use sms_synth::{ResynthesisScheduler, SynthesisConfig, Synthesizer};
//!
//! let header = ModelHeader {
//!     sample_rate: 8000,
//!     frame_rate: 100,
//!     format: ModelFormat::Inharmonic,
//!     tracks: 1,
//!     stochastic: StochasticType::None,
//!     ..Default::default()
//! };
//! let frames = (0..50)
//!     .map(|_| {
//!         let mut frame = ModelFrame::new(header.layout()).unwrap();
//!         frame.freq_mut()[0] = 440.0;
//!         frame.amp_mut()[0] = 90.0;
//!         frame
//!     })
//!     .collect();
//! let mut model = SpectralModel::new(header, frames);
//!
//! let config = SynthesisConfig::default();
//! let scheduler = ResynthesisScheduler::new(&model.header, &config);
//! assert_eq!(scheduler.output_sample_count(), 50 * 80);
//! let mut synth = Synthesizer::new(&model.header, &config).unwrap();
//! let audio = scheduler.render(&mut model, &mut synth).unwrap();
//! assert_eq!(audio.len(), 50 * 80);
//! ```

pub mod config;
pub mod ifft;
pub mod params;
pub mod scheduler;
pub mod sine;
pub mod stochastic;
pub mod synthesizer;

pub use config::{
    DeterministicMethod, MAX_HOP_SIZE, MIN_HOP_SIZE, SynthesisConfig, SynthesisMode,
};
pub use ifft::{LOBE_HALF_WIDTH, add_lobe, bh92_lobe, synthesize_lobes};
pub use params::SynthesisParams;
pub use scheduler::ResynthesisScheduler;
pub use sine::{OscillatorBank, advance_phases, phase_advance};
pub use stochastic::StochasticSynthesis;
pub use synthesizer::Synthesizer;
