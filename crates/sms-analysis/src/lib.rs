//! SMS Analysis - from a sampled sound to a sinusoids-plus-noise model
//!
//! The analysis runs one frame at a time through a fixed delay ring:
//!
//! - [`transform`] - Real FFT providers behind one trait
//! - [`spectrum`] - Zero-phase windowed spectra in polar form and their inverse
//! - [`buffer`] - Sliding window over the source sound
//! - [`sequencer`] - Frame centers, window sizes and the slot ring
//! - [`peaks`] - Spectral peak picking
//! - [`fundamental`] - Fundamental estimation from peaks
//! - [`tracking`] - Peak continuation into tracks
//! - [`clean`] - Removal of short tracks
//! - [`stochastic`] - Residual extraction and its stochastic model
//! - [`session`] - The whole analysis of one sound
//!
//! Peak detection, fundamental estimation and peak continuation are traits,
//! so an [`AnalysisSession`] can run with other algorithms.
//!
//! ## Example
//!
//! ```rust
//! use sms_analysis::{AnalysisParams, AnalysisSession};
//!
//! let params = AnalysisParams {
//!     sample_rate: 8000,
//!     frame_rate: 100,
//!     tracks: 8,
//!     guides: 12,
//!     highest_frequency: 3500.0,
//!     analysis_delay: 4,
//!     ..Default::default()
//! };
//! let tone: Vec<f32> = (0..8000)
//!     .map(|i| 0.5 * (std::f32::consts::TAU * 220.0 * i as f32 / 8000.0).sin())
//!     .collect();
//!
//! let mut session = AnalysisSession::new(params).unwrap();
//! let model = session.analyze(&tone).unwrap();
//! assert!(model.header.frame_count > 50);
//! ```

pub mod buffer;
pub mod clean;
pub mod fundamental;
pub mod params;
pub mod peaks;
pub mod sequencer;
pub mod session;
pub mod spectrum;
pub mod stochastic;
pub mod tracking;
pub mod transform;

pub use buffer::SoundBuffer;
pub use clean::TrackCleaner;
pub use fundamental::{FundamentalEstimator, ReferencePeakEstimator};
pub use params::{AnalysisParams, MAX_PEAKS, MAX_WINDOW};
pub use peaks::{LocalMaximumDetector, PeakDetector};
pub use sequencer::{AnalysisFrame, FrameSequencer, FrameStatus, SequencerConfig};
pub use session::AnalysisSession;
pub use spectrum::{OVERSAMPLING_FACTOR, SpectrumEngine, analysis_transform_size};
pub use stochastic::{ResidualEnergy, StochasticAnalyzer};
pub use tracking::{ContinuationSettings, GuideContinuation, PeakContinuation};
pub use transform::{
    HalfSizeRealTransform, PlannedTransform, TransformProvider, TransformStrategy,
};
