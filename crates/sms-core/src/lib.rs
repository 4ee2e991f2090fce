//! SMS Core - data model for spectral modeling synthesis
//!
//! This crate holds the types shared by analysis and resynthesis: the frame
//! block that stores one instant of a sinusoids-plus-noise model, the header
//! that sizes it, and the numeric conventions both directions must agree on.
//!
//! # Core Abstractions
//!
//! ## Model Data
//!
//! - [`ModelFrame`] - One contiguous block of track and stochastic data
//! - [`FrameLayout`] - Field offsets fixed at allocation time
//! - [`ModelHeader`] - Model description; sizes every stored frame
//! - [`FrameSource`] - Random access to frames by index
//! - [`SpectralModel`] - A complete model held in memory
//!
//! ## Numeric Conventions
//!
//! - [`MagnitudeScale`] - Session-local dB scale anchored at a threshold
//! - [`next_power_of_two`] - Transform sizing
//! - [`WindowType`] / [`scale_window`] - Analysis and synthesis windows
//! - [`SineTable`] - Lookup table for oscillator banks
//! - [`PreEmphasis`] / [`DeEmphasis`] - First-order spectral tilt and its inverse
//!
//! ## Errors
//!
//! Every fallible operation returns [`Result`]; allocation goes through
//! [`zeroed`] so running out of memory is an [`Error::Allocation`] rather than
//! an abort.
//!
//! # Example
//!
//! ```rust
//! use sms_core::{ModelFrame, ModelHeader, MagnitudeScale};
//!
//! let header = ModelHeader { tracks: 8, stochastic_coefficients: 32, ..Default::default() };
//! let mut frame = ModelFrame::new(header.layout()).unwrap();
//!
//! let scale = MagnitudeScale::default();
//! frame.freq_mut()[0] = 440.0;
//! frame.amp_mut()[0] = scale.mag_to_db(0.5);
//! assert_eq!(frame.active_tracks(), 1);
//! ```

pub mod emphasis;
pub mod error;
pub mod frame;
pub mod header;
pub mod math;
pub mod model;
pub mod peak;
pub mod sine_table;
pub mod window;

pub use emphasis::{DeEmphasis, EMPHASIS_COEFFICIENT, PreEmphasis};
pub use error::{Error, Result, zeroed};
pub use frame::{FrameFieldsMut, FrameLayout, ModelFrame};
pub use header::{
    EnvelopeType, FIXED_HEADER_BYTES, MODEL_MAGIC, ModelFormat, ModelHeader, StochasticType,
};
pub use math::{
    MIN_THRESHOLD, MagnitudeScale, NoiseSource, SEMITONE_RATIO, next_power_of_two, rms,
    round_to_odd, spectral_approx, tempered_to_ratio,
};
pub use model::{FrameSource, SpectralModel};
pub use peak::SpectralPeak;
pub use sine_table::{SINE_TABLE_SIZE, SineTable};
pub use window::{BH92, WindowType, scale_window};
