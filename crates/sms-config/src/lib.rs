//! Analysis and synthesis profiles for the SMS tools.
//!
//! A [`Profile`] collects the settings of both halves of the system in one
//! TOML file, so a sound can be analyzed and resynthesized the same way
//! again. Command-line flags override what a profile sets.
//!
//! # Example
//!
//! ```rust
//! use sms_config::Profile;
//!
//! let profile = Profile::from_toml(
//!     r#"
//!     [analysis]
//!     frame_rate = 200
//!     format = "inharmonic"
//!
//!     [synthesis]
//!     time_stretch = 1.5
//!     "#,
//! )
//! .unwrap();
//!
//! let params = profile.analysis.to_params(44100).unwrap();
//! assert_eq!(params.hop_size(), 220);
//! let config = profile.synthesis.to_config().unwrap();
//! assert_eq!(config.time_stretch, 1.5);
//! ```

mod error;
mod profile;

pub use error::ConfigError;
pub use profile::{AnalysisProfile, Profile, SynthesisProfile};
