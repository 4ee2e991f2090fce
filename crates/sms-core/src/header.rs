//! Model header: everything needed to size and interpret stored frames.

use crate::frame::FrameLayout;
use std::fmt;
use std::str::FromStr;

/// Identification constant at the start of every model file.
pub const MODEL_MAGIC: i32 = 767;

/// Byte size of the fixed part of the header (sixteen 4-byte fields).
pub const FIXED_HEADER_BYTES: usize = 16 * 4;

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $( $(#[$vmeta:meta])* $variant:ident = $code:literal, $label:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Integer code stored in the model file.
            pub fn code(self) -> i32 {
                match self { $( $name::$variant => $code ),+ }
            }

            /// Decode an integer code from a model file.
            pub fn from_code(code: i32) -> Option<Self> {
                match code { $( $code => Some($name::$variant), )+ _ => None }
            }

            /// Configuration name.
            pub fn name(self) -> &'static str {
                match self { $( $name::$variant => $label ),+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $( $label => Ok($name::$variant), )+
                    _ => Err(format!(concat!("unknown ", stringify!($name), " '{}'"), s)),
                }
            }
        }
    };
}

coded_enum! {
    /// Harmonic or inharmonic tracks, with or without stored phase.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum ModelFormat {
        /// Harmonic tracks, frequency and amplitude only.
        #[default]
        Harmonic = 0, "harmonic",
        /// Inharmonic tracks, frequency and amplitude only.
        Inharmonic = 1, "inharmonic",
        /// Harmonic tracks with phase.
        HarmonicWithPhase = 2, "harmonic-phase",
        /// Inharmonic tracks with phase.
        InharmonicWithPhase = 3, "inharmonic-phase",
    }
}

coded_enum! {
    /// Representation of the stochastic residual.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum StochasticType {
        /// No stochastic component.
        None = 0, "none",
        /// Approximated magnitude envelope plus gain; phases are generated.
        #[default]
        Approx = 1, "approx",
        /// Residual magnitude spectrum plus its exact phase spectrum.
        Ifft = 2, "ifft",
    }
}

coded_enum! {
    /// Representation of the spectral envelope.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum EnvelopeType {
        /// No envelope stored.
        #[default]
        None = 0, "none",
        /// Cepstral coefficients.
        Cepstral = 1, "cepstral",
        /// Magnitudes at evenly spaced frequency bins.
        FrequencyBins = 2, "frequency-bins",
    }
}

impl ModelFormat {
    /// Whether track phases are part of each frame.
    pub fn has_phase(self) -> bool {
        matches!(
            self,
            ModelFormat::HarmonicWithPhase | ModelFormat::InharmonicWithPhase
        )
    }

    /// Whether tracks follow multiples of a fundamental.
    pub fn is_harmonic(self) -> bool {
        matches!(
            self,
            ModelFormat::Harmonic | ModelFormat::HarmonicWithPhase
        )
    }
}

/// Description of a stored model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHeader {
    /// Number of stored frames.
    pub frame_count: usize,
    /// Sampling rate of the analyzed sound in Hz.
    pub sample_rate: u32,
    /// Track format.
    pub format: ModelFormat,
    /// Number of sinusoidal tracks per frame.
    pub tracks: usize,
    /// Frames per second of source audio.
    pub frame_rate: u32,
    /// Stochastic representation.
    pub stochastic: StochasticType,
    /// Stochastic coefficients per frame.
    pub stochastic_coefficients: usize,
    /// Envelope representation.
    pub envelope: EnvelopeType,
    /// Envelope coefficients per frame.
    pub envelope_coefficients: usize,
    /// Highest track frequency in Hz.
    pub max_frequency: u32,
    /// Residual energy as a percentage of the original.
    pub residual_percentage: f32,
    /// Whether the analyzed sound was pre-emphasized; synthesis undoes it.
    pub pre_emphasis: bool,
    /// Free text describing the analysis.
    pub text: String,
}

impl Default for ModelHeader {
    fn default() -> Self {
        Self {
            frame_count: 0,
            sample_rate: 44100,
            format: ModelFormat::Harmonic,
            tracks: 0,
            frame_rate: 300,
            stochastic: StochasticType::Approx,
            stochastic_coefficients: 0,
            envelope: EnvelopeType::None,
            envelope_coefficients: 0,
            max_frequency: 12000,
            residual_percentage: 0.0,
            pre_emphasis: false,
            text: String::new(),
        }
    }
}

impl ModelHeader {
    /// Layout of every frame this header describes.
    pub fn layout(&self) -> FrameLayout {
        FrameLayout::new(
            self.tracks,
            self.format.has_phase(),
            self.stochastic,
            self.stochastic_coefficients,
            self.envelope_coefficients,
        )
    }

    /// Byte size of one stored frame.
    pub fn frame_byte_size(&self) -> usize {
        self.layout().len() * 4
    }

    /// Byte size of the header including its text.
    pub fn header_byte_size(&self) -> usize {
        FIXED_HEADER_BYTES + self.text.len()
    }

    /// Byte offset of frame `index` from the start of the file.
    pub fn frame_offset(&self, index: usize) -> u64 {
        self.header_byte_size() as u64 + index as u64 * self.frame_byte_size() as u64
    }

    /// Source samples between consecutive frames.
    pub fn hop_size(&self) -> usize {
        (self.sample_rate / self.frame_rate.max(1)) as usize
    }
}
