//! Resynthesis settings.

use std::fmt;
use std::str::FromStr;

use sms_core::{Error, Result, tempered_to_ratio};

/// Smallest accepted synthesis hop.
pub const MIN_HOP_SIZE: usize = 128;

/// Largest accepted synthesis hop.
pub const MAX_HOP_SIZE: usize = 8092;

/// Which parts of the model are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesisMode {
    /// Sinusoids plus noise.
    #[default]
    All,
    /// Sinusoidal tracks only.
    Deterministic,
    /// Stochastic part only.
    Stochastic,
}

/// How sinusoidal tracks are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeterministicMethod {
    /// Main lobes placed in a spectrum and inverse transformed.
    #[default]
    Ifft,
    /// Table-lookup oscillators with linear parameter ramps.
    OscillatorBank,
}

impl SynthesisMode {
    /// All modes in command-line code order.
    pub const ALL: [SynthesisMode; 3] = [
        SynthesisMode::All,
        SynthesisMode::Deterministic,
        SynthesisMode::Stochastic,
    ];

    /// Command-line code (`-s`).
    pub fn code(self) -> u8 {
        match self {
            SynthesisMode::All => 0,
            SynthesisMode::Deterministic => 1,
            SynthesisMode::Stochastic => 2,
        }
    }

    /// Mode for a command-line code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.code() == code)
    }

    /// Profile name.
    pub fn name(self) -> &'static str {
        match self {
            SynthesisMode::All => "all",
            SynthesisMode::Deterministic => "deterministic",
            SynthesisMode::Stochastic => "stochastic",
        }
    }

    /// Whether sinusoidal tracks are rendered.
    pub fn renders_deterministic(self) -> bool {
        self != SynthesisMode::Stochastic
    }

    /// Whether the stochastic part is rendered.
    pub fn renders_stochastic(self) -> bool {
        self != SynthesisMode::Deterministic
    }
}

impl DeterministicMethod {
    /// All methods in command-line code order.
    pub const ALL: [DeterministicMethod; 2] =
        [DeterministicMethod::Ifft, DeterministicMethod::OscillatorBank];

    /// Command-line code (`-d`).
    pub fn code(self) -> u8 {
        match self {
            DeterministicMethod::Ifft => 1,
            DeterministicMethod::OscillatorBank => 2,
        }
    }

    /// Method for a command-line code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.code() == code)
    }

    /// Profile name.
    pub fn name(self) -> &'static str {
        match self {
            DeterministicMethod::Ifft => "ifft",
            DeterministicMethod::OscillatorBank => "oscillator-bank",
        }
    }
}

macro_rules! named_enum_traits {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                $ty::ALL
                    .into_iter()
                    .find(|v| v.name().eq_ignore_ascii_case(s))
                    .ok_or_else(|| format!(concat!("unknown ", $what, " '{}'"), s))
            }
        }
    };
}

named_enum_traits!(SynthesisMode, "synthesis mode");
named_enum_traits!(DeterministicMethod, "deterministic method");

/// Settings for one resynthesis run.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisConfig {
    /// Output rate in Hz; `None` keeps the model's rate.
    pub sample_rate: Option<u32>,
    /// Rendered parts.
    pub mode: SynthesisMode,
    /// Track rendering method.
    pub deterministic: DeterministicMethod,
    /// Output samples per frame; rounded to a power of two.
    pub hop_size: usize,
    /// Duration factor; 2.0 plays twice as long.
    pub time_stretch: f32,
    /// Linear factor on the stochastic gain.
    pub stochastic_gain: f32,
    /// Pitch shift in equal-tempered semitones.
    pub transpose: f32,
    /// Interpolate between neighbouring frames.
    pub interpolate: bool,
    /// Undo the analysis pre-emphasis on output, for models whose header
    /// records one.
    pub de_emphasis: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            mode: SynthesisMode::All,
            deterministic: DeterministicMethod::Ifft,
            hop_size: MIN_HOP_SIZE,
            time_stretch: 1.0,
            stochastic_gain: 1.0,
            transpose: 0.0,
            interpolate: true,
            de_emphasis: true,
        }
    }
}

impl SynthesisConfig {
    /// Check every field against its accepted range.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_HOP_SIZE..=MAX_HOP_SIZE).contains(&self.hop_size) {
            return Err(Error::invalid_config(format!(
                "hop size {} outside {MIN_HOP_SIZE}..={MAX_HOP_SIZE}",
                self.hop_size
            )));
        }
        if self.sample_rate == Some(0) {
            return Err(Error::invalid_config("output sample rate must be positive"));
        }
        if !(self.time_stretch > 0.0 && self.time_stretch.is_finite()) {
            return Err(Error::invalid_config(format!(
                "time stretch {} must be positive",
                self.time_stretch
            )));
        }
        if !(self.stochastic_gain >= 0.0 && self.stochastic_gain.is_finite()) {
            return Err(Error::invalid_config(format!(
                "stochastic gain {} must be non-negative",
                self.stochastic_gain
            )));
        }
        if !self.transpose.is_finite() {
            return Err(Error::invalid_config("transposition must be finite"));
        }
        Ok(())
    }

    /// Linear frequency factor of the transposition.
    pub fn transpose_ratio(&self) -> f32 {
        tempered_to_ratio(self.transpose)
    }

    /// Output rate for a model analyzed at `source_rate`.
    pub fn output_rate(&self, source_rate: u32) -> u32 {
        self.sample_rate.unwrap_or(source_rate)
    }
}
