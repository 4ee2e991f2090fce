//! Analysis and synthesis profiles.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use sms_analysis::AnalysisParams;
use sms_core::{ModelFormat, StochasticType, WindowType};
use sms_synth::{DeterministicMethod, SynthesisConfig, SynthesisMode};

use crate::error::ConfigError;

/// A complete set of analysis and synthesis settings.
///
/// Profiles are stored as TOML. Every key is optional; missing keys take the
/// defaults of [`AnalysisParams`] and [`SynthesisConfig`]. Enumerated values
/// are written by name.
///
/// # TOML Format
///
/// ```toml
/// [analysis]
/// frame_rate = 300
/// window_periods = 3.5
/// window = "blackman-harris-70"
/// format = "harmonic"
/// stochastic = "approx"
/// stochastic_coefficients = 128
/// tracks = 60
///
/// [synthesis]
/// mode = "all"
/// deterministic = "ifft"
/// hop_size = 128
/// time_stretch = 1.0
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Profile {
    /// Settings used when analyzing a sound.
    pub analysis: AnalysisProfile,
    /// Settings used when resynthesizing a model.
    pub synthesis: SynthesisProfile,
}

/// The `[analysis]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisProfile {
    /// Frames per second.
    pub frame_rate: u32,
    /// Window length in periods of the fundamental.
    pub window_periods: f32,
    /// Window name, e.g. `"blackman-harris-70"`.
    pub window: String,
    /// Track format name, e.g. `"harmonic"`.
    pub format: String,
    /// Stochastic representation: `"none"`, `"approx"` or `"ifft"`.
    pub stochastic: String,
    /// Stochastic coefficients per frame.
    pub stochastic_coefficients: usize,
    /// Tracks stored per frame.
    pub tracks: usize,
    /// Guides followed during continuation; raised to `tracks` if lower.
    pub guides: usize,
    /// Fundamental assumed until one is detected, in Hz.
    pub default_fundamental: f32,
    /// Lowest fundamental searched for, in Hz.
    pub lowest_fundamental: f32,
    /// Highest fundamental searched for, in Hz.
    pub highest_fundamental: f32,
    /// Highest peak frequency, in Hz.
    pub highest_frequency: f32,
    /// Peaks below this magnitude (dB) are ignored.
    pub min_peak_magnitude: f32,
    /// Consecutive stable fundamentals required before trusting pitch.
    pub min_good_frames: usize,
    /// Shorter tracks are removed when cleaning.
    pub min_track_length: usize,
    /// Extra frames of look-ahead.
    pub analysis_delay: usize,
    /// Remove short tracks.
    pub clean_tracks: bool,
    /// Pre-emphasize the input.
    pub pre_emphasis: bool,
}

impl Default for AnalysisProfile {
    fn default() -> Self {
        let p = AnalysisParams::default();
        Self {
            frame_rate: p.frame_rate,
            window_periods: p.window_periods,
            window: p.window.name().to_string(),
            format: p.format.name().to_string(),
            stochastic: p.stochastic.name().to_string(),
            stochastic_coefficients: p.stochastic_coefficients,
            tracks: p.tracks,
            guides: p.guides,
            default_fundamental: p.default_fundamental,
            lowest_fundamental: p.lowest_fundamental,
            highest_fundamental: p.highest_fundamental,
            highest_frequency: p.highest_frequency,
            min_peak_magnitude: p.min_peak_magnitude,
            min_good_frames: p.min_good_frames,
            min_track_length: p.min_track_length,
            analysis_delay: p.analysis_delay,
            clean_tracks: p.clean_tracks,
            pre_emphasis: p.pre_emphasis,
        }
    }
}

fn parse_named<T: FromStr<Err = String>>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|reason| ConfigError::invalid_value(field, reason))
}

impl AnalysisProfile {
    /// Analysis parameters for a sound sampled at `sample_rate`.
    ///
    /// Values the profile does not cover keep their defaults. The result is
    /// validated.
    pub fn to_params(&self, sample_rate: u32) -> Result<AnalysisParams, ConfigError> {
        let params = AnalysisParams {
            sample_rate,
            frame_rate: self.frame_rate,
            window: parse_named::<WindowType>("window", &self.window)?,
            window_periods: self.window_periods,
            format: parse_named::<ModelFormat>("format", &self.format)?,
            tracks: self.tracks,
            guides: self.guides.max(self.tracks),
            stochastic: parse_named::<StochasticType>("stochastic", &self.stochastic)?,
            stochastic_coefficients: self.stochastic_coefficients,
            default_fundamental: self.default_fundamental,
            lowest_fundamental: self.lowest_fundamental,
            highest_fundamental: self.highest_fundamental,
            highest_frequency: self.highest_frequency.min(sample_rate as f32 / 2.0),
            min_peak_magnitude: self.min_peak_magnitude,
            min_good_frames: self.min_good_frames,
            min_track_length: self.min_track_length,
            analysis_delay: self.analysis_delay,
            clean_tracks: self.clean_tracks,
            pre_emphasis: self.pre_emphasis,
            ..AnalysisParams::default()
        };
        params.validate()?;
        Ok(params)
    }
}

/// The `[synthesis]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisProfile {
    /// Output rate in Hz; the model's rate when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    /// `"all"`, `"deterministic"` or `"stochastic"`.
    pub mode: String,
    /// `"ifft"` or `"oscillator-bank"`.
    pub deterministic: String,
    /// Output samples per frame.
    pub hop_size: usize,
    /// Duration factor.
    pub time_stretch: f32,
    /// Linear factor on the stochastic part.
    pub stochastic_gain: f32,
    /// Transposition in semitones.
    pub transpose: f32,
    /// Interpolate between neighbouring frames.
    pub interpolate: bool,
    /// Undo the analysis pre-emphasis of models that recorded one.
    pub de_emphasis: bool,
}

impl Default for SynthesisProfile {
    fn default() -> Self {
        let c = SynthesisConfig::default();
        Self {
            sample_rate: c.sample_rate,
            mode: c.mode.name().to_string(),
            deterministic: c.deterministic.name().to_string(),
            hop_size: c.hop_size,
            time_stretch: c.time_stretch,
            stochastic_gain: c.stochastic_gain,
            transpose: c.transpose,
            interpolate: c.interpolate,
            de_emphasis: c.de_emphasis,
        }
    }
}

impl SynthesisProfile {
    /// Validated synthesis configuration.
    pub fn to_config(&self) -> Result<SynthesisConfig, ConfigError> {
        let config = SynthesisConfig {
            sample_rate: self.sample_rate,
            mode: parse_named::<SynthesisMode>("mode", &self.mode)?,
            deterministic: parse_named::<DeterministicMethod>("deterministic", &self.deterministic)?,
            hop_size: self.hop_size,
            time_stretch: self.time_stretch,
            stochastic_gain: self.stochastic_gain,
            transpose: self.transpose,
            interpolate: self.interpolate,
            de_emphasis: self.de_emphasis,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Profile {
    /// Load a profile from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a profile from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the profile to a TOML file, creating missing parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the profile to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check both tables, assuming input sampled at `sample_rate`.
    pub fn validate(&self, sample_rate: u32) -> Result<(), ConfigError> {
        self.analysis.to_params(sample_rate)?;
        self.synthesis.to_config()?;
        Ok(())
    }
}
