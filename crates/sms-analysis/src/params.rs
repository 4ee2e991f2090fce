//! Analysis parameters.

use crate::transform::TransformStrategy;
use sms_core::{Error, ModelFormat, Result, StochasticType, WindowType, round_to_odd};

/// Largest analysis window in samples.
pub const MAX_WINDOW: usize = 8190;

/// Largest number of spectral peaks kept per frame.
pub const MAX_PEAKS: usize = 400;

/// Settings for one analysis session.
///
/// Defaults reproduce a general-purpose harmonic analysis at 300 frames per
/// second.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisParams {
    /// Sampling rate of the input in Hz.
    pub sample_rate: u32,
    /// Frames per second.
    pub frame_rate: u32,
    /// Analysis window shape.
    pub window: WindowType,
    /// Window length in periods of the fundamental.
    pub window_periods: f32,
    /// Track format stored in the model.
    pub format: ModelFormat,
    /// Tracks stored per frame.
    pub tracks: usize,
    /// Guides followed during peak continuation (at least `tracks`).
    pub guides: usize,
    /// Stochastic representation.
    pub stochastic: StochasticType,
    /// Stochastic coefficients per frame.
    pub stochastic_coefficients: usize,
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
    /// Maximum spectral peaks per frame.
    pub max_peaks: usize,
    /// The fundamental's reference peak must be within this many dB of the
    /// strongest peak.
    pub ref_harmonic_magnitude_diff: f32,
    /// Minimum magnitude (dB) of the fundamental's reference peak.
    pub min_ref_harmonic_magnitude: f32,
    /// Relative frequency deviation a guide accepts from a peak.
    pub freq_deviation: f32,
    /// Weight of the new peak when a guide follows it.
    pub peak_contribution: f32,
    /// Weight of the fundamental when harmonic guides are reseeded.
    pub fundamental_contribution: f32,
    /// Consecutive stable fundamentals required before trusting pitch.
    pub min_good_frames: usize,
    /// Maximum relative fundamental deviation of a stable stretch.
    pub max_deviation: f32,
    /// Shorter tracks are removed when cleaning.
    pub min_track_length: usize,
    /// Frames a guide may sleep before it is killed.
    pub max_sleeping_time: usize,
    /// Extra frames of look-ahead before a frame is emitted.
    pub analysis_delay: usize,
    /// Remove short tracks before emitting frames.
    pub clean_tracks: bool,
    /// Apply pre-emphasis to the input.
    pub pre_emphasis: bool,
    /// Magnitude threshold in dBFS.
    pub magnitude_threshold_db: f32,
    /// Transform strategy.
    pub transform: TransformStrategy,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            frame_rate: 300,
            window: WindowType::BlackmanHarris70,
            window_periods: 3.5,
            format: ModelFormat::Harmonic,
            tracks: 60,
            guides: 100,
            stochastic: StochasticType::Approx,
            stochastic_coefficients: 128,
            default_fundamental: 100.0,
            lowest_fundamental: 50.0,
            highest_fundamental: 1000.0,
            highest_frequency: 12000.0,
            min_peak_magnitude: 0.0,
            max_peaks: MAX_PEAKS,
            ref_harmonic_magnitude_diff: 30.0,
            min_ref_harmonic_magnitude: 30.0,
            freq_deviation: 0.45,
            peak_contribution: 0.4,
            fundamental_contribution: 0.5,
            min_good_frames: 3,
            max_deviation: 0.01,
            min_track_length: 40,
            max_sleeping_time: 40,
            analysis_delay: 100,
            clean_tracks: true,
            pre_emphasis: true,
            magnitude_threshold_db: -100.0,
            transform: TransformStrategy::Planned,
        }
    }
}

impl AnalysisParams {
    /// Source samples between frame centers.
    pub fn hop_size(&self) -> usize {
        (self.sample_rate / self.frame_rate.max(1)) as usize
    }

    /// Default fundamental clamped into the searched range.
    pub fn clamped_default_fundamental(&self) -> f32 {
        self.default_fundamental
            .max(self.lowest_fundamental)
            .min(self.highest_fundamental)
    }

    /// Window length used while no stable fundamental is known.
    pub fn default_window_size(&self) -> usize {
        let fund = self.clamped_default_fundamental();
        round_to_odd(self.sample_rate as f32 / fund * self.window_periods).min(MAX_WINDOW)
    }

    /// Depth of the frame ring: look-ahead needed by continuation and
    /// cleaning plus the configured analysis delay.
    pub fn max_delay_frames(&self) -> usize {
        self.min_track_length.max(self.max_sleeping_time)
            + 2
            + self.min_good_frames
            + self.analysis_delay
    }

    /// Stochastic coefficients actually stored.
    ///
    /// Storing the exact residual keeps one value per residual bin, so the
    /// count follows the hop instead of the configured value.
    pub fn effective_stochastic_coefficients(&self) -> usize {
        match self.stochastic {
            StochasticType::None => 0,
            StochasticType::Approx => self.stochastic_coefficients,
            StochasticType::Ifft => self.hop_size().next_power_of_two(),
        }
    }

    /// One-line description stored in the model header.
    pub fn summary(&self) -> String {
        format!(
            "format {}, frame rate {}, window {} ({} periods), fundamental {}-{} Hz (default {}), \
             highest frequency {} Hz, stochastic {} ({} coefficients), pre-emphasis {}",
            self.format,
            self.frame_rate,
            self.window,
            self.window_periods,
            self.lowest_fundamental,
            self.highest_fundamental,
            self.default_fundamental,
            self.highest_frequency,
            self.stochastic,
            self.effective_stochastic_coefficients(),
            if self.pre_emphasis { "on" } else { "off" },
        )
    }

    /// Check every parameter, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::invalid_config("sample rate must be positive"));
        }
        if self.frame_rate == 0 || self.hop_size() == 0 {
            return Err(Error::invalid_config(format!(
                "frame rate {} gives an empty hop at {} Hz",
                self.frame_rate, self.sample_rate
            )));
        }
        if self.hop_size() > MAX_WINDOW {
            return Err(Error::invalid_config(format!(
                "hop of {} samples exceeds the largest window ({MAX_WINDOW})",
                self.hop_size()
            )));
        }
        if self.window_periods <= 0.0 {
            return Err(Error::invalid_config("window periods must be positive"));
        }
        if self.tracks == 0 {
            return Err(Error::invalid_config("at least one track is required"));
        }
        if self.guides < self.tracks {
            return Err(Error::invalid_config(format!(
                "guides ({}) must be at least tracks ({})",
                self.guides, self.tracks
            )));
        }
        if self.stochastic == StochasticType::Approx && self.stochastic_coefficients == 0 {
            return Err(Error::invalid_config(
                "approximated stochastic model needs coefficients",
            ));
        }
        if !(self.lowest_fundamental > 0.0 && self.lowest_fundamental < self.highest_fundamental)
        {
            return Err(Error::invalid_config(format!(
                "fundamental range {}..{} is empty",
                self.lowest_fundamental, self.highest_fundamental
            )));
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        if self.highest_frequency <= self.lowest_fundamental || self.highest_frequency > nyquist {
            return Err(Error::invalid_config(format!(
                "highest frequency {} must lie between {} and {}",
                self.highest_frequency, self.lowest_fundamental, nyquist
            )));
        }
        if self.max_peaks == 0 || self.max_peaks > MAX_PEAKS {
            return Err(Error::invalid_config(format!(
                "max peaks must be in 1..={MAX_PEAKS}"
            )));
        }
        if self.min_good_frames == 0 {
            return Err(Error::invalid_config("min good frames must be positive"));
        }
        if !(0.0..=1.0).contains(&self.peak_contribution)
            || !(0.0..=1.0).contains(&self.fundamental_contribution)
        {
            return Err(Error::invalid_config("contributions must lie in 0..=1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = AnalysisParams::default();
        params.validate().unwrap();
        assert_eq!(params.hop_size(), 147);
        // 44100 / 100 * 3.5 = 1543.5
        assert_eq!(params.default_window_size(), 1543);
        assert_eq!(params.max_delay_frames(), 145);
    }

    #[test]
    fn test_summary_names_settings() {
        let text = AnalysisParams::default().summary();
        assert!(text.contains("harmonic"), "{text}");
        assert!(text.contains("blackman-harris-70"), "{text}");
        assert!(text.contains("128 coefficients"), "{text}");
    }

    #[test]
    fn test_default_fundamental_is_clamped() {
        let params = AnalysisParams {
            default_fundamental: 10.0,
            ..Default::default()
        };
        assert_eq!(params.clamped_default_fundamental(), 50.0);
        assert_eq!(params.default_window_size(), 3087);
    }

    #[test]
    fn test_window_is_capped() {
        let params = AnalysisParams {
            default_fundamental: 15.0,
            lowest_fundamental: 10.0,
            ..Default::default()
        };
        assert_eq!(params.default_window_size(), MAX_WINDOW);
    }

    #[test]
    fn test_exact_residual_coefficients_follow_hop() {
        let params = AnalysisParams {
            stochastic: StochasticType::Ifft,
            ..Default::default()
        };
        assert_eq!(params.effective_stochastic_coefficients(), 256);
    }

    #[test]
    fn test_validation_failures() {
        let bad = [
            AnalysisParams {
                frame_rate: 0,
                ..Default::default()
            },
            AnalysisParams {
                guides: 10,
                ..Default::default()
            },
            AnalysisParams {
                highest_frequency: 30000.0,
                ..Default::default()
            },
            AnalysisParams {
                lowest_fundamental: 2000.0,
                ..Default::default()
            },
            AnalysisParams {
                frame_rate: 2,
                ..Default::default()
            },
        ];
        for params in bad {
            assert!(params.validate().is_err(), "{params:?} should be rejected");
        }
    }
}
