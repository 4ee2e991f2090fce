//! Peak continuation: assigning peaks to tracks frame by frame.
//!
//! A fixed set of guides follows the partials of the sound. Every frame each
//! guide claims at most one peak; the peak's frequency, magnitude and phase
//! become that track's values in the frame, and the guide drifts toward the
//! peak. Guides that find no peak sleep and are killed after a while; free
//! guides pick up unclaimed peaks.
//!
//! In harmonic mode guide `i` is pulled toward `(i + 1) * fundamental`
//! whenever a fundamental is known, so tracks keep harmonic numbers.

use sms_core::{Error, ModelFrame, Result, SpectralPeak, zeroed};

/// Turns the peaks of successive frames into tracks.
pub trait PeakContinuation {
    /// Write the tracks of one frame into `frame`.
    ///
    /// `frame` has at least one track slot per guide and holds phases.
    fn continue_peaks(
        &mut self,
        peaks: &[SpectralPeak],
        fundamental: f32,
        frame: &mut ModelFrame,
    ) -> Result<()>;

    /// Forget every guide.
    fn reset(&mut self);
}

/// Settings of [`GuideContinuation`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationSettings {
    /// Number of guides.
    pub guides: usize,
    /// Pull guides toward harmonics of the fundamental.
    pub harmonic: bool,
    /// Largest peak distance, relative to the harmonic spacing.
    pub freq_deviation: f32,
    /// Weight of a claimed peak in the guide frequency update.
    pub peak_contribution: f32,
    /// Weight of the harmonic target in the guide frequency.
    pub fundamental_contribution: f32,
    /// Frames a guide may go without a peak before it is killed.
    pub max_sleeping_time: usize,
    /// Spacing used when no fundamental is known, in Hz.
    pub default_spacing: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Guide {
    freq: f32,
    mag: f32,
    sleeping: usize,
}

impl Guide {
    fn is_alive(&self) -> bool {
        self.freq > 0.0
    }
}

/// Nearest-frequency continuation over a fixed set of guides.
#[derive(Debug, Clone)]
pub struct GuideContinuation {
    settings: ContinuationSettings,
    guides: Vec<Guide>,
    targets: Vec<f32>,
    claimed: Vec<bool>,
    order: Vec<usize>,
}

impl GuideContinuation {
    /// Allocate the guides.
    pub fn new(settings: ContinuationSettings) -> Result<Self> {
        if settings.guides == 0 {
            return Err(Error::invalid_config("peak continuation needs guides"));
        }
        Ok(Self {
            guides: zeroed(settings.guides, "guides")?,
            targets: zeroed(settings.guides, "guide targets")?,
            order: (0..settings.guides).collect(),
            claimed: Vec::new(),
            settings,
        })
    }

    /// Number of live guides.
    pub fn active_guides(&self) -> usize {
        self.guides.iter().filter(|g| g.is_alive()).count()
    }

    fn nearest_free_peak(&self, peaks: &[SpectralPeak], target: f32, tolerance: f32) -> Option<usize> {
        peaks
            .iter()
            .enumerate()
            .filter(|&(j, p)| !self.claimed[j] && (p.freq - target).abs() <= tolerance)
            .min_by(|(_, a), (_, b)| {
                (a.freq - target)
                    .abs()
                    .total_cmp(&(b.freq - target).abs())
            })
            .map(|(j, _)| j)
    }
}

impl PeakContinuation for GuideContinuation {
    fn continue_peaks(
        &mut self,
        peaks: &[SpectralPeak],
        fundamental: f32,
        frame: &mut ModelFrame,
    ) -> Result<()> {
        let n = self.guides.len();
        if frame.layout().tracks() < n || frame.phase().is_none() {
            return Err(Error::SizeMismatch {
                what: "deterministic frame tracks",
                expected: n,
                actual: frame.layout().tracks(),
            });
        }
        let s = &self.settings;
        let harmonic = s.harmonic && fundamental > 0.0;
        let spacing = if fundamental > 0.0 {
            fundamental
        } else {
            s.default_spacing
        };
        let tolerance = s.freq_deviation * spacing;

        for (i, (target, guide)) in self.targets.iter_mut().zip(&self.guides).enumerate() {
            *target = if harmonic {
                let harmonic_freq = (i + 1) as f32 * fundamental;
                if guide.is_alive() {
                    guide.freq + s.fundamental_contribution * (harmonic_freq - guide.freq)
                } else {
                    harmonic_freq
                }
            } else {
                guide.freq
            };
        }

        self.claimed.clear();
        self.claimed.resize(peaks.len(), false);
        // Loudest guides choose first
        let guides = &self.guides;
        self.order
            .sort_by(|&a, &b| guides[b].mag.total_cmp(&guides[a].mag).then(a.cmp(&b)));

        let fields = frame.fields_mut();
        let phases = fields.phase;
        fields.freq.fill(0.0);
        fields.amp.fill(0.0);
        phases.fill(0.0);

        for idx in 0..n {
            let g = self.order[idx];
            let target = self.targets[g];
            if target <= 0.0 {
                continue;
            }
            match self.nearest_free_peak(peaks, target, tolerance) {
                Some(j) => {
                    self.claimed[j] = true;
                    let peak = peaks[j];
                    let guide = &mut self.guides[g];
                    guide.freq = target + self.settings.peak_contribution * (peak.freq - target);
                    guide.mag = peak.mag;
                    guide.sleeping = 0;
                    fields.freq[g] = peak.freq;
                    fields.amp[g] = peak.mag;
                    phases[g] = peak.phase;
                }
                None => {
                    let guide = &mut self.guides[g];
                    if guide.is_alive() {
                        guide.sleeping += 1;
                        if guide.sleeping > self.settings.max_sleeping_time {
                            *guide = Guide::default();
                        }
                    } else if harmonic {
                        guide.freq = target;
                    }
                }
            }
        }

        if !harmonic {
            // Free guides start on the loudest unclaimed peaks
            let mut free: Vec<usize> = (0..peaks.len()).filter(|&j| !self.claimed[j]).collect();
            free.sort_by(|&a, &b| peaks[b].mag.total_cmp(&peaks[a].mag));
            let mut free = free.into_iter();
            for g in 0..n {
                if self.guides[g].is_alive() {
                    continue;
                }
                let Some(j) = free.next() else { break };
                let peak = peaks[j];
                self.guides[g] = Guide {
                    freq: peak.freq,
                    mag: peak.mag,
                    sleeping: 0,
                };
                fields.freq[g] = peak.freq;
                fields.amp[g] = peak.mag;
                phases[g] = peak.phase;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.guides.fill(Guide::default());
    }
}
