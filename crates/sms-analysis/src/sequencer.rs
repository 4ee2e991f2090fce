//! Frame timing, window sizing and the delay ring.
//!
//! The sequencer owns the [`SoundBuffer`] and a fixed ring of
//! [`AnalysisFrame`] slots. Slots are addressed by position, `0` being the
//! oldest and `depth - 1` the frame being analyzed; advancing the ring
//! rotates an index table, so slot payloads never move.
//!
//! Slot lifecycle:
//!
//! ```text
//! Empty -> Ready -> PeaksFound -> FundamentalFound -> TracksFound
//!       -> Cleaned -> ... -> Done
//!       \-> End   (window would run past the end of the source)
//! ```
//!
//! The sequencer itself only assigns `Empty`, `Ready`, `End` and `Done`; the
//! states in between belong to the analysis steps that process a slot.

use crate::buffer::SoundBuffer;
use crate::params::{AnalysisParams, MAX_WINDOW};
use sms_core::{
    Error, FrameLayout, ModelFrame, Result, SpectralPeak, StochasticType, round_to_odd,
};

/// Largest relative change of the fundamental that still counts as stable
/// for pitch-synchronous window sizing.
const STABLE_FUNDAMENTAL_RATIO: f32 = 0.2;

/// Processing state of an analysis slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum FrameStatus {
    /// Slot holds no frame.
    #[default]
    Empty,
    /// Frame positioned and ready for spectral analysis.
    Ready,
    /// Spectral peaks detected.
    PeaksFound,
    /// Fundamental estimated.
    FundamentalFound,
    /// Peaks continued into tracks.
    TracksFound,
    /// Short tracks removed.
    Cleaned,
    /// Frame recomputed after cleaning.
    Recomputed,
    /// Deterministic part resynthesized for the residual.
    DeterministicSynthesized,
    /// Stochastic part computed.
    StochasticComputed,
    /// Frame complete and emitted.
    Done,
    /// Frame would run past the end of the source; analysis stops here.
    End,
}

/// One slot of the delay ring.
#[derive(Debug, Clone)]
pub struct AnalysisFrame {
    /// Source sample at the window center.
    pub center: i64,
    /// Window length in samples (odd).
    pub window_size: usize,
    /// 1-based frame number; 0 for a slot that never held a frame.
    pub frame_num: usize,
    /// Processing state.
    pub status: FrameStatus,
    /// Detected peaks, at most the configured capacity.
    pub peaks: Vec<SpectralPeak>,
    /// Fundamental estimate in Hz, 0 when unknown.
    pub fundamental: f32,
    /// Deterministic data: one entry per guide, with phase.
    pub deterministic: ModelFrame,
}

impl AnalysisFrame {
    fn new(guides: usize, max_peaks: usize) -> Result<Self> {
        let mut peaks = Vec::new();
        peaks
            .try_reserve_exact(max_peaks)
            .map_err(|_| Error::Allocation {
                what: "spectral peaks",
                len: max_peaks,
            })?;
        Ok(Self {
            center: 0,
            window_size: 0,
            frame_num: 0,
            status: FrameStatus::Empty,
            peaks,
            fundamental: 0.0,
            deterministic: ModelFrame::new(FrameLayout::new(
                guides,
                true,
                StochasticType::None,
                0,
                0,
            ))?,
        })
    }

    /// Peak capacity of this slot.
    pub fn peak_capacity(&self) -> usize {
        self.peaks.capacity()
    }

    /// First source sample of the window; the window is symmetric about
    /// `center`.
    pub fn window_start(&self) -> i64 {
        self.center - (self.window_size / 2) as i64
    }

    /// One past the last source sample of the window.
    pub fn window_end(&self) -> i64 {
        self.window_start() + self.window_size as i64
    }

    /// Whether the slot holds a frame that was positioned inside the source.
    pub fn is_analyzed(&self) -> bool {
        self.frame_num > 0 && !matches!(self.status, FrameStatus::Empty | FrameStatus::End)
    }

    fn clear(&mut self) {
        self.deterministic.clear();
        self.peaks.clear();
        self.fundamental = 0.0;
        self.frame_num = 0;
        self.window_size = 0;
        self.center = 0;
        self.status = FrameStatus::Empty;
    }
}

/// Samples on the left of a window's center sample: `(size + 1) / 2`.
#[inline]
fn half_window(size: usize) -> i64 {
    (size as i64 + 1) / 2
}

/// Timing and sizing settings of a [`FrameSequencer`].
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerConfig {
    /// Sampling rate in Hz.
    pub sample_rate: u32,
    /// Samples between frame centers.
    pub hop_size: usize,
    /// Length of the source in samples.
    pub total_samples: usize,
    /// Window length used without a stable fundamental.
    pub default_window: usize,
    /// Largest window length.
    pub max_window: usize,
    /// Window length in fundamental periods.
    pub window_periods: f32,
    /// Fundamentals compared by [`FrameSequencer::fundamental_deviation`].
    pub min_good_frames: usize,
    /// Number of ring slots.
    pub depth: usize,
    /// Deterministic entries per slot.
    pub guides: usize,
    /// Peak capacity per slot.
    pub max_peaks: usize,
}

impl SequencerConfig {
    /// Derive the sequencer settings of an analysis.
    pub fn from_params(params: &AnalysisParams, total_samples: usize) -> Self {
        Self {
            sample_rate: params.sample_rate,
            hop_size: params.hop_size(),
            total_samples,
            default_window: params.default_window_size(),
            max_window: MAX_WINDOW,
            window_periods: params.window_periods,
            min_good_frames: params.min_good_frames,
            depth: params.max_delay_frames(),
            guides: params.guides,
            max_peaks: params.max_peaks,
        }
    }

    /// Sound buffer length: every sample a full ring can still need plus the
    /// largest window.
    pub fn buffer_size(&self) -> usize {
        self.depth * self.hop_size + self.max_window
    }
}

/// Owner of the sound buffer and the delay ring.
pub struct FrameSequencer {
    config: SequencerConfig,
    slots: Vec<AnalysisFrame>,
    order: Vec<usize>,
    buffer: SoundBuffer,
    finished: bool,
}

impl FrameSequencer {
    /// Allocate the ring and the sound buffer.
    pub fn new(config: SequencerConfig) -> Result<Self> {
        if config.depth < 2 {
            return Err(Error::invalid_config("frame ring needs at least two slots"));
        }
        if config.hop_size == 0 {
            return Err(Error::invalid_config("hop size must be positive"));
        }
        if config.default_window == 0 || config.default_window > config.max_window {
            return Err(Error::invalid_config(format!(
                "default window {} must be in 1..={}",
                config.default_window, config.max_window
            )));
        }
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(config.depth)
            .map_err(|_| Error::Allocation {
                what: "frame ring",
                len: config.depth,
            })?;
        for _ in 0..config.depth {
            slots.push(AnalysisFrame::new(config.guides, config.max_peaks)?);
        }
        let buffer = SoundBuffer::new(config.buffer_size())?;
        tracing::debug!(
            depth = config.depth,
            hop = config.hop_size,
            buffer = buffer.size(),
            "frame sequencer ready"
        );
        Ok(Self {
            order: (0..config.depth).collect(),
            slots,
            buffer,
            config,
            finished: false,
        })
    }

    /// Sequencer settings.
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Number of ring slots.
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Position of the frame being analyzed.
    pub fn current(&self) -> usize {
        self.depth() - 1
    }

    /// Whether an `End` frame has been produced.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Slot at ring position `pos`.
    pub fn slot(&self, pos: usize) -> &AnalysisFrame {
        &self.slots[self.order[pos]]
    }

    /// Mutable slot at ring position `pos`.
    pub fn slot_mut(&mut self, pos: usize) -> &mut AnalysisFrame {
        &mut self.slots[self.order[pos]]
    }

    /// Two distinct slots mutably, `a` before `b` in ring order.
    pub fn slot_pair_mut(&mut self, a: usize, b: usize) -> (&mut AnalysisFrame, &mut AnalysisFrame) {
        assert!(a < b, "slot_pair_mut needs a < b");
        let (ia, ib) = (self.order[a], self.order[b]);
        if ia < ib {
            let (lo, hi) = self.slots.split_at_mut(ib);
            (&mut lo[ia], &mut hi[0])
        } else {
            let (lo, hi) = self.slots.split_at_mut(ia);
            (&mut hi[0], &mut lo[ib])
        }
    }

    /// The sound buffer.
    pub fn buffer(&self) -> &SoundBuffer {
        &self.buffer
    }

    /// The sound buffer, mutable.
    pub fn buffer_mut(&mut self) -> &mut SoundBuffer {
        &mut self.buffer
    }

    /// Window length for the frame after `pos`.
    ///
    /// Pitch-synchronous when the fundamentals of `pos` and its predecessor
    /// agree within 20%, the default length otherwise; always capped at the
    /// maximum window.
    pub fn size_next_window(&self, pos: usize) -> usize {
        let fund = self.slot(pos).fundamental;
        let prev_fund = if pos > 0 {
            self.slot(pos - 1).fundamental
        } else {
            0.0
        };

        let size = if prev_fund > 0.0
            && fund > 0.0
            && (prev_fund - fund).abs() / fund <= STABLE_FUNDAMENTAL_RATIO
        {
            round_to_odd(self.config.sample_rate as f32 / fund * self.config.window_periods)
        } else {
            self.config.default_window
        };

        if size > self.config.max_window {
            tracing::warn!(
                size,
                max = self.config.max_window,
                "window too big, clipped"
            );
            self.config.max_window
        } else {
            size
        }
    }

    /// Zero the slot at `pos` and mark it `Empty`.
    pub fn reset_slot(&mut self, pos: usize) {
        self.slot_mut(pos).clear();
    }

    /// Position the frame at `pos` after its predecessor.
    ///
    /// The first frame is centered on sample 0; later ones one hop after the
    /// previous center. Returns [`Error::BufferRunoff`] when samples the
    /// window needs were already discarded from the buffer. A window reaching
    /// the end of the source marks the frame `End`.
    pub fn init_frame(&mut self, pos: usize, window_size: usize) -> Result<FrameStatus> {
        let (prev_num, prev_center) = if pos > 0 {
            let prev = self.slot(pos - 1);
            (prev.frame_num, prev.center)
        } else {
            (0, 0)
        };
        let hop = self.config.hop_size as i64;
        let total = self.config.total_samples as i64;
        let marker = self.buffer.marker();
        let buffer_end = self.buffer.end();

        let frame = self.slot_mut(pos);
        frame.deterministic.clear();
        frame.peaks.clear();
        frame.fundamental = 0.0;
        frame.frame_num = prev_num + 1;
        frame.window_size = window_size;
        frame.center = if frame.frame_num == 1 {
            0
        } else {
            prev_center + hop
        };

        let half = half_window(window_size);
        if marker > frame.center - half {
            return Err(Error::BufferRunoff {
                frame: frame.frame_num,
                start: frame.center - half,
                end: frame.center + half,
                marker,
                buffer_end,
            });
        }

        frame.status = if frame.center + half >= total {
            FrameStatus::End
        } else {
            FrameStatus::Ready
        };
        tracing::trace!(
            frame = frame.frame_num,
            center = frame.center,
            size = window_size,
            status = ?frame.status,
            "frame initialized"
        );
        Ok(frame.status)
    }

    /// Rotate the ring and position the next frame in the freed last slot.
    ///
    /// Returns the new frame's status, or `None` once an `End` frame has been
    /// produced. The slot rotated out is the caller's to consume beforehand.
    pub fn advance(&mut self) -> Result<Option<FrameStatus>> {
        if self.finished {
            return Ok(None);
        }
        let current = self.current();
        let window = self.size_next_window(current);
        self.rotate();
        let status = self.init_frame(current, window)?;
        if status == FrameStatus::End {
            self.finished = true;
        }
        Ok(Some(status))
    }

    /// Move every slot one position toward the front and reset the freed
    /// last slot. The oldest slot's payload is discarded.
    pub fn rotate(&mut self) {
        self.order.rotate_left(1);
        let last = self.current();
        self.reset_slot(last);
    }

    /// Mark the slot at `pos` as complete.
    pub fn mark_done(&mut self, pos: usize) {
        self.slot_mut(pos).status = FrameStatus::Done;
    }

    /// Windowed source samples of the frame at `pos`.
    pub fn frame_samples(&self, pos: usize) -> Result<&[f32]> {
        let frame = self.slot(pos);
        let (start, end) = (frame.window_start(), frame.window_end());
        self.buffer
            .span(start, end)
            .ok_or_else(|| Error::BufferRunoff {
                frame: frame.frame_num,
                start,
                end,
                marker: self.buffer.marker(),
                buffer_end: self.buffer.end(),
            })
    }

    /// Relative mean absolute deviation of the last `min_good_frames`
    /// fundamentals ending at `pos`.
    ///
    /// `None` when fewer frames are available or any of them has no
    /// fundamental.
    pub fn fundamental_deviation(&self, pos: usize) -> Option<f32> {
        let n = self.config.min_good_frames;
        if n == 0 || pos + 1 < n {
            return None;
        }
        let funds: Vec<f32> = (pos + 1 - n..=pos)
            .map(|p| self.slot(p).fundamental)
            .collect();
        if funds.iter().any(|&f| f <= 0.0) {
            return None;
        }
        let avg = funds.iter().sum::<f32>() / n as f32;
        let dev: f32 = funds.iter().map(|f| (f - avg).abs()).sum();
        Some(dev / (n as f32 * avg))
    }
}
