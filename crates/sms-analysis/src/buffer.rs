//! Sliding window over the source signal.

use sms_core::{Error, Result, zeroed};

/// The most recent `size` samples of the source.
///
/// `marker` is the source index of element 0. It starts at `-size`, so
/// before any input the buffer holds silence preceding the signal; this lets
/// the first frames, centered at sample 0, read a full window. Samples
/// before `first_good` are that leading silence.
#[derive(Debug, Clone)]
pub struct SoundBuffer {
    data: Vec<f32>,
    marker: i64,
    first_good: usize,
}

impl SoundBuffer {
    /// Allocate a buffer of `size` samples.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_config("sound buffer must not be empty"));
        }
        Ok(Self {
            data: zeroed(size, "sound buffer")?,
            marker: -(size as i64),
            first_good: size,
        })
    }

    /// Capacity in samples.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Source index of the first buffered sample.
    pub fn marker(&self) -> i64 {
        self.marker
    }

    /// One past the source index of the last buffered sample.
    pub fn end(&self) -> i64 {
        self.marker + self.data.len() as i64
    }

    /// Index in the buffer of the first sample that came from the source.
    pub fn first_good(&self) -> usize {
        self.first_good
    }

    /// Whether source samples `start..end` are all buffered.
    pub fn covers(&self, start: i64, end: i64) -> bool {
        start >= self.marker && end <= self.end()
    }

    /// Append source samples, discarding the oldest ones.
    pub fn push(&mut self, samples: &[f32]) {
        let size = self.data.len();
        let n = samples.len();
        if n >= size {
            self.data.copy_from_slice(&samples[n - size..]);
        } else {
            self.data.copy_within(n.., 0);
            self.data[size - n..].copy_from_slice(samples);
        }
        self.marker += n as i64;
        self.first_good = self.first_good.saturating_sub(n);
    }

    /// Borrow source samples `start..end`.
    pub fn span(&self, start: i64, end: i64) -> Option<&[f32]> {
        if !self.covers(start, end) || end < start {
            return None;
        }
        let from = (start - self.marker) as usize;
        let to = (end - self.marker) as usize;
        Some(&self.data[from..to])
    }
}
