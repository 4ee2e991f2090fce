//! Windowed forward and inverse spectra in polar form.
//!
//! Phase convention: a bin with real part `re` and imaginary part `im`
//! has phase `atan2(im, re)` under the `e^{-j 2π kn/N}` forward kernel, and
//! the inverse rebuilds `mag * (cos φ, sin φ)`. The same convention holds for
//! [`SpectrumEngine::analyze`] and the quick spectra.
//!
//! Bin 0 packs DC and Nyquist together: its magnitude is
//! `sqrt(dc² + nyquist²)` and its phase `atan2(nyquist, dc)`, which the
//! inverse unpacks again.

use crate::transform::{TransformProvider, TransformStrategy};
use sms_core::{Error, MagnitudeScale, Result, next_power_of_two, zeroed};

/// Analysis transforms are this many times longer than the window.
pub const OVERSAMPLING_FACTOR: usize = 2;

/// Transform size used by [`SpectrumEngine::analyze`] for a window length.
pub fn analysis_transform_size(window_size: usize) -> usize {
    next_power_of_two(OVERSAMPLING_FACTOR * window_size)
}

/// Forward/inverse polar spectra with cached transforms.
///
/// Each call is independent; the engine only caches transform providers and
/// one scratch buffer per transform size.
pub struct SpectrumEngine {
    strategy: TransformStrategy,
    scale: MagnitudeScale,
    transforms: Vec<Box<dyn TransformProvider>>,
    buffer: Vec<f32>,
}

impl SpectrumEngine {
    /// Create an engine using the given transform strategy and dB scale.
    pub fn new(strategy: TransformStrategy, scale: MagnitudeScale) -> Self {
        Self {
            strategy,
            scale,
            transforms: Vec::new(),
            buffer: Vec::new(),
        }
    }

    /// Transform strategy in use.
    pub fn strategy(&self) -> TransformStrategy {
        self.strategy
    }

    /// dB scale applied by [`analyze`](Self::analyze).
    pub fn scale(&self) -> &MagnitudeScale {
        &self.scale
    }

    /// Forget cached transforms.
    pub fn clear_cache(&mut self) {
        self.transforms.clear();
    }

    /// Index of the cached provider for `size`, building it if needed, and a
    /// zeroed scratch buffer of that size.
    fn prepare(&mut self, size: usize) -> Result<usize> {
        let idx = match self.transforms.iter().position(|t| t.size() == size) {
            Some(i) => i,
            None => {
                tracing::trace!(size, strategy = %self.strategy, "building transform");
                self.transforms.push(self.strategy.build(size)?);
                self.transforms.len() - 1
            }
        };
        if self.buffer.len() != size {
            self.buffer = zeroed(size, "spectrum buffer")?;
        } else {
            self.buffer.fill(0.0);
        }
        Ok(idx)
    }

    /// Magnitude (dB) and phase spectrum of a zero-phase windowed frame.
    ///
    /// `waveform` and `window` hold the same number of samples. The transform
    /// is [`analysis_transform_size`] points long; the second half of the
    /// windowed frame starts at index 0 and the first half wraps around to
    /// the end, so phases are measured at the window center. `mag_db` and
    /// `phase` must hold at least `size / 2` bins. Bins whose transform is
    /// exactly zero keep their previous values. Returns the number of bins.
    pub fn analyze(
        &mut self,
        waveform: &[f32],
        window: &[f32],
        mag_db: &mut [f32],
        phase: &mut [f32],
    ) -> Result<usize> {
        let size_window = window.len();
        check_at_least("window", size_window, 1)?;
        check_at_least("waveform", waveform.len(), size_window)?;
        let size_fft = analysis_transform_size(size_window);
        let size_mag = size_fft / 2;
        check_at_least("magnitude spectrum", mag_db.len(), size_mag)?;
        check_at_least("phase spectrum", phase.len(), size_mag)?;

        let idx = self.prepare(size_fft)?;
        let middle = size_window.div_ceil(2);

        let offset = size_fft - (middle - 1);
        for i in 0..middle - 1 {
            self.buffer[offset + i] = window[i] * waveform[i];
        }
        let offset = middle - 1;
        for i in 0..middle {
            self.buffer[i] = window[offset + i] * waveform[offset + i];
        }

        self.transforms[idx].forward(&mut self.buffer)?;
        self.to_polar(size_mag, mag_db, phase, true);
        Ok(size_mag)
    }

    /// Linear magnitude and phase of `waveform * window`, zero-padded to
    /// `size_fft`, without centering.
    ///
    /// `phase` may be `None` when only magnitudes are needed. Returns the
    /// number of bins, `size_fft / 2`.
    pub fn quick_spectrum(
        &mut self,
        waveform: &[f32],
        window: &[f32],
        size_fft: usize,
        mag: &mut [f32],
        phase: Option<&mut [f32]>,
    ) -> Result<usize> {
        let size_window = window.len();
        check_at_least("waveform", waveform.len(), size_window)?;
        check_at_least("transform", size_fft, size_window)?;
        let size_mag = size_fft / 2;
        check_at_least("magnitude spectrum", mag.len(), size_mag)?;

        let idx = self.prepare(size_fft)?;
        for (b, (&w, &x)) in self
            .buffer
            .iter_mut()
            .zip(window.iter().zip(waveform.iter()))
        {
            *b = w * x;
        }
        self.transforms[idx].forward(&mut self.buffer)?;

        match phase {
            Some(phase) => {
                check_at_least("phase spectrum", phase.len(), size_mag)?;
                self.to_polar(size_mag, mag, phase, false);
            }
            None => {
                for (i, m) in mag.iter_mut().take(size_mag).enumerate() {
                    let (re, im) = (self.buffer[2 * i], self.buffer[2 * i + 1]);
                    if re != 0.0 || im != 0.0 {
                        *m = re.hypot(im);
                    }
                }
            }
        }
        Ok(size_mag)
    }

    /// Inverse of [`quick_spectrum`](Self::quick_spectrum), added into
    /// `waveform`.
    ///
    /// The first `waveform.len()` samples of the `size_fft`-point inverse
    /// transform are accumulated, so successive calls overlap-add.
    pub fn inv_quick_spectrum(
        &mut self,
        mag: &[f32],
        phase: &[f32],
        size_fft: usize,
        waveform: &mut [f32],
    ) -> Result<usize> {
        let size_mag = self.inverse(mag, phase, size_fft, waveform.len())?;
        for (w, &b) in waveform.iter_mut().zip(self.buffer.iter()) {
            *w += b;
        }
        Ok(size_mag)
    }

    /// Like [`inv_quick_spectrum`](Self::inv_quick_spectrum) but weights the
    /// output by `0.5 * window` before accumulating.
    pub fn inv_quick_spectrum_windowed(
        &mut self,
        mag: &[f32],
        phase: &[f32],
        size_fft: usize,
        waveform: &mut [f32],
        window: &[f32],
    ) -> Result<usize> {
        check_at_least("window", window.len(), waveform.len())?;
        let size_mag = self.inverse(mag, phase, size_fft, waveform.len())?;
        for ((w, &b), &win) in waveform
            .iter_mut()
            .zip(self.buffer.iter())
            .zip(window.iter())
        {
            *w += b * win * 0.5;
        }
        Ok(size_mag)
    }

    /// Inverse transform of a packed complex spectrum, for callers that
    /// build bins directly. The result replaces `data`.
    pub fn inverse_packed(&mut self, data: &mut [f32]) -> Result<()> {
        let idx = self.prepare(data.len())?;
        self.transforms[idx].inverse(data)
    }

    fn inverse(&mut self, mag: &[f32], phase: &[f32], size_fft: usize, out: usize) -> Result<usize> {
        let size_mag = size_fft / 2;
        check_at_least("magnitude spectrum", mag.len(), size_mag)?;
        check_at_least("phase spectrum", phase.len(), size_mag)?;
        check_at_least("transform", size_fft, out)?;

        let idx = self.prepare(size_fft)?;
        for i in 0..size_mag {
            let (sin, cos) = phase[i].sin_cos();
            self.buffer[2 * i] = mag[i] * cos;
            self.buffer[2 * i + 1] = mag[i] * sin;
        }
        self.transforms[idx].inverse(&mut self.buffer)?;
        Ok(size_mag)
    }

    fn to_polar(&self, size_mag: usize, mag: &mut [f32], phase: &mut [f32], db: bool) {
        for i in 0..size_mag {
            let re = self.buffer[2 * i];
            let im = self.buffer[2 * i + 1];
            if re != 0.0 || im != 0.0 {
                let m = re.hypot(im);
                mag[i] = if db { self.scale.mag_to_db(m) } else { m };
                phase[i] = im.atan2(re);
            }
        }
    }
}

fn check_at_least(what: &'static str, actual: usize, expected: usize) -> Result<()> {
    if actual < expected {
        return Err(Error::SizeMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}
