//! Real-input transform providers.
//!
//! Every provider works in place on a buffer of `size` real samples and
//! leaves the spectrum in packed order:
//!
//! | index | value |
//! |-------|-------|
//! | 0 | DC (real) |
//! | 1 | Nyquist (real) |
//! | 2k, 2k+1 | real and imaginary part of bin k, `1 <= k < size/2` |
//!
//! The forward transform uses the `e^{-j 2π kn/N}` kernel and the inverse is
//! scaled by `1/N`, so a forward/inverse pair is the identity.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use sms_core::{Error, Result, zeroed};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Smallest transform size a provider accepts.
pub const MIN_TRANSFORM_SIZE: usize = 4;

/// Largest transform size a provider accepts.
pub const MAX_TRANSFORM_SIZE: usize = 1 << 20;

/// A real-input FFT of fixed size.
pub trait TransformProvider: Send {
    /// Number of real samples transformed.
    fn size(&self) -> usize;

    /// Forward transform, time domain in, packed spectrum out.
    fn forward(&mut self, data: &mut [f32]) -> Result<()>;

    /// Inverse transform, packed spectrum in, time domain out.
    fn inverse(&mut self, data: &mut [f32]) -> Result<()>;
}

/// How transforms are computed, chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformStrategy {
    /// Full-size complex FFT from a cached plan.
    #[default]
    Planned,
    /// Half-size complex FFT with real-signal post-processing.
    HalfSizeReal,
}

impl TransformStrategy {
    /// Build a provider of the given size.
    pub fn build(self, size: usize) -> Result<Box<dyn TransformProvider>> {
        Ok(match self {
            TransformStrategy::Planned => Box::new(PlannedTransform::new(size)?),
            TransformStrategy::HalfSizeReal => Box::new(HalfSizeRealTransform::new(size)?),
        })
    }

    /// Configuration name.
    pub fn name(self) -> &'static str {
        match self {
            TransformStrategy::Planned => "planned",
            TransformStrategy::HalfSizeReal => "half-size-real",
        }
    }
}

impl fmt::Display for TransformStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransformStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "planned" => Ok(TransformStrategy::Planned),
            "half-size-real" => Ok(TransformStrategy::HalfSizeReal),
            _ => Err(format!("unknown transform strategy '{s}'")),
        }
    }
}

fn check_size(size: usize) -> Result<()> {
    if !size.is_power_of_two() || !(MIN_TRANSFORM_SIZE..=MAX_TRANSFORM_SIZE).contains(&size) {
        return Err(Error::invalid_config(format!(
            "transform size {size} must be a power of two in {MIN_TRANSFORM_SIZE}..={MAX_TRANSFORM_SIZE}"
        )));
    }
    Ok(())
}

fn check_len(data: &[f32], size: usize) -> Result<()> {
    if data.len() != size {
        return Err(Error::SizeMismatch {
            what: "transform buffer",
            expected: size,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Full complex FFT of the real input.
pub struct PlannedTransform {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    size: usize,
}

impl PlannedTransform {
    /// Plan forward and inverse transforms of `size` points.
    pub fn new(size: usize) -> Result<Self> {
        check_size(size)?;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());

        Ok(Self {
            fft,
            ifft,
            buffer: zeroed(size, "transform buffer")?,
            scratch: zeroed(scratch_len, "transform scratch")?,
            size,
        })
    }
}

impl TransformProvider for PlannedTransform {
    fn size(&self) -> usize {
        self.size
    }

    fn forward(&mut self, data: &mut [f32]) -> Result<()> {
        check_len(data, self.size)?;
        for (c, &x) in self.buffer.iter_mut().zip(data.iter()) {
            *c = Complex::new(x, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let half = self.size / 2;
        data[0] = self.buffer[0].re;
        data[1] = self.buffer[half].re;
        for k in 1..half {
            data[2 * k] = self.buffer[k].re;
            data[2 * k + 1] = self.buffer[k].im;
        }
        Ok(())
    }

    fn inverse(&mut self, data: &mut [f32]) -> Result<()> {
        check_len(data, self.size)?;
        let n = self.size;
        let half = n / 2;

        // Rebuild the full Hermitian spectrum
        self.buffer[0] = Complex::new(data[0], 0.0);
        self.buffer[half] = Complex::new(data[1], 0.0);
        for k in 1..half {
            let bin = Complex::new(data[2 * k], data[2 * k + 1]);
            self.buffer[k] = bin;
            self.buffer[n - k] = bin.conj();
        }

        self.ifft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 1.0 / n as f32;
        for (x, c) in data.iter_mut().zip(self.buffer.iter()) {
            *x = c.re * scale;
        }
        Ok(())
    }
}

/// Real FFT computed as a half-size complex FFT of interleaved samples.
///
/// Even samples go to the real part and odd samples to the imaginary part;
/// the two half-length spectra are separated and combined with twiddles.
pub struct HalfSizeRealTransform {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    twiddles: Vec<Complex<f32>>,
    size: usize,
}

impl HalfSizeRealTransform {
    /// Plan a real transform of `size` points.
    pub fn new(size: usize) -> Result<Self> {
        check_size(size)?;
        let half = size / 2;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(half);
        let ifft = planner.plan_fft_inverse(half);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());

        let mut twiddles = zeroed(half, "transform twiddles")?;
        for (k, w) in twiddles.iter_mut().enumerate() {
            let angle = -2.0 * PI * k as f32 / size as f32;
            *w = Complex::new(angle.cos(), angle.sin());
        }

        Ok(Self {
            fft,
            ifft,
            buffer: zeroed(half, "transform buffer")?,
            scratch: zeroed(scratch_len, "transform scratch")?,
            twiddles,
            size,
        })
    }
}

impl TransformProvider for HalfSizeRealTransform {
    fn size(&self) -> usize {
        self.size
    }

    fn forward(&mut self, data: &mut [f32]) -> Result<()> {
        check_len(data, self.size)?;
        let half = self.size / 2;
        for (k, c) in self.buffer.iter_mut().enumerate() {
            *c = Complex::new(data[2 * k], data[2 * k + 1]);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let z0 = self.buffer[0];
        data[0] = z0.re + z0.im;
        data[1] = z0.re - z0.im;
        for k in 1..half {
            let z = self.buffer[k];
            let zc = self.buffer[half - k].conj();
            let even = (z + zc) * 0.5;
            let odd = (z - zc) * Complex::new(0.0, -0.5);
            let bin = even + self.twiddles[k] * odd;
            data[2 * k] = bin.re;
            data[2 * k + 1] = bin.im;
        }
        Ok(())
    }

    fn inverse(&mut self, data: &mut [f32]) -> Result<()> {
        check_len(data, self.size)?;
        let half = self.size / 2;

        let dc = data[0];
        let nyquist = data[1];
        self.buffer[0] = Complex::new((dc + nyquist) * 0.5, (dc - nyquist) * 0.5);
        for k in 1..half {
            let x = Complex::new(data[2 * k], data[2 * k + 1]);
            let xc = Complex::new(data[2 * (half - k)], -data[2 * (half - k) + 1]);
            let even = (x + xc) * 0.5;
            let odd = (x - xc) * 0.5 * self.twiddles[k].conj();
            self.buffer[k] = even + Complex::new(0.0, 1.0) * odd;
        }

        self.ifft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 1.0 / half as f32;
        for (k, c) in self.buffer.iter().enumerate() {
            data[2 * k] = c.re * scale;
            data[2 * k + 1] = c.im * scale;
        }
        Ok(())
    }
}
