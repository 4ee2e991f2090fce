//! Analysis and synthesis windows.

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Window function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    /// Hamming window.
    Hamming,
    /// Three-term Blackman-Harris, -62 dB sidelobes.
    BlackmanHarris62,
    /// Three-term Blackman-Harris, -70 dB sidelobes.
    #[default]
    BlackmanHarris70,
    /// Four-term Blackman-Harris, -74 dB sidelobes.
    BlackmanHarris74,
    /// Four-term Blackman-Harris, -92 dB sidelobes.
    BlackmanHarris92,
    /// Periodic Hann window; sums to a constant at 50% overlap.
    Hann,
    /// Inverse of a periodic Blackman-Harris 92 dB window shaped by a
    /// triangle; undoes the main-lobe window of inverse-transform synthesis.
    IfftSynthesis,
}

const BH62: [f32; 4] = [0.44959, 0.49364, 0.05677, 0.0];
const BH70: [f32; 4] = [0.42323, 0.49755, 0.07922, 0.0];
const BH74: [f32; 4] = [0.40217, 0.49703, 0.09892, 0.00188];
/// Blackman-Harris 92 dB coefficients `a0..a3`.
pub const BH92: [f32; 4] = [0.35875, 0.48829, 0.14128, 0.01168];

impl WindowType {
    /// All named windows, in configuration order.
    pub const ALL: [WindowType; 7] = [
        WindowType::Hamming,
        WindowType::BlackmanHarris62,
        WindowType::BlackmanHarris70,
        WindowType::BlackmanHarris74,
        WindowType::BlackmanHarris92,
        WindowType::Hann,
        WindowType::IfftSynthesis,
    ];

    /// Configuration name of the window.
    pub fn name(self) -> &'static str {
        match self {
            WindowType::Hamming => "hamming",
            WindowType::BlackmanHarris62 => "blackman-harris-62",
            WindowType::BlackmanHarris70 => "blackman-harris-70",
            WindowType::BlackmanHarris74 => "blackman-harris-74",
            WindowType::BlackmanHarris92 => "blackman-harris-92",
            WindowType::Hann => "hann",
            WindowType::IfftSynthesis => "ifft-synthesis",
        }
    }

    /// Fill `out` with the window of length `out.len()`.
    pub fn fill(self, out: &mut [f32]) {
        let n = out.len();
        if n == 0 {
            return;
        }
        if n == 1 {
            out[0] = 1.0;
            return;
        }
        match self {
            WindowType::Hamming => {
                let c = 2.0 * PI / (n - 1) as f32;
                for (i, w) in out.iter_mut().enumerate() {
                    *w = 0.54 - 0.46 * (c * i as f32).cos();
                }
            }
            WindowType::BlackmanHarris62 => blackman_harris(out, &BH62, (n - 1) as f32),
            WindowType::BlackmanHarris70 => blackman_harris(out, &BH70, (n - 1) as f32),
            WindowType::BlackmanHarris74 => blackman_harris(out, &BH74, (n - 1) as f32),
            WindowType::BlackmanHarris92 => blackman_harris(out, &BH92, (n - 1) as f32),
            WindowType::Hann => {
                let c = 2.0 * PI / n as f32;
                for (i, w) in out.iter_mut().enumerate() {
                    *w = 0.5 - 0.5 * (c * i as f32).cos();
                }
            }
            WindowType::IfftSynthesis => ifft_synthesis(out),
        }
    }

    /// Window coefficients of length `size`.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        let mut coeffs = vec![0.0; size];
        self.fill(&mut coeffs);
        coeffs
    }

    /// Multiply a buffer by this window in place.
    pub fn apply(self, buffer: &mut [f32]) {
        let coeffs = self.coefficients(buffer.len());
        for (s, w) in buffer.iter_mut().zip(coeffs.iter()) {
            *s *= w;
        }
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WindowType::ALL
            .iter()
            .copied()
            .find(|w| w.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown window '{s}'"))
    }
}

fn blackman_harris(out: &mut [f32], a: &[f32; 4], period: f32) {
    let c = 2.0 * PI / period;
    for (i, w) in out.iter_mut().enumerate() {
        let x = c * i as f32;
        *w = a[0] - a[1] * x.cos() + a[2] * (2.0 * x).cos() - a[3] * (3.0 * x).cos();
    }
}

fn ifft_synthesis(out: &mut [f32]) {
    let n = out.len();
    let half = n as f32 / 2.0;
    // periodic BH92 peaks at n/2, the same place as the triangle
    blackman_harris(out, &BH92, n as f32);
    for (i, w) in out.iter_mut().enumerate() {
        let tri = if (i as f32) < half {
            i as f32 / half
        } else {
            2.0 - i as f32 / half
        };
        *w = if *w > 0.0 { tri / *w } else { 0.0 };
    }
}

/// Normalize a window so its samples sum to 2.
///
/// After scaling, a sinusoid of amplitude `A` measures `A` at its spectral
/// peak.
pub fn scale_window(window: &mut [f32]) {
    let sum: f32 = window.iter().sum();
    if sum > 0.0 {
        let scale = 2.0 / sum;
        for w in window.iter_mut() {
            *w *= scale;
        }
    }
}
