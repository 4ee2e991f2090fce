//! Sine lookup table for oscillator-bank synthesis.

use std::f64::consts::TAU;

/// Number of entries in the default table.
pub const SINE_TABLE_SIZE: usize = 4096;

/// Sine values over one full period, read back by nearest entry.
///
/// Entry `i` holds `sin(i * 2π / (size - 1))`, so the first and last entries
/// both sit on a zero crossing.
#[derive(Debug, Clone)]
pub struct SineTable {
    table: Vec<f32>,
    inv_step: f64,
}

impl Default for SineTable {
    fn default() -> Self {
        Self::new(SINE_TABLE_SIZE)
    }
}

impl SineTable {
    /// Build a table with `size` entries (at least 2).
    pub fn new(size: usize) -> Self {
        let size = size.max(2);
        let step = TAU / (size - 1) as f64;
        let table = (0..size).map(|i| (step * i as f64).sin() as f32).collect();
        Self {
            table,
            inv_step: 1.0 / step,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty (never true for a constructed table).
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Sine of `theta` radians, any range.
    #[inline]
    pub fn sin(&self, theta: f64) -> f32 {
        let wrapped = theta.rem_euclid(TAU);
        let i = ((wrapped * self.inv_step + 0.5) as usize).min(self.table.len() - 1);
        self.table[i]
    }

    /// Cosine of `theta` radians, any range.
    #[inline]
    pub fn cos(&self, theta: f64) -> f32 {
        self.sin(theta + TAU / 4.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_std_sin() {
        let table = SineTable::default();
        for k in -200..200 {
            let theta = f64::from(k) * 0.0713;
            let err = (f64::from(table.sin(theta)) - theta.sin()).abs();
            assert!(err < 2e-3, "error {err} at {theta}");
        }
    }

    #[test]
    fn test_cos_quadrature() {
        let table = SineTable::default();
        assert!((table.cos(0.0) - 1.0).abs() < 1e-3);
        assert!(table.cos(TAU / 4.0).abs() < 2e-3);
    }
}
