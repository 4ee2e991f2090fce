//! First-order pre-emphasis and its inverse.
//!
//! Analysis boosts high frequencies with `y[n] = x[n] - a x[n-1]` so weak
//! upper partials clear the peak threshold; synthesis undoes it with
//! `y[n] = x[n] + a y[n-1]`.

/// Emphasis coefficient.
pub const EMPHASIS_COEFFICIENT: f32 = 0.9;

/// Pre-emphasis filter state.
#[derive(Debug, Clone, Default)]
pub struct PreEmphasis {
    last_input: f32,
}

impl PreEmphasis {
    /// Create a filter with zero history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = x - EMPHASIS_COEFFICIENT * self.last_input;
        self.last_input = x;
        y
    }

    /// Filter a block in place.
    pub fn process_block(&mut self, block: &mut [f32]) {
        for s in block.iter_mut() {
            *s = self.process(*s);
        }
    }
}

/// De-emphasis filter state.
#[derive(Debug, Clone, Default)]
pub struct DeEmphasis {
    last_output: f32,
}

impl DeEmphasis {
    /// Create a filter with zero history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = x + EMPHASIS_COEFFICIENT * self.last_output;
        self.last_output = y;
        y
    }

    /// Filter a block in place.
    pub fn process_block(&mut self, block: &mut [f32]) {
        for s in block.iter_mut() {
            *s = self.process(*s);
        }
    }
}
