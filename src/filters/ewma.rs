//! Exponentially weighted moving average over a time-ordered series

use serde::{Deserialize, Serialize};

/// Recency-weighted smoother, `y[i] = α·x[i] + (1-α)·y[i-1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingFilter {
    alpha: f64,
}

impl SmoothingFilter {
    /// Create a smoother; `alpha` is clamped into (0, 1].
    ///
    /// Higher alpha tracks new data faster, lower alpha rejects more noise
    /// at the cost of lag.
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_finite() && alpha > 0.0 {
            alpha.min(1.0)
        } else {
            1.0
        };
        Self { alpha }
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Smooth a series with gaps.
    ///
    /// The running value is seeded from the first non-null input (or 0 when
    /// there is none). A null input repeats the previous output.
    #[must_use]
    pub fn smooth_array(&self, data: &[Option<f64>]) -> Vec<f64> {
        let mut current = data.iter().flatten().copied().next().unwrap_or(0.0);

        data.iter()
            .map(|x| {
                if let Some(x) = x {
                    current = self.alpha * x + (1.0 - self.alpha) * current;
                }
                current
            })
            .collect()
    }

    /// Smooth a gap-free series
    #[must_use]
    pub fn smooth_values(&self, data: &[f64]) -> Vec<f64> {
        let with_gaps: Vec<Option<f64>> = data.iter().copied().map(Some).collect();
        self.smooth_array(&with_gaps)
    }
}

impl Default for SmoothingFilter {
    fn default() -> Self {
        Self::new(0.3)
    }
}
