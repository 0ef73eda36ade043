//! Numeric fusion filters
//!
//! All filters carry mutable state and are meant to be constructed fresh for
//! every aggregation call. None of them is `Sync`-shared between requests.

pub mod ewma;
pub mod kalman;
pub mod particle;

pub use ewma::SmoothingFilter;
pub use kalman::{FusionState, ScalarFusionFilter};
pub use particle::{ParticleFusionFilter, ParticleSet};

/// Median of the non-null values, `None` when there are none
#[must_use]
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut valid: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if valid.is_empty() {
        return None;
    }
    valid.sort_by(f64::total_cmp);
    let n = valid.len();
    if n % 2 == 1 {
        Some(valid[n / 2])
    } else {
        Some((valid[n / 2 - 1] + valid[n / 2]) / 2.0)
    }
}

/// `max - min` over the non-null values, `None` with fewer than two
#[must_use]
pub fn spread(values: &[Option<f64>]) -> Option<f64> {
    let valid: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if valid.len() < 2 {
        return None;
    }
    let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
    Some(max - min)
}
