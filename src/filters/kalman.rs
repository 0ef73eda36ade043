//! One-dimensional Kalman filter for fusing simultaneous scalar measurements

use serde::{Deserialize, Serialize};

use super::median;

/// Current belief about one scalar quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionState {
    pub estimate: f64,
    /// Variance of the estimate, never negative
    pub uncertainty: f64,
}

/// Recursive Bayesian fusion of repeated noisy measurements of one quantity.
///
/// Sources are treated as simultaneous: [`predict`](Self::predict) runs once
/// per batch, [`update`](Self::update) once per measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFusionFilter {
    state: Option<FusionState>,
    process_variance: f64,
    measurement_variance: f64,
    initial_uncertainty: f64,
}

const DEFAULT_INITIAL_UNCERTAINTY: f64 = 1.0;

impl ScalarFusionFilter {
    #[must_use]
    pub fn new(process_variance: f64, measurement_variance: f64) -> Self {
        Self {
            state: None,
            process_variance: process_variance.max(0.0),
            // A zero measurement variance would make the gain 0/0 on a fresh seed
            measurement_variance: measurement_variance.max(f64::EPSILON),
            initial_uncertainty: DEFAULT_INITIAL_UNCERTAINTY,
        }
    }

    /// Variance of the median seed used by [`fuse`](Self::fuse); defaults to 1.0
    #[must_use]
    pub fn with_initial_uncertainty(mut self, uncertainty: f64) -> Self {
        if uncertainty.is_finite() && uncertainty > 0.0 {
            self.initial_uncertainty = uncertainty;
        }
        self
    }

    #[must_use]
    pub fn state(&self) -> Option<FusionState> {
        self.state
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Time update: the estimate is unchanged, its variance grows by `q`
    pub fn predict(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.uncertainty += self.process_variance;
        }
    }

    /// Measurement update with an optional per-measurement variance.
    ///
    /// The first measurement seeds the state; `None` is a no-op.
    pub fn update(&mut self, measurement: Option<f64>, variance: Option<f64>) {
        let Some(z) = measurement.filter(|z| z.is_finite()) else {
            return;
        };
        let r = variance
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(self.measurement_variance);

        match self.state.as_mut() {
            None => {
                self.state = Some(FusionState {
                    estimate: z,
                    uncertainty: r,
                });
            }
            Some(state) => {
                let gain = state.uncertainty / (state.uncertainty + r);
                state.estimate += gain * (z - state.estimate);
                state.uncertainty *= 1.0 - gain;
            }
        }
    }

    /// Fuse one batch of simultaneous measurements and return the estimate.
    ///
    /// A fresh filter is seeded from the median so that a single extreme
    /// first sample cannot dominate. Returns 0.0 when every measurement is
    /// null; callers must substitute their own fallback in that case.
    pub fn fuse(&mut self, measurements: &[Option<f64>]) -> f64 {
        match self.state {
            None => {
                let Some(seed) = median(measurements) else {
                    return 0.0;
                };
                self.state = Some(FusionState {
                    estimate: seed,
                    uncertainty: self.initial_uncertainty,
                });
            }
            Some(_) => self.predict(),
        }

        for z in measurements {
            self.update(*z, None);
        }

        self.state.map_or(0.0, |s| s.estimate)
    }
}

impl Default for ScalarFusionFilter {
    fn default() -> Self {
        Self::new(1e-4, 1.0)
    }
}
