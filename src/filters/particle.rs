//! Sample-based fusion that tolerates one source far from consensus

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use serde::{Deserialize, Serialize};

use super::median;

const INITIAL_SPREAD: f64 = 5.0;

/// Weighted samples representing a belief over one scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSet {
    pub positions: Vec<f64>,
    /// Same length as `positions`, sums to 1 after every normalization
    pub weights: Vec<f64>,
}

impl ParticleSet {
    fn uniform_weights(&mut self) {
        let n = self.positions.len();
        self.weights = vec![1.0 / n as f64; n];
    }

    fn normalize(&mut self) {
        let total: f64 = self.weights.iter().sum();
        if total.is_finite() && total > 0.0 {
            for w in &mut self.weights {
                *w /= total;
            }
        } else {
            self.uniform_weights();
        }
    }

    /// Weighted mean of the particle positions
    #[must_use]
    pub fn weighted_mean(&self) -> f64 {
        self.positions
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum()
    }
}

/// Monte-Carlo estimator over a fixed number of particles.
///
/// The measurement likelihood is a Gaussian plus a small constant floor,
/// so a measurement that no particle explains leaves the weights almost
/// untouched instead of dragging the whole cloud toward it.
#[derive(Debug)]
pub struct ParticleFusionFilter {
    count: usize,
    process_noise: f64,
    outlier_floor: f64,
    particles: Option<ParticleSet>,
    rng: StdRng,
}

impl ParticleFusionFilter {
    /// Filter seeded from the thread RNG
    #[must_use]
    pub fn new(count: usize, process_noise: f64) -> Self {
        Self::with_seed(count, process_noise, rand::rng().random())
    }

    /// Deterministic filter for reproducible runs
    #[must_use]
    pub fn with_seed(count: usize, process_noise: f64, seed: u64) -> Self {
        Self {
            count: count.max(1),
            process_noise: process_noise.max(0.0),
            outlier_floor: 1e-3,
            particles: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Override the constant likelihood floor; 0 gives a pure Gaussian likelihood
    #[must_use]
    pub fn with_outlier_floor(mut self, floor: f64) -> Self {
        self.outlier_floor = floor.max(0.0);
        self
    }

    #[must_use]
    pub fn particles(&self) -> Option<&ParticleSet> {
        self.particles.as_ref()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.particles.is_some()
    }

    /// Draw particles from N(guess, spread²) with uniform weights
    pub fn initialize(&mut self, guess: f64, spread: f64) {
        let positions = (0..self.count)
            .map(|_| self.sample_normal(guess, spread))
            .collect();
        let mut set = ParticleSet {
            positions,
            weights: Vec::new(),
        };
        set.uniform_weights();
        self.particles = Some(set);
    }

    /// Diffuse every particle with independent process noise
    pub fn predict(&mut self) {
        let Some(mut set) = self.particles.take() else {
            return;
        };
        for x in &mut set.positions {
            *x += self.sample_normal(0.0, self.process_noise);
        }
        self.particles = Some(set);
    }

    /// Reweight by the likelihood of `measurement` and renormalize.
    ///
    /// Weights that collapse to zero are reset to uniform.
    pub fn update(&mut self, measurement: f64, measurement_noise: f64) {
        let Some(set) = self.particles.as_mut() else {
            return;
        };
        if !measurement.is_finite() {
            return;
        }

        let noise = measurement_noise.abs().max(f64::EPSILON);
        let denom = 2.0 * noise * noise;
        for (x, w) in set.positions.iter().zip(set.weights.iter_mut()) {
            let diff = x - measurement;
            *w *= (-(diff * diff) / denom).exp() + self.outlier_floor;
        }
        set.normalize();
    }

    /// Systematic resampling proportional to weight, then uniform weights
    pub fn resample(&mut self) {
        let offset: f64 = self.rng.random();
        let Some(set) = self.particles.as_mut() else {
            return;
        };

        let n = set.positions.len();
        let step = 1.0 / n as f64;
        let mut resampled = Vec::with_capacity(n);
        let mut cumulative = set.weights[0];
        let mut j = 0;

        for i in 0..n {
            let u = (offset + i as f64) * step;
            while u > cumulative && j < n - 1 {
                j += 1;
                cumulative += set.weights[j];
            }
            resampled.push(set.positions[j]);
        }

        set.positions = resampled;
        set.uniform_weights();
    }

    /// Weighted mean, `None` before initialization
    #[must_use]
    pub fn estimate(&self) -> Option<f64> {
        self.particles.as_ref().map(ParticleSet::weighted_mean)
    }

    /// One-shot fusion of a batch of measurements.
    ///
    /// Returns 0.0 when every measurement is null.
    pub fn fuse(&mut self, measurements: &[Option<f64>], measurement_noise: f64) -> f64 {
        let Some(seed) = median(measurements) else {
            return 0.0;
        };
        if !self.is_initialized() {
            self.initialize(seed, INITIAL_SPREAD);
        }

        self.predict();
        for z in measurements.iter().flatten() {
            self.update(*z, measurement_noise);
        }
        self.resample();

        self.estimate().unwrap_or(seed)
    }

    // Box-Muller transform over two uniform draws
    fn sample_normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1: f64 = self.rng.random::<f64>().max(1e-12);
        let u2: f64 = self.rng.random();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}
