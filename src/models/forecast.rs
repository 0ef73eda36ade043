//! Aggregated forecast model

use serde::{Deserialize, Serialize};

use super::{Astronomy, CurrentWeather, DailyForecast, HourlyForecast, Location};

/// Which orchestrator path produced a forecast
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// One provider, passed through unverified
    SingleSource,
    /// Values deduced by the AI strategy
    Ai,
    /// Kalman/particle fusion over all providers
    Statistical,
}

/// Fused forecast built once per aggregation call
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AggregatedForecast {
    pub location: Location,
    /// Fused current conditions
    pub current: CurrentWeather,
    /// Daily series of the base (first) source
    pub daily_forecast: Vec<DailyForecast>,
    /// Hourly series of the base source, optionally smoothed
    pub hourly_forecast: Vec<HourlyForecast>,
    pub astronomy: Option<Astronomy>,
    /// Free-text summary; absent for single-source pass-through
    pub summary: Option<String>,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Provider labels in input order
    pub sources_used: Vec<String>,
    pub strategy: AggregationStrategy,
}

impl AggregatedForecast {
    /// Confidence rendered as a whole percentage
    #[must_use]
    pub fn confidence_percent(&self) -> u8 {
        // Clamped to [0, 1] on construction, so the cast cannot overflow
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}
