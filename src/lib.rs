//! `MeteoFuse` - multi-provider weather fusion
//!
//! Combines normalized snapshots from several weather providers into one
//! forecast with a confidence score, using an optional AI deduction and a
//! statistical fallback built on Kalman, particle and EWMA filters. The
//! fused state is mapped onto an ambient presentation theme. An aurora
//! outlook scores Kp index readings for an observer's latitude.

pub mod aggregator;
pub mod ai;
pub mod astronomy;
pub mod aurora;
pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod providers;
pub mod service;
pub mod telemetry;
pub mod theme;

// Re-export core types for public API
pub use aggregator::WeatherAggregator;
pub use ai::{AiDeduction, AiFailure, AiStrategy, OpenAiStrategy};
pub use config::MeteoFuseConfig;
pub use error::MeteoFuseError;
pub use filters::{ParticleFusionFilter, ScalarFusionFilter, SmoothingFilter};
pub use models::{AggregatedForecast, AggregationStrategy, CurrentWeather, Location, WeatherSnapshot};
pub use providers::WeatherProvider;
pub use service::{ForecastReport, ForecastService};
pub use theme::{Theme, ThemeClassifier, ThemeResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, MeteoFuseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
