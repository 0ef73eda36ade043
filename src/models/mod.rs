//! Data models for `MeteoFuse`
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and metadata
//! - Weather: Per-provider snapshots and their current/hourly/daily series
//! - Forecast: The fused, confidence-scored result of one aggregation

pub mod forecast;
pub mod location;
pub mod weather;

// Re-export all public types for convenient access
pub use forecast::{AggregatedForecast, AggregationStrategy};
pub use location::Location;
pub use weather::{Astronomy, CurrentWeather, DailyForecast, HourlyForecast, WeatherSnapshot};
