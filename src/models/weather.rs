//! Weather snapshot model and display methods
//!
//! Every provider normalizes its payload into a [`WeatherSnapshot`] using
//! common units: °C, km/h, hPa and percent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Location;

/// Current conditions as reported by one provider (or as fused)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct CurrentWeather {
    /// Temperature in Celsius
    pub temperature: f64,
    /// Feels like temperature in Celsius
    #[serde(default)]
    pub feels_like: Option<f64>,
    /// Relative humidity percentage
    #[serde(default)]
    pub humidity: Option<f64>,
    /// Wind speed in km/h
    #[serde(default)]
    pub wind_speed: Option<f64>,
    /// Wind direction in degrees (0-360, where 0/360 is North)
    #[serde(default)]
    pub wind_direction: Option<u16>,
    /// WMO weather code
    #[serde(default)]
    pub weather_code: Option<u8>,
    /// Human-readable description of weather conditions
    #[serde(default)]
    pub weather_description: Option<String>,
    #[serde(default)]
    pub uv_index: Option<f64>,
    /// Visibility in kilometers
    #[serde(default)]
    pub visibility: Option<f64>,
    /// Atmospheric pressure in hPa
    #[serde(default)]
    pub pressure: Option<f64>,
    /// Cloud cover percentage (0-100)
    #[serde(default)]
    pub cloud_cover: Option<u8>,
}

/// One day of a provider's daily series
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyForecast {
    /// ISO date, e.g. "2026-10-17"
    pub date: String,
    pub temperature_max: f64,
    pub temperature_min: f64,
    #[serde(default)]
    pub weather_code: Option<u8>,
    #[serde(default)]
    pub weather_description: Option<String>,
    #[serde(default)]
    pub precipitation_probability: Option<u8>,
    /// Precipitation sum in mm
    #[serde(default)]
    pub precipitation_sum: Option<f64>,
    #[serde(default)]
    pub wind_speed_max: Option<f64>,
    #[serde(default)]
    pub uv_index_max: Option<f64>,
    #[serde(default)]
    pub sunrise: Option<String>,
    #[serde(default)]
    pub sunset: Option<String>,
}

/// One hour of a provider's hourly series
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct HourlyForecast {
    /// ISO local time, e.g. "2026-10-17T14:00"
    pub time: String,
    /// Temperature in Celsius
    pub temperature: f64,
    #[serde(default)]
    pub weather_code: Option<u8>,
    #[serde(default)]
    pub weather_description: Option<String>,
    #[serde(default)]
    pub precipitation_probability: Option<u8>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
}

/// Sun and moon data for the snapshot's location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Astronomy {
    #[serde(default)]
    pub sunrise: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sunset: Option<DateTime<Utc>>,
    /// Daylight duration in seconds
    #[serde(default)]
    pub daylight_duration: Option<i64>,
    /// Moon phase 0-1 (0 = new, 0.5 = full)
    #[serde(default)]
    pub moon_phase: Option<f64>,
    #[serde(default)]
    pub moon_phase_name: Option<String>,
    /// Illuminated fraction of the moon in percent
    #[serde(default)]
    pub moon_illumination: Option<u8>,
}

impl Astronomy {
    /// True when every field a backfill can supply is already present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sunrise.is_some()
            && self.sunset.is_some()
            && self.daylight_duration.is_some()
            && self.moon_phase.is_some()
            && self.moon_phase_name.is_some()
            && self.moon_illumination.is_some()
    }
}

/// Complete, normalized weather data from a single provider
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherSnapshot {
    /// Stable provider label, e.g. "open_meteo"
    pub provider: String,
    pub location: Location,
    pub current: CurrentWeather,
    #[serde(default)]
    pub daily_forecast: Vec<DailyForecast>,
    /// Hourly series, ordered by time
    #[serde(default)]
    pub hourly_forecast: Vec<HourlyForecast>,
    #[serde(default)]
    pub astronomy: Option<Astronomy>,
    pub fetched_at: DateTime<Utc>,
}

impl CurrentWeather {
    /// Description from the provider, or derived from the WMO code
    #[must_use]
    pub fn description(&self) -> String {
        match (&self.weather_description, self.weather_code) {
            (Some(text), _) if !text.trim().is_empty() => text.clone(),
            (_, Some(code)) => weather_code_to_description(code).to_string(),
            _ => "Unknown".to_string(),
        }
    }
}

/// Convert a WMO weather code to a human-readable description
#[must_use]
pub fn weather_code_to_description(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        6..=9 => "Dust or sand whirls",
        30..=35 => "Duststorm or sandstorm",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}
