//! Statistical fusion path
//!
//! Each fusible scalar gets its own freshly constructed filter; categorical
//! fields come from the primary (first) snapshot.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ConfidenceModel, FieldVariance, FusionConfig};
use crate::filters::{self, ParticleFusionFilter, ScalarFusionFilter, SmoothingFilter};
use crate::models::{CurrentWeather, HourlyForecast, WeatherSnapshot};

/// Confidence of an unverified single-source forecast
pub const SINGLE_SOURCE_CONFIDENCE: f64 = 0.75;
/// Confidence of a corroborated statistical forecast under [`ConfidenceModel::Fixed`]
pub const STATISTICAL_CONFIDENCE: f64 = 0.85;

/// Filter that produced the fused temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    Kalman,
    Particle,
}

impl FusionMethod {
    fn localized(self, language: &str) -> &'static str {
        match (self, language) {
            (FusionMethod::Kalman, "cs") => "Kalmanova filtru",
            (FusionMethod::Particle, "cs") => "částicového filtru",
            (FusionMethod::Kalman, "de") => "Kalman-Filter",
            (FusionMethod::Particle, "de") => "Partikelfilter",
            (FusionMethod::Kalman, _) => "Kalman filtering",
            (FusionMethod::Particle, _) => "particle filtering",
        }
    }
}

/// Agreement between providers, from the raw temperature spread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agreement {
    Good,
    Moderate,
    Low,
}

impl Agreement {
    #[must_use]
    pub fn from_spread(spread: f64) -> Self {
        if spread < 2.0 {
            Agreement::Good
        } else if spread < 5.0 {
            Agreement::Moderate
        } else {
            Agreement::Low
        }
    }

    /// Confidence under [`ConfidenceModel::Spread`]
    #[must_use]
    pub fn confidence(self) -> f64 {
        match self {
            Agreement::Good => 0.95,
            Agreement::Moderate => 0.85,
            Agreement::Low => 0.70,
        }
    }

    fn localized(self, language: &str) -> &'static str {
        match (self, language) {
            (Agreement::Good, "cs") => "Dobrá",
            (Agreement::Moderate, "cs") => "Střední",
            (Agreement::Low, "cs") => "Nízká",
            (Agreement::Good, "de") => "Gute",
            (Agreement::Moderate, "de") => "Mäßige",
            (Agreement::Low, "de") => "Geringe",
            (Agreement::Good, _) => "Good",
            (Agreement::Moderate, _) => "Moderate",
            (Agreement::Low, _) => "Low",
        }
    }
}

/// Result of the statistical path
#[derive(Debug, Clone, PartialEq)]
pub struct FusionOutcome {
    pub current: CurrentWeather,
    pub hourly_forecast: Vec<HourlyForecast>,
    pub confidence: f64,
    pub summary: String,
    pub method: FusionMethod,
}

/// Confidence for a multi-source statistical fusion under `model`
#[must_use]
pub fn statistical_confidence(model: ConfidenceModel, temperatures: &[Option<f64>]) -> f64 {
    match model {
        ConfidenceModel::Fixed => STATISTICAL_CONFIDENCE,
        ConfidenceModel::Spread => filters::spread(temperatures)
            .map_or(SINGLE_SOURCE_CONFIDENCE, |s| Agreement::from_spread(s).confidence()),
    }
}

fn kalman(variance: FieldVariance) -> ScalarFusionFilter {
    ScalarFusionFilter::new(variance.process, variance.measurement)
}

/// Kalman-fuse a nullable field; `None` when every source is null
fn fuse_optional(values: &[Option<f64>], variance: FieldVariance) -> Option<f64> {
    filters::median(values)?;
    Some(kalman(variance).fuse(values))
}

fn collect(snapshots: &[WeatherSnapshot], field: impl Fn(&CurrentWeather) -> Option<f64>) -> Vec<Option<f64>> {
    snapshots.iter().map(|s| field(&s.current)).collect()
}

/// Fuse the current state of every snapshot and smooth the base hourly curve.
///
/// `snapshots` must hold at least two entries; the first one is the primary.
#[must_use]
pub(crate) fn fuse(snapshots: &[WeatherSnapshot], config: &FusionConfig, language: &str) -> FusionOutcome {
    let primary = &snapshots[0];

    let temperatures = collect(snapshots, |c| Some(c.temperature));
    let wind_speeds = collect(snapshots, |c| c.wind_speed);
    let pressures = collect(snapshots, |c| c.pressure);
    let humidities = collect(snapshots, |c| c.humidity);
    let feels_likes = collect(snapshots, |c| c.feels_like);

    let spread = filters::spread(&temperatures).unwrap_or(0.0);
    let valid_temperatures = temperatures.iter().flatten().count();
    let method = if valid_temperatures >= 3 && spread > config.outlier_spread_celsius {
        FusionMethod::Particle
    } else {
        FusionMethod::Kalman
    };

    let temperature = match method {
        FusionMethod::Particle => {
            let mut filter =
                ParticleFusionFilter::new(config.particle_count, config.particle_process_noise);
            filter.fuse(&temperatures, config.temperature.measurement.sqrt())
        }
        FusionMethod::Kalman => kalman(config.temperature).fuse(&temperatures),
    };

    debug!(
        ?method,
        spread,
        temperature,
        "Fused temperature from {} sources",
        valid_temperatures
    );

    let current = CurrentWeather {
        temperature,
        feels_like: filters::median(&feels_likes),
        humidity: filters::median(&humidities),
        wind_speed: fuse_optional(&wind_speeds, config.wind_speed),
        pressure: fuse_optional(&pressures, config.pressure),
        ..primary.current.clone()
    };

    let mut hourly_forecast = primary.hourly_forecast.clone();
    if config.smooth_hourly {
        let curve: Vec<f64> = hourly_forecast.iter().map(|h| h.temperature).collect();
        let smoothed = SmoothingFilter::new(config.smoothing_alpha).smooth_values(&curve);
        for (hour, value) in hourly_forecast.iter_mut().zip(smoothed) {
            hour.temperature = value;
        }
    }

    FusionOutcome {
        current,
        hourly_forecast,
        confidence: statistical_confidence(config.confidence_model, &temperatures),
        summary: summary(snapshots.len(), method, Agreement::from_spread(spread), spread, language),
        method,
    }
}

fn summary(
    sources: usize,
    method: FusionMethod,
    agreement: Agreement,
    spread: f64,
    language: &str,
) -> String {
    let method = method.localized(language);
    let agreement_text = agreement.localized(language);
    match language {
        "cs" => format!(
            "Agregováno z {sources} zdrojů pomocí {method}. {agreement_text} shoda mezi poskytovateli (rozptyl teplot {spread:.1} °C)."
        ),
        "de" => format!(
            "Aus {sources} Quellen mittels {method} zusammengeführt. {agreement_text} Übereinstimmung zwischen den Anbietern (Temperaturspanne {spread:.1} °C)."
        ),
        _ => format!(
            "Aggregated from {sources} sources using {method}. {agreement_text} agreement between providers (temperature spread {spread:.1}°C)."
        ),
    }
}
