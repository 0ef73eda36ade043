//! Forecast service: gather, fuse, classify

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::aggregator::WeatherAggregator;
use crate::models::{AggregatedForecast, Location};
use crate::providers::{WeatherProvider, gather_snapshots};
use crate::theme::{ThemeClassifier, ThemeResult};
use crate::{MeteoFuseError, Result};

/// Fused forecast plus the theme for its current state
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub forecast: AggregatedForecast,
    pub theme: ThemeResult,
}

pub struct ForecastService {
    providers: Vec<Arc<dyn WeatherProvider>>,
    aggregator: WeatherAggregator,
    classifier: ThemeClassifier,
}

impl ForecastService {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn WeatherProvider>>, aggregator: WeatherAggregator) -> Self {
        Self {
            providers,
            aggregator,
            classifier: ThemeClassifier::new(),
        }
    }

    #[instrument(skip(self, location), fields(location = %location.name))]
    pub async fn forecast(
        &self,
        location: &Location,
        days: u32,
        language: &str,
    ) -> Result<ForecastReport> {
        if !(1..=16).contains(&days) {
            return Err(MeteoFuseError::invalid_input(format!(
                "Forecast days must be between 1 and 16, got {days}"
            )));
        }

        let snapshots = gather_snapshots(&self.providers, location, days).await?;
        debug!(received = snapshots.len(), "Snapshots gathered");

        let forecast = self.aggregator.aggregate(snapshots, language).await?;
        let hour = local_hour(location, Utc::now());
        let theme = self.classifier.classify(&forecast.current, hour);

        info!(
            strategy = ?forecast.strategy,
            confidence = forecast.confidence,
            theme = %theme.theme,
            "Forecast ready"
        );
        Ok(ForecastReport { forecast, theme })
    }
}

/// Hour of day at `location`; UTC when its timezone is absent or unknown
#[must_use]
pub fn local_hour(location: &Location, now: DateTime<Utc>) -> u32 {
    let Some(name) = location.timezone.as_deref() else {
        return now.hour();
    };
    match name.parse::<Tz>() {
        Ok(tz) => now.with_timezone(&tz).hour(),
        Err(_) => {
            warn!(timezone = name, "Unknown timezone, using UTC hour");
            now.hour()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FusionConfig;
    use crate::models::{AggregationStrategy, CurrentWeather, WeatherSnapshot};
    use crate::theme::Theme;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct StubProvider {
        name: &'static str,
        current: Option<CurrentWeather>,
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, location: &Location, _days: u32) -> anyhow::Result<WeatherSnapshot> {
            let current = self.current.clone().ok_or_else(|| anyhow!("rate limited"))?;
            Ok(WeatherSnapshot {
                provider: self.name.to_string(),
                location: location.clone(),
                current,
                daily_forecast: Vec::new(),
                hourly_forecast: Vec::new(),
                astronomy: None,
                fetched_at: Utc::now(),
            })
        }
    }

    fn stormy(temperature: f64) -> Option<CurrentWeather> {
        Some(CurrentWeather {
            temperature,
            weather_code: Some(95),
            ..Default::default()
        })
    }

    fn service(providers: Vec<StubProvider>) -> ForecastService {
        let providers = providers
            .into_iter()
            .map(|p| Arc::new(p) as Arc<dyn WeatherProvider>)
            .collect();
        ForecastService::new(providers, WeatherAggregator::new(FusionConfig::default()))
    }

    #[tokio::test]
    async fn test_forecast_fuses_and_classifies() {
        let service = service(vec![
            StubProvider { name: "a", current: stormy(18.0) },
            StubProvider { name: "b", current: None },
            StubProvider { name: "c", current: stormy(19.0) },
        ]);
        let location = Location::new(50.08, 14.44, "Prague".to_string());

        let report = service.forecast(&location, 3, "en").await.unwrap();
        assert_eq!(report.forecast.strategy, AggregationStrategy::Statistical);
        assert_eq!(report.forecast.sources_used, vec!["a", "c"]);
        assert_eq!(report.theme.theme, Theme::Storm);
    }

    #[tokio::test]
    async fn test_forecast_rejects_out_of_range_days() {
        let service = service(vec![StubProvider { name: "a", current: stormy(18.0) }]);
        let location = Location::from_coordinates(50.0, 14.0);
        assert!(service.forecast(&location, 0, "en").await.is_err());
        assert!(service.forecast(&location, 17, "en").await.is_err());
    }

    #[test]
    fn test_local_hour_uses_timezone() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 22, 30, 0).unwrap();
        let prague = Location::from_coordinates(50.0, 14.0).with_timezone("Europe/Prague");
        assert_eq!(local_hour(&prague, now), 23);

        let unknown = Location::from_coordinates(50.0, 14.0).with_timezone("Mars/Olympus");
        assert_eq!(local_hour(&unknown, now), 22);
        assert_eq!(local_hour(&Location::from_coordinates(0.0, 0.0), now), 22);
    }
}
