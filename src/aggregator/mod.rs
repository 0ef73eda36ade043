//! Multi-source aggregation orchestrator
//!
//! Chooses between the single-source, AI and statistical paths and
//! assembles the [`AggregatedForecast`]. AI failures are never surfaced to
//! the caller; they select the statistical path.

pub mod statistical;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::ai::{AiDeduction, AiFailure, AiStrategy, DeductionRequest, OpenAiStrategy};
use crate::astronomy;
use crate::config::{FusionConfig, MeteoFuseConfig};
use crate::filters;
use crate::models::{
    AggregatedForecast, AggregationStrategy, Astronomy, CurrentWeather, WeatherSnapshot,
};
use crate::{MeteoFuseError, Result};

pub use statistical::{
    Agreement, FusionMethod, FusionOutcome, SINGLE_SOURCE_CONFIDENCE, STATISTICAL_CONFIDENCE,
};

const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(20);

/// Fuses provider snapshots into one forecast.
///
/// Holds no per-request state: every call builds its own filters, so one
/// aggregator can serve concurrent requests.
#[derive(Clone)]
pub struct WeatherAggregator {
    fusion: FusionConfig,
    ai: Option<Arc<dyn AiStrategy>>,
    ai_timeout: Duration,
    backfill_astronomy: bool,
}

impl std::fmt::Debug for WeatherAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherAggregator")
            .field("fusion", &self.fusion)
            .field("ai", &self.ai.as_ref().map(|s| s.name().to_string()))
            .field("ai_timeout", &self.ai_timeout)
            .field("backfill_astronomy", &self.backfill_astronomy)
            .finish()
    }
}

impl WeatherAggregator {
    /// Statistical-only aggregator
    #[must_use]
    pub fn new(fusion: FusionConfig) -> Self {
        Self {
            fusion,
            ai: None,
            ai_timeout: DEFAULT_AI_TIMEOUT,
            backfill_astronomy: true,
        }
    }

    /// Enable the AI path with an upper bound on each deduction
    #[must_use]
    pub fn with_ai(mut self, strategy: Arc<dyn AiStrategy>, timeout: Duration) -> Self {
        self.ai = Some(strategy);
        self.ai_timeout = timeout;
        self
    }

    #[must_use]
    pub fn without_astronomy_backfill(mut self) -> Self {
        self.backfill_astronomy = false;
        self
    }

    /// Wire the aggregator from loaded configuration.
    ///
    /// The AI path is enabled only when AI is enabled and a key resolves.
    pub fn from_config(config: &MeteoFuseConfig) -> Result<Self> {
        let aggregator = Self::new(config.fusion.clone());
        match OpenAiStrategy::from_config(&config.ai)? {
            Some(strategy) => {
                info!(model = %config.ai.model, "AI aggregation enabled");
                let timeout = Duration::from_secs(u64::from(config.ai.timeout_seconds));
                Ok(aggregator.with_ai(Arc::new(strategy), timeout))
            }
            None => {
                debug!("AI aggregation disabled, using statistical fusion only");
                Ok(aggregator)
            }
        }
    }

    #[must_use]
    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Aggregate `snapshots` (first one is the primary) into one forecast.
    ///
    /// Errors only on an empty input.
    #[instrument(skip(self, snapshots), fields(sources = snapshots.len()))]
    pub async fn aggregate(
        &self,
        snapshots: Vec<WeatherSnapshot>,
        language: &str,
    ) -> Result<AggregatedForecast> {
        if snapshots.is_empty() {
            return Err(MeteoFuseError::invalid_input(
                "At least one weather snapshot is required",
            ));
        }

        let sources_used: Vec<String> = snapshots.iter().map(|s| s.provider.clone()).collect();

        if snapshots.len() == 1 {
            debug!(provider = %sources_used[0], "Single source, passing through");
            return Ok(self.single_source(snapshots, sources_used));
        }

        if let Some(strategy) = &self.ai {
            match self.deduce(strategy.as_ref(), &snapshots, language).await {
                Ok(deduction) => {
                    info!(
                        strategy = strategy.name(),
                        confidence = deduction.confidence,
                        "AI aggregation succeeded"
                    );
                    return Ok(self.forecast_from_deduction(snapshots, sources_used, deduction));
                }
                Err(failure) => {
                    warn!(
                        strategy = strategy.name(),
                        "AI aggregation failed, falling back to statistical fusion: {failure}"
                    );
                }
            }
        }

        Ok(self.statistical(snapshots, sources_used, language))
    }

    async fn deduce(
        &self,
        strategy: &dyn AiStrategy,
        snapshots: &[WeatherSnapshot],
        language: &str,
    ) -> std::result::Result<AiDeduction, AiFailure> {
        let request = DeductionRequest::from_snapshots(snapshots, language);
        tokio::time::timeout(self.ai_timeout, strategy.deduce(&request))
            .await
            .map_err(|_| AiFailure::Timeout {
                seconds: self.ai_timeout.as_secs(),
            })?
    }

    fn single_source(
        &self,
        mut snapshots: Vec<WeatherSnapshot>,
        sources_used: Vec<String>,
    ) -> AggregatedForecast {
        let base = snapshots.swap_remove(0);
        let astronomy = self.astronomy_for(&base);
        AggregatedForecast {
            location: base.location,
            current: base.current,
            daily_forecast: base.daily_forecast,
            hourly_forecast: base.hourly_forecast,
            astronomy,
            summary: None,
            confidence: SINGLE_SOURCE_CONFIDENCE,
            sources_used,
            strategy: AggregationStrategy::SingleSource,
        }
    }

    fn forecast_from_deduction(
        &self,
        mut snapshots: Vec<WeatherSnapshot>,
        sources_used: Vec<String>,
        deduction: AiDeduction,
    ) -> AggregatedForecast {
        let humidities: Vec<Option<f64>> = snapshots.iter().map(|s| s.current.humidity).collect();
        let feels_likes: Vec<Option<f64>> =
            snapshots.iter().map(|s| s.current.feels_like).collect();

        let base = snapshots.swap_remove(0);
        let astronomy = self.astronomy_for(&base);

        let conditions = deduction
            .conditions
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let current = CurrentWeather {
            temperature: deduction.temperature,
            feels_like: deduction.feels_like.or_else(|| filters::median(&feels_likes)),
            humidity: deduction.humidity.or_else(|| filters::median(&humidities)),
            wind_speed: deduction.wind_speed.or(base.current.wind_speed),
            weather_description: conditions.or(base.current.weather_description.clone()),
            ..base.current
        };

        AggregatedForecast {
            location: base.location,
            current,
            daily_forecast: base.daily_forecast,
            hourly_forecast: base.hourly_forecast,
            astronomy,
            summary: Some(
                deduction
                    .reasoning
                    .unwrap_or_else(|| "AI aggregation complete".to_string()),
            ),
            confidence: deduction.confidence.clamp(0.0, 1.0),
            sources_used,
            strategy: AggregationStrategy::Ai,
        }
    }

    fn statistical(
        &self,
        mut snapshots: Vec<WeatherSnapshot>,
        sources_used: Vec<String>,
        language: &str,
    ) -> AggregatedForecast {
        let outcome = statistical::fuse(&snapshots, &self.fusion, language);
        debug!(method = ?outcome.method, confidence = outcome.confidence, "Statistical fusion complete");

        let base = snapshots.swap_remove(0);
        let astronomy = self.astronomy_for(&base);

        AggregatedForecast {
            location: base.location,
            current: outcome.current,
            daily_forecast: base.daily_forecast,
            hourly_forecast: outcome.hourly_forecast,
            astronomy,
            summary: Some(outcome.summary),
            confidence: outcome.confidence,
            sources_used,
            strategy: AggregationStrategy::Statistical,
        }
    }

    fn astronomy_for(&self, base: &WeatherSnapshot) -> Option<Astronomy> {
        if self.backfill_astronomy {
            Some(astronomy::backfill(
                base.astronomy.clone(),
                &base.location,
                base.fetched_at.date_naive(),
            ))
        } else {
            base.astronomy.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfidenceModel;
    use crate::models::{HourlyForecast, Location};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    fn snapshot(provider: &str, temperature: f64, wind: Option<f64>) -> WeatherSnapshot {
        WeatherSnapshot {
            provider: provider.to_string(),
            location: Location::new(50.08, 14.44, "Prague".to_string()),
            current: CurrentWeather {
                temperature,
                wind_speed: wind,
                humidity: Some(60.0),
                weather_code: Some(2),
                weather_description: Some("Partly cloudy".to_string()),
                ..Default::default()
            },
            daily_forecast: Vec::new(),
            hourly_forecast: vec![
                HourlyForecast {
                    time: "2026-05-01T12:00".to_string(),
                    temperature: 10.0,
                    ..Default::default()
                },
                HourlyForecast {
                    time: "2026-05-01T13:00".to_string(),
                    temperature: 20.0,
                    ..Default::default()
                },
            ],
            astronomy: None,
            fetched_at: Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn agreeing_sources() -> Vec<WeatherSnapshot> {
        vec![
            snapshot("open_meteo", 20.0, Some(10.0)),
            snapshot("met_norway", 20.5, Some(12.0)),
            snapshot("weather_api", 19.8, Some(9.0)),
        ]
    }

    enum Behavior {
        Succeed(AiDeduction),
        Fail(AiFailure),
        Hang,
    }

    struct ScriptedStrategy(Behavior);

    #[async_trait]
    impl AiStrategy for ScriptedStrategy {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn deduce(
            &self,
            _request: &DeductionRequest,
        ) -> std::result::Result<AiDeduction, AiFailure> {
            match &self.0 {
                Behavior::Succeed(deduction) => Ok(deduction.clone()),
                Behavior::Fail(failure) => Err(failure.clone()),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(AiFailure::EmptyContent)
                }
            }
        }
    }

    fn with_ai(behavior: Behavior) -> WeatherAggregator {
        WeatherAggregator::new(FusionConfig::default())
            .with_ai(Arc::new(ScriptedStrategy(behavior)), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let aggregator = WeatherAggregator::new(FusionConfig::default());
        let err = aggregator.aggregate(Vec::new(), "en").await.unwrap_err();
        assert!(matches!(err, MeteoFuseError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_single_source_passes_through() {
        let aggregator = with_ai(Behavior::Fail(AiFailure::EmptyContent));
        let input = snapshot("open_meteo", 18.3, Some(7.0));
        let expected = input.current.clone();

        let forecast = aggregator.aggregate(vec![input], "en").await.unwrap();
        assert_eq!(forecast.current, expected);
        assert_eq!(forecast.confidence, SINGLE_SOURCE_CONFIDENCE);
        assert_eq!(forecast.strategy, AggregationStrategy::SingleSource);
        assert_eq!(forecast.summary, None);
        assert_eq!(forecast.sources_used, vec!["open_meteo"]);
        // Hourly curve is untouched on the single-source path
        assert_eq!(forecast.hourly_forecast[1].temperature, 20.0);
        assert!(forecast.astronomy.unwrap().sunrise.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_ai_falls_back_to_statistical() {
        let aggregator = with_ai(Behavior::Hang);
        let forecast = aggregator.aggregate(agreeing_sources(), "en").await.unwrap();

        assert_eq!(forecast.strategy, AggregationStrategy::Statistical);
        assert_eq!(forecast.confidence, STATISTICAL_CONFIDENCE);
        assert_eq!(
            forecast.sources_used,
            vec!["open_meteo", "met_norway", "weather_api"]
        );
    }

    #[tokio::test]
    async fn test_ai_failures_fall_back_to_statistical() {
        for failure in [
            AiFailure::Timeout { seconds: 20 },
            AiFailure::Malformed("expected value at line 1".to_string()),
            AiFailure::Transport("connection refused".to_string()),
        ] {
            let forecast = with_ai(Behavior::Fail(failure))
                .aggregate(agreeing_sources(), "en")
                .await
                .unwrap();
            assert_eq!(forecast.strategy, AggregationStrategy::Statistical);
            assert_eq!(forecast.sources_used.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_ai_deduction_is_used() {
        let deduction = AiDeduction {
            temperature: 20.2,
            feels_like: None,
            humidity: Some(58.0),
            wind_speed: Some(10.5),
            conditions: Some("Mostly sunny".to_string()),
            confidence: 0.9,
            reasoning: Some("Sources agree closely.".to_string()),
        };
        let forecast = with_ai(Behavior::Succeed(deduction))
            .aggregate(agreeing_sources(), "en")
            .await
            .unwrap();

        assert_eq!(forecast.strategy, AggregationStrategy::Ai);
        assert_eq!(forecast.confidence, 0.9);
        assert_eq!(forecast.current.temperature, 20.2);
        assert_eq!(forecast.current.humidity, Some(58.0));
        assert_eq!(
            forecast.current.weather_description.as_deref(),
            Some("Mostly sunny")
        );
        // Categorical code still comes from the primary source
        assert_eq!(forecast.current.weather_code, Some(2));
        assert_eq!(forecast.summary.as_deref(), Some("Sources agree closely."));
    }

    #[tokio::test]
    async fn test_statistical_fusion_values() {
        let aggregator = WeatherAggregator::new(FusionConfig::default());
        let forecast = aggregator.aggregate(agreeing_sources(), "en").await.unwrap();

        // Median seed at unit uncertainty, then three updates per field
        assert!((forecast.current.temperature - 20.085_714_285_714).abs() < 1e-9);
        assert!((forecast.current.wind_speed.unwrap() - 10.142_857_142_857).abs() < 1e-9);
        assert_eq!(forecast.current.humidity, Some(60.0));
        assert_eq!(forecast.current.weather_code, Some(2));
        assert!(forecast.summary.unwrap().contains("Kalman"));
    }

    #[tokio::test]
    async fn test_spread_confidence_model() {
        let fusion = FusionConfig {
            confidence_model: ConfidenceModel::Spread,
            ..FusionConfig::default()
        };
        let forecast = WeatherAggregator::new(fusion)
            .aggregate(agreeing_sources(), "en")
            .await
            .unwrap();
        assert_eq!(forecast.confidence, 0.95);
    }

    #[tokio::test]
    async fn test_hourly_curve_is_smoothed() {
        let aggregator = WeatherAggregator::new(FusionConfig::default());
        let forecast = aggregator.aggregate(agreeing_sources(), "en").await.unwrap();
        let temps: Vec<f64> = forecast
            .hourly_forecast
            .iter()
            .map(|h| h.temperature)
            .collect();
        // alpha 0.4: 10, 0.4 * 20 + 0.6 * 10
        assert_eq!(temps.len(), 2);
        assert!((temps[0] - 10.0).abs() < 1e-9);
        assert!((temps[1] - 14.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_outlier_uses_particle_filter() {
        let sources = vec![
            snapshot("a", 20.0, None),
            snapshot("b", 20.3, None),
            snapshot("c", 19.8, None),
            snapshot("d", 35.0, None),
        ];
        let forecast = WeatherAggregator::new(FusionConfig::default())
            .aggregate(sources, "en")
            .await
            .unwrap();
        assert!(forecast.summary.unwrap().contains("particle"));
        assert!(
            (forecast.current.temperature - 20.0).abs() < 1.5,
            "{}",
            forecast.current.temperature
        );
        assert_eq!(forecast.current.wind_speed, None);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_independent() {
        let aggregator = Arc::new(WeatherAggregator::new(FusionConfig::default()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                tokio::spawn(async move { aggregator.aggregate(agreeing_sources(), "en").await })
            })
            .collect();

        for handle in handles {
            let forecast = handle.await.unwrap().unwrap();
            assert!((forecast.current.temperature - 20.085_714_285_714).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_backfill_can_be_disabled() {
        let forecast = WeatherAggregator::new(FusionConfig::default())
            .without_astronomy_backfill()
            .aggregate(agreeing_sources(), "en")
            .await
            .unwrap();
        assert!(forecast.astronomy.is_none());
    }
}
