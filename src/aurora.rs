//! Aurora outlook from the planetary Kp index
//!
//! The Kp readings come from a [`KpSource`]; [`NoaaKpSource`] reads the
//! public NOAA SWPC feeds. Description and visibility scoring are pure
//! functions of Kp and latitude.

use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{MeteoFuseError, Result};

pub const NOAA_KP_REALTIME_URL: &str =
    "https://services.swpc.noaa.gov/json/planetary_k_index_1m.json";
pub const NOAA_KP_FORECAST_URL: &str =
    "https://services.swpc.noaa.gov/products/noaa-planetary-k-index-forecast.json";

const FORECAST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Three-hour slots looked at for the peak and best viewing time (24 h)
const NEXT_DAY_SLOTS: usize = 8;
/// Slots kept in the outlook (3 days)
const OUTLOOK_SLOTS: usize = 24;

/// Geomagnetic activity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpActivity {
    Quiet,
    Unsettled,
    Active,
    MinorStorm,
    ModerateStorm,
    StrongStorm,
    SevereStorm,
    ExtremeStorm,
}

impl KpActivity {
    #[must_use]
    pub fn from_kp(kp: f64) -> Self {
        match kp {
            k if k < 2.0 => KpActivity::Quiet,
            k if k < 4.0 => KpActivity::Unsettled,
            k if k < 5.0 => KpActivity::Active,
            k if k < 6.0 => KpActivity::MinorStorm,
            k if k < 7.0 => KpActivity::ModerateStorm,
            k if k < 8.0 => KpActivity::StrongStorm,
            k if k < 9.0 => KpActivity::SevereStorm,
            _ => KpActivity::ExtremeStorm,
        }
    }

    /// Localized label; unknown languages get English
    #[must_use]
    pub fn describe(self, language: &str) -> &'static str {
        match (self, language) {
            (KpActivity::Quiet, "cs") => "Klidné",
            (KpActivity::Unsettled, "cs") => "Mírně aktivní",
            (KpActivity::Active, "cs") => "Aktivní",
            (KpActivity::MinorStorm, "cs") => "Slabá bouře (G1)",
            (KpActivity::ModerateStorm, "cs") => "Střední bouře (G2)",
            (KpActivity::StrongStorm, "cs") => "Silná bouře (G3)",
            (KpActivity::SevereStorm, "cs") => "Velmi silná bouře (G4)",
            (KpActivity::ExtremeStorm, "cs") => "Extrémní bouře (G5)",
            (KpActivity::Quiet, _) => "Quiet",
            (KpActivity::Unsettled, _) => "Unsettled",
            (KpActivity::Active, _) => "Active",
            (KpActivity::MinorStorm, _) => "Minor Storm (G1)",
            (KpActivity::ModerateStorm, _) => "Moderate Storm (G2)",
            (KpActivity::StrongStorm, _) => "Strong Storm (G3)",
            (KpActivity::SevereStorm, _) => "Severe Storm (G4)",
            (KpActivity::ExtremeStorm, _) => "Extreme Storm (G5)",
        }
    }
}

#[must_use]
pub fn kp_description(kp: f64, language: &str) -> &'static str {
    KpActivity::from_kp(kp).describe(language)
}

/// Minimum Kp for the aurora to reach `latitude` (either hemisphere)
#[must_use]
pub fn required_kp(latitude: f64) -> f64 {
    const THRESHOLDS: [(f64, f64); 8] = [
        (67.0, 1.0),
        (64.0, 2.0),
        (60.0, 3.0),
        (55.0, 5.0),
        (50.0, 6.0),
        (45.0, 7.0),
        (40.0, 8.0),
        (35.0, 9.0),
    ];
    let latitude = latitude.abs();
    THRESHOLDS
        .iter()
        .find(|(min_latitude, _)| latitude >= *min_latitude)
        .map_or(9.0, |(_, kp)| *kp)
}

/// Chance in percent of seeing the aurora at `latitude` under `kp`.
///
/// Ramps 0-25 % over the last Kp step below the requirement, 50 % at the
/// requirement, 75 % one step above, capped at 95 %.
#[must_use]
pub fn visibility_probability(kp: f64, latitude: f64) -> u8 {
    if !kp.is_finite() {
        return 0;
    }
    let required = required_kp(latitude);
    let probability = if kp < required - 1.0 {
        0.0
    } else if kp < required {
        (kp - (required - 1.0)) * 25.0
    } else if kp == required {
        50.0
    } else if kp == required + 1.0 {
        75.0
    } else {
        (50.0 + (kp - required) * 15.0).min(95.0)
    };
    probability.clamp(0.0, 100.0) as u8
}

/// One three-hour Kp forecast slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpForecastEntry {
    pub time: NaiveDateTime,
    pub kp: f64,
    /// NOAA G-scale, e.g. "G1"
    pub scale: Option<String>,
}

/// Latest Kp plus upcoming forecast slots in time order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KpReadings {
    pub current_kp: f64,
    pub forecast: Vec<KpForecastEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuroraOutlook {
    pub current_kp: f64,
    pub current_description: String,
    pub visibility_probability: u8,
    pub max_forecast_kp: f64,
    pub max_visibility_probability: u8,
    pub best_viewing_time: Option<NaiveDateTime>,
    pub best_viewing_kp: f64,
    pub forecast: Vec<KpForecastEntry>,
    pub source: String,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// Aurora viewing is best between 20:00 and 04:00
fn is_viewing_hour(time: &NaiveDateTime) -> bool {
    let hour = time.hour();
    hour >= 20 || hour <= 4
}

/// Score the readings for an observer at `latitude`
#[must_use]
pub fn outlook(readings: &KpReadings, latitude: f64, language: &str, source: &str) -> AuroraOutlook {
    let current = readings.current_kp;
    let next_day = &readings.forecast[..readings.forecast.len().min(NEXT_DAY_SLOTS)];

    let max_forecast_kp = next_day.iter().map(|f| f.kp).fold(current, f64::max);

    let mut best_time = None;
    let mut best_kp = current;
    for slot in next_day.iter().filter(|f| is_viewing_hour(&f.time)) {
        if slot.kp > best_kp {
            best_kp = slot.kp;
            best_time = Some(slot.time);
        }
    }
    // No night-time peak: fall back to the first highest slot of the day
    if best_time.is_none() {
        let peak = next_day
            .iter()
            .fold(None::<&KpForecastEntry>, |best, slot| match best {
                Some(b) if b.kp >= slot.kp => Some(b),
                _ => Some(slot),
            });
        if let Some(peak) = peak {
            best_time = Some(peak.time);
            best_kp = peak.kp;
        }
    }

    AuroraOutlook {
        current_kp: round1(current),
        current_description: kp_description(current, language).to_string(),
        visibility_probability: visibility_probability(current, latitude),
        max_forecast_kp: round1(max_forecast_kp),
        max_visibility_probability: visibility_probability(max_forecast_kp, latitude),
        best_viewing_time: best_time,
        best_viewing_kp: round1(best_kp),
        forecast: readings.forecast.iter().take(OUTLOOK_SLOTS).cloned().collect(),
        source: source.to_string(),
    }
}

/// Provider of planetary Kp readings
#[async_trait]
pub trait KpSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> anyhow::Result<KpReadings>;
}

/// Fetch readings and score them; source failures become provider errors
pub async fn fetch_outlook(
    source: &dyn KpSource,
    latitude: f64,
    language: &str,
) -> Result<AuroraOutlook> {
    let readings = source.fetch().await.map_err(|e| {
        warn!(source = source.name(), "Kp fetch failed: {e:#}");
        MeteoFuseError::provider(format!("{}: {e}", source.name()))
    })?;
    debug!(
        current_kp = readings.current_kp,
        slots = readings.forecast.len(),
        "Kp readings received"
    );
    Ok(outlook(&readings, latitude, language, source.name()))
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Upcoming estimated or predicted slots from the NOAA forecast table.
///
/// The first row is a header; malformed rows are skipped.
#[must_use]
pub fn parse_forecast_rows(rows: &[Vec<Value>], now: NaiveDateTime) -> Vec<KpForecastEntry> {
    rows.iter()
        .skip(1)
        .filter_map(|row| {
            let [time, kp, status, scale] = row.as_slice() else {
                return None;
            };
            let status = status.as_str()?;
            if status != "estimated" && status != "predicted" {
                return None;
            }
            let time = NaiveDateTime::parse_from_str(time.as_str()?, FORECAST_TIME_FORMAT).ok()?;
            if time <= now {
                return None;
            }
            Some(KpForecastEntry {
                time,
                kp: value_as_f64(kp)?,
                scale: scale.as_str().map(str::to_string),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RealtimeKp {
    #[serde(default)]
    estimated_kp: Option<f64>,
}

/// NOAA Space Weather Prediction Center feeds (no key required)
#[derive(Debug, Clone)]
pub struct NoaaKpSource {
    client: reqwest::Client,
    realtime_url: String,
    forecast_url: String,
}

impl NoaaKpSource {
    pub fn new() -> Result<Self> {
        Self::with_urls(NOAA_KP_REALTIME_URL, NOAA_KP_FORECAST_URL)
    }

    pub fn with_urls(realtime_url: impl Into<String>, forecast_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MeteoFuseError::config(format!("Failed to build NOAA client: {e}")))?;
        Ok(Self {
            client,
            realtime_url: realtime_url.into(),
            forecast_url: forecast_url.into(),
        })
    }
}

#[async_trait]
impl KpSource for NoaaKpSource {
    fn name(&self) -> &str {
        "NOAA Space Weather Prediction Center"
    }

    async fn fetch(&self) -> anyhow::Result<KpReadings> {
        let realtime: Vec<RealtimeKp> = self
            .client
            .get(&self.realtime_url)
            .send()
            .await
            .context("Failed to request realtime Kp")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid realtime Kp JSON")?;
        let current_kp = realtime
            .last()
            .and_then(|entry| entry.estimated_kp)
            .unwrap_or(0.0);

        let rows: Vec<Vec<Value>> = self
            .client
            .get(&self.forecast_url)
            .send()
            .await
            .context("Failed to request Kp forecast")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid Kp forecast JSON")?;
        if rows.is_empty() {
            return Err(anyhow!("Kp forecast table is empty"));
        }

        Ok(KpReadings {
            current_kp,
            forecast: parse_forecast_rows(&rows, Utc::now().naive_utc()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;
    use serde_json::json;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn slot(day: u32, hour: u32, kp: f64) -> KpForecastEntry {
        KpForecastEntry {
            time: at(day, hour),
            kp,
            scale: None,
        }
    }

    #[rstest]
    #[case(0.0, "Quiet")]
    #[case(1.99, "Quiet")]
    #[case(2.0, "Unsettled")]
    #[case(4.0, "Active")]
    #[case(5.0, "Minor Storm (G1)")]
    #[case(6.5, "Moderate Storm (G2)")]
    #[case(7.0, "Strong Storm (G3)")]
    #[case(8.9, "Severe Storm (G4)")]
    #[case(9.0, "Extreme Storm (G5)")]
    fn test_kp_description_bands(#[case] kp: f64, #[case] expected: &str) {
        assert_eq!(kp_description(kp, "en"), expected);
    }

    #[test]
    fn test_kp_description_localized() {
        assert_eq!(kp_description(5.3, "cs"), "Slabá bouře (G1)");
        assert_eq!(kp_description(1.0, "cs"), "Klidné");
        assert_eq!(kp_description(1.0, "fr"), "Quiet");
    }

    #[rstest]
    #[case(70.0, 1.0)]
    #[case(-65.0, 2.0)]
    #[case(50.08, 6.0)]
    #[case(40.0, 8.0)]
    #[case(36.0, 9.0)]
    #[case(10.0, 9.0)]
    fn test_required_kp_by_latitude(#[case] latitude: f64, #[case] expected: f64) {
        assert_eq!(required_kp(latitude), expected);
    }

    #[rstest]
    #[case::far_below(3.0, 50.0, 0)]
    #[case::ramp(5.5, 50.0, 12)]
    #[case::at_threshold(6.0, 50.0, 50)]
    #[case::one_above(7.0, 50.0, 75)]
    #[case::between(6.5, 50.0, 57)]
    #[case::capped(9.0, 70.0, 95)]
    #[case::tromso_quiet(1.0, 69.6, 50)]
    fn test_visibility_probability(#[case] kp: f64, #[case] latitude: f64, #[case] expected: u8) {
        assert_eq!(visibility_probability(kp, latitude), expected);
    }

    #[test]
    fn test_visibility_of_non_finite_kp_is_zero() {
        assert_eq!(visibility_probability(f64::NAN, 60.0), 0);
    }

    #[test]
    fn test_parse_forecast_rows_keeps_upcoming_estimates() {
        let rows: Vec<Vec<Value>> = vec![
            vec![json!("time_tag"), json!("kp"), json!("observed"), json!("noaa_scale")],
            vec![json!("2026-10-17 00:00:00"), json!("2.33"), json!("observed"), Value::Null],
            vec![json!("2026-10-17 03:00:00"), json!("3.00"), json!("estimated"), Value::Null],
            vec![json!("2026-10-17 21:00:00"), json!("5.67"), json!("predicted"), json!("G1")],
            vec![json!("2026-10-18 00:00:00"), json!("n/a"), json!("predicted"), Value::Null],
            vec![json!("short row")],
        ];
        let parsed = parse_forecast_rows(&rows, at(17, 1));
        assert_eq!(
            parsed,
            vec![
                KpForecastEntry {
                    time: at(17, 3),
                    kp: 3.0,
                    scale: None
                },
                KpForecastEntry {
                    time: at(17, 21),
                    kp: 5.67,
                    scale: Some("G1".to_string())
                },
            ]
        );
    }

    #[test]
    fn test_outlook_prefers_night_peak() {
        let readings = KpReadings {
            current_kp: 2.04,
            forecast: vec![slot(17, 12, 6.0), slot(17, 21, 5.0), slot(18, 3, 4.0)],
        };
        let outlook = outlook(&readings, 50.0, "en", "test");
        assert_eq!(outlook.current_kp, 2.0);
        assert_eq!(outlook.current_description, "Unsettled");
        assert_eq!(outlook.visibility_probability, 0);
        assert_eq!(outlook.max_forecast_kp, 6.0);
        assert_eq!(outlook.max_visibility_probability, 50);
        assert_eq!(outlook.best_viewing_time, Some(at(17, 21)));
        assert_eq!(outlook.best_viewing_kp, 5.0);
        assert_eq!(outlook.source, "test");
    }

    #[test]
    fn test_outlook_without_night_peak_uses_first_daily_maximum() {
        let readings = KpReadings {
            current_kp: 3.0,
            forecast: vec![slot(17, 9, 2.0), slot(17, 12, 4.0), slot(17, 15, 4.0)],
        };
        let outlook = outlook(&readings, 60.0, "en", "test");
        assert_eq!(outlook.best_viewing_time, Some(at(17, 12)));
        assert_eq!(outlook.best_viewing_kp, 4.0);
    }

    #[test]
    fn test_outlook_with_empty_forecast() {
        let readings = KpReadings {
            current_kp: 4.2,
            forecast: Vec::new(),
        };
        let outlook = outlook(&readings, 64.0, "cs", "test");
        assert_eq!(outlook.max_forecast_kp, 4.2);
        assert_eq!(outlook.best_viewing_time, None);
        assert_eq!(outlook.best_viewing_kp, 4.2);
        assert_eq!(outlook.current_description, "Aktivní");
    }

    #[test]
    fn test_peak_only_looks_at_next_day() {
        let mut forecast: Vec<KpForecastEntry> = (0..8).map(|i| slot(17, i * 3, 1.0)).collect();
        forecast.push(slot(18, 0, 8.0));
        let outlook = outlook(
            &KpReadings {
                current_kp: 1.0,
                forecast,
            },
            50.0,
            "en",
            "test",
        );
        assert_eq!(outlook.max_forecast_kp, 1.0);
        assert_eq!(outlook.forecast.len(), 9);
    }

    struct FailingSource;

    #[async_trait]
    impl KpSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self) -> anyhow::Result<KpReadings> {
            Err(anyhow!("503 Service Unavailable"))
        }
    }

    #[tokio::test]
    async fn test_source_failure_is_a_provider_error() {
        let err = fetch_outlook(&FailingSource, 50.0, "en").await.unwrap_err();
        assert!(matches!(err, MeteoFuseError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_noaa_feed_is_an_error() {
        let source = NoaaKpSource::with_urls("http://127.0.0.1:9/rt.json", "http://127.0.0.1:9/fc.json")
            .unwrap();
        assert!(fetch_outlook(&source, 69.6, "en").await.is_err());
    }
}
