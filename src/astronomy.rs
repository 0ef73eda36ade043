//! Astronomy backfill for snapshots that lack sun or moon data
//!
//! Sun times come from the `sunrise` crate; the moon phase uses a
//! mean synodic month counted from a known new moon.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use sunrise::{Coordinates, SolarDay, SolarEvent};
use tracing::{debug, warn};

use crate::models::{Astronomy, Location};

const SYNODIC_MONTH_DAYS: f64 = 29.530_588_853;

/// Sunrise and sunset for `date`; `None` for polar day or night
pub fn sun_times(
    location: &Location,
    date: NaiveDate,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let coordinates = Coordinates::new(location.latitude, location.longitude).with_context(|| {
        format!(
            "Invalid coordinates: lat={}, lng={}",
            location.latitude, location.longitude
        )
    })?;

    let solar_day = SolarDay::new(coordinates, date);
    Ok((
        solar_day.event_time(SolarEvent::Sunrise),
        solar_day.event_time(SolarEvent::Sunset),
    ))
}

/// Moon phase in [0, 1): 0 = new, 0.5 = full
#[must_use]
pub fn moon_phase(at: DateTime<Utc>) -> f64 {
    // New moon of 2000-01-06 18:14 UTC
    let reference = Utc.with_ymd_and_hms(2000, 1, 6, 18, 14, 0).single();
    let Some(reference) = reference else {
        return 0.0;
    };
    let days = (at - reference).num_seconds() as f64 / 86_400.0;
    (days / SYNODIC_MONTH_DAYS).rem_euclid(1.0)
}

#[must_use]
pub fn moon_phase_name(phase: f64) -> &'static str {
    match phase {
        p if !(0.0339..=0.9661).contains(&p) => "New Moon",
        p if p < 0.216 => "Waxing Crescent",
        p if p < 0.284 => "First Quarter",
        p if p < 0.466 => "Waxing Gibbous",
        p if p < 0.534 => "Full Moon",
        p if p < 0.716 => "Waning Gibbous",
        p if p < 0.784 => "Last Quarter",
        _ => "Waning Crescent",
    }
}

/// Illuminated fraction in percent
#[must_use]
pub fn moon_illumination(phase: f64) -> u8 {
    let fraction = (1.0 - (2.0 * std::f64::consts::PI * phase).cos()) / 2.0;
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Fill every missing astronomy field that can be computed locally.
///
/// Provider-supplied values are never overwritten. A failing solar
/// computation is logged and leaves the sun fields empty.
#[must_use]
pub fn backfill(existing: Option<Astronomy>, location: &Location, date: NaiveDate) -> Astronomy {
    let mut astronomy = existing.unwrap_or_default();
    if astronomy.is_complete() {
        return astronomy;
    }

    if astronomy.sunrise.is_none() || astronomy.sunset.is_none() {
        match sun_times(location, date) {
            Ok((sunrise, sunset)) => {
                astronomy.sunrise = astronomy.sunrise.or(sunrise);
                astronomy.sunset = astronomy.sunset.or(sunset);
            }
            Err(e) => warn!("Astronomy backfill failed for {}: {e:#}", location.name),
        }
    }

    if astronomy.daylight_duration.is_none() {
        if let (Some(sunrise), Some(sunset)) = (astronomy.sunrise, astronomy.sunset) {
            let seconds = (sunset - sunrise).num_seconds();
            astronomy.daylight_duration = (seconds > 0).then_some(seconds);
        }
    }

    let noon = date.and_time(NaiveTime::MIN).and_utc() + chrono::Duration::hours(12);
    let phase = astronomy.moon_phase.unwrap_or_else(|| moon_phase(noon));
    astronomy.moon_phase = Some(phase);
    if astronomy.moon_phase_name.is_none() {
        astronomy.moon_phase_name = Some(moon_phase_name(phase).to_string());
    }
    if astronomy.moon_illumination.is_none() {
        astronomy.moon_illumination = Some(moon_illumination(phase));
    }

    debug!(location = %location.name, %date, "Astronomy backfilled");
    astronomy
}
