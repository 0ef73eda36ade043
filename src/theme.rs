//! Ambient theme classification
//!
//! Maps a (fused) current state and the local hour onto a closed set of
//! presentation themes. Rules are evaluated in a fixed priority order and
//! the first match wins.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::CurrentWeather;

/// Presentation mood derived from weather and time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Hail,
    Sandstorm,
    Blizzard,
    Storm,
    ExtremeHeat,
    ExtremeCold,
    Wind,
    Fog,
    FogNight,
    Rain,
    RainNight,
    Snow,
    SnowNight,
    Cloudy,
    CloudyNight,
    Sunrise,
    Sunset,
    ClearNight,
    Sunny,
}

/// Animated overlay; only storms and clear nights carry one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Lightning,
    Stars,
}

/// Ordered triple of CSS hex colors
pub type Gradient = [&'static str; 3];

impl Theme {
    /// Static gradient for this theme
    #[must_use]
    pub fn gradient(self) -> Gradient {
        match self {
            Theme::Hail => ["#2b3a4a", "#5b6b7c", "#a9b8c6"],
            Theme::Sandstorm => ["#c2a36b", "#d9b77e", "#8c6d3f"],
            Theme::Blizzard => ["#dfe9f3", "#b0c4d8", "#7f96ad"],
            Theme::Storm => ["#1a0a2e", "#16213e", "#0f0f0f"],
            Theme::ExtremeHeat => ["#ff512f", "#f09819", "#ffd200"],
            Theme::ExtremeCold => ["#83a4d4", "#b6fbff", "#e0f7ff"],
            Theme::Wind => ["#757f9a", "#a7b4c2", "#d7dde8"],
            Theme::Fog => ["#bdc3c7", "#d5d9db", "#eceff1"],
            Theme::FogNight => ["#3e4a52", "#5a6770", "#2c3439"],
            Theme::Rain => ["#4a6fa5", "#6b8cae", "#8fa8c2"],
            Theme::RainNight => ["#1f2d3d", "#2e4057", "#3b5068"],
            Theme::Snow => ["#e8f4f8", "#d4e8ed", "#b8d4e3"],
            Theme::SnowNight => ["#2a3a4f", "#4b6584", "#a4b8cc"],
            Theme::Cloudy => ["#8e9eab", "#c5d5e4", "#eef2f3"],
            Theme::CloudyNight => ["#2c3e50", "#34495e", "#1a1a2e"],
            Theme::Sunrise => ["#ff9a9e", "#fecfef", "#ffd89b"],
            Theme::Sunset => ["#fa709a", "#fee140", "#642b73"],
            Theme::ClearNight => ["#0f0c29", "#302b63", "#24243e"],
            Theme::Sunny => ["#f6d365", "#fda085", "#ffecd2"],
        }
    }

    /// Static effect tag for this theme
    #[must_use]
    pub fn effect(self) -> Option<Effect> {
        match self {
            Theme::Storm => Some(Effect::Lightning),
            Theme::ClearNight => Some(Effect::Stars),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Hail => "hail",
            Theme::Sandstorm => "sandstorm",
            Theme::Blizzard => "blizzard",
            Theme::Storm => "storm",
            Theme::ExtremeHeat => "extreme_heat",
            Theme::ExtremeCold => "extreme_cold",
            Theme::Wind => "wind",
            Theme::Fog => "fog",
            Theme::FogNight => "fog_night",
            Theme::Rain => "rain",
            Theme::RainNight => "rain_night",
            Theme::Snow => "snow",
            Theme::SnowNight => "snow_night",
            Theme::Cloudy => "cloudy",
            Theme::CloudyNight => "cloudy_night",
            Theme::Sunrise => "sunrise",
            Theme::Sunset => "sunset",
            Theme::ClearNight => "clear_night",
            Theme::Sunny => "sunny",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified theme with its visual payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeResult {
    pub theme: Theme,
    pub gradient: Gradient,
    pub effect: Option<Effect>,
}

impl From<Theme> for ThemeResult {
    fn from(theme: Theme) -> Self {
        Self {
            theme,
            gradient: theme.gradient(),
            effect: theme.effect(),
        }
    }
}

const BLIZZARD_WIND_KMH: f64 = 50.0;
const STRONG_WIND_KMH: f64 = 40.0;
const EXTREME_HEAT_C: f64 = 32.0;
const EXTREME_COLD_C: f64 = -15.0;
const OVERCAST_CLOUD_COVER: u8 = 70;
const NIGHT_CLOUD_COVER: u8 = 50;

fn is_hail(code: u8) -> bool {
    matches!(code, 96 | 99)
}

fn is_sand_or_dust(code: u8) -> bool {
    matches!(code, 6..=9 | 30..=35)
}

fn is_snow(code: u8) -> bool {
    matches!(code, 71..=77 | 85..=86)
}

fn is_storm(code: u8) -> bool {
    code >= 95
}

fn is_fog(code: u8) -> bool {
    matches!(code, 45 | 48)
}

fn is_rain(code: u8) -> bool {
    matches!(code, 51..=67 | 80..=82)
}

fn is_overcast(code: u8) -> bool {
    code == 3
}

fn mentions_sand_or_dust(description: Option<&str>) -> bool {
    description.is_some_and(|text| {
        let text = text.to_lowercase();
        text.contains("sand") || text.contains("dust")
    })
}

/// Pure, priority-ordered theme classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeClassifier;

impl ThemeClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classify `state` at local `hour` (values above 23 wrap around)
    #[must_use]
    pub fn classify(&self, state: &CurrentWeather, hour: u32) -> ThemeResult {
        Self::select(state, hour % 24).into()
    }

    fn select(state: &CurrentWeather, hour: u32) -> Theme {
        let code = state.weather_code.unwrap_or(0);
        let cloud_cover = state.cloud_cover.unwrap_or(0);
        let wind = state.wind_speed.unwrap_or(0.0);
        let temperature = state.temperature;

        let is_night = !(6..=20).contains(&hour);
        let is_sunrise = (5..=7).contains(&hour);
        let is_sunset = (18..=20).contains(&hour);
        let by_time = |day: Theme, night: Theme| if is_night { night } else { day };

        if is_hail(code) {
            return Theme::Hail;
        }
        if is_sand_or_dust(code) || mentions_sand_or_dust(state.weather_description.as_deref()) {
            return Theme::Sandstorm;
        }
        if is_snow(code) && wind >= BLIZZARD_WIND_KMH {
            return Theme::Blizzard;
        }
        if is_storm(code) {
            return Theme::Storm;
        }
        if temperature >= EXTREME_HEAT_C {
            return Theme::ExtremeHeat;
        }
        if temperature <= EXTREME_COLD_C {
            return Theme::ExtremeCold;
        }
        if wind >= STRONG_WIND_KMH {
            return Theme::Wind;
        }
        if is_fog(code) {
            return by_time(Theme::Fog, Theme::FogNight);
        }
        if is_rain(code) {
            return by_time(Theme::Rain, Theme::RainNight);
        }
        if is_snow(code) {
            return by_time(Theme::Snow, Theme::SnowNight);
        }
        if is_overcast(code) || cloud_cover >= OVERCAST_CLOUD_COVER {
            return by_time(Theme::Cloudy, Theme::CloudyNight);
        }

        // Only clear weather reaches the time-of-day themes
        if is_sunrise {
            return Theme::Sunrise;
        }
        if is_sunset {
            return Theme::Sunset;
        }
        if is_night {
            return if cloud_cover > NIGHT_CLOUD_COVER {
                Theme::CloudyNight
            } else {
                Theme::ClearNight
            };
        }
        Theme::Sunny
    }
}
