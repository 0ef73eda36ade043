//! Configuration management for `MeteoFuse`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::MeteoFuseError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeteoFuseConfig {
    /// AI-assisted aggregation settings
    #[serde(default)]
    pub ai: AiConfig,
    /// Statistical fusion tuning
    #[serde(default)]
    pub fusion: FusionConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Default request settings
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// OpenAI-compatible chat completion endpoint used for AI aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Enable the AI path when an API key is available
    #[serde(default = "default_ai_enabled")]
    pub enabled: bool,
    /// API key; falls back to `OPENAI_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// Upper bound for one AI call, in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_ai_max_tokens")]
    pub max_completion_tokens: u32,
}

/// How the statistical path scores confidence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceModel {
    /// Fixed value per path: 0.75 single source, 0.85 statistical
    #[default]
    Fixed,
    /// Derived from the max-min spread of raw temperatures
    Spread,
}

/// Process and measurement variance for one fused field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FieldVariance {
    pub process: f64,
    pub measurement: f64,
}

/// Statistical fusion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default)]
    pub confidence_model: ConfidenceModel,
    /// EWMA factor for the hourly temperature curve, in (0, 1]
    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f64,
    #[serde(default = "default_smooth_hourly")]
    pub smooth_hourly: bool,
    #[serde(default = "default_particle_count")]
    pub particle_count: usize,
    #[serde(default = "default_particle_process_noise")]
    pub particle_process_noise: f64,
    /// Temperature spread (°C) above which the particle filter is used
    #[serde(default = "default_outlier_spread")]
    pub outlier_spread_celsius: f64,
    #[serde(default = "default_temperature_variance")]
    pub temperature: FieldVariance,
    #[serde(default = "default_pressure_variance")]
    pub pressure: FieldVariance,
    #[serde(default = "default_wind_variance")]
    pub wind_speed: FieldVariance,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Default application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Language for summaries and AI prompts
    #[serde(default = "default_language")]
    pub language: String,
    /// Number of forecast days requested from providers
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

// Default value functions
fn default_ai_enabled() -> bool {
    true
}

fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ai_model() -> String {
    "gpt-5-mini".to_string()
}

fn default_ai_timeout() -> u32 {
    20
}

fn default_ai_max_tokens() -> u32 {
    500
}

fn default_smoothing_alpha() -> f64 {
    0.4
}

fn default_smooth_hourly() -> bool {
    true
}

fn default_particle_count() -> usize {
    1000
}

fn default_particle_process_noise() -> f64 {
    0.5
}

fn default_outlier_spread() -> f64 {
    5.0
}

fn default_temperature_variance() -> FieldVariance {
    FieldVariance {
        process: 0.01,
        measurement: 0.5,
    }
}

fn default_pressure_variance() -> FieldVariance {
    FieldVariance {
        process: 0.05,
        measurement: 1.0,
    }
}

fn default_wind_variance() -> FieldVariance {
    FieldVariance {
        process: 0.5,
        measurement: 4.0,
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_forecast_days() -> u32 {
    7
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: default_ai_enabled(),
            api_key: None,
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            timeout_seconds: default_ai_timeout(),
            max_completion_tokens: default_ai_max_tokens(),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            confidence_model: ConfidenceModel::default(),
            smoothing_alpha: default_smoothing_alpha(),
            smooth_hourly: default_smooth_hourly(),
            particle_count: default_particle_count(),
            particle_process_noise: default_particle_process_noise(),
            outlier_spread_celsius: default_outlier_spread(),
            temperature: default_temperature_variance(),
            pressure: default_pressure_variance(),
            wind_speed: default_wind_variance(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            forecast_days: default_forecast_days(),
        }
    }
}

impl AiConfig {
    /// API key from config, else from `OPENAI_API_KEY`
    #[must_use]
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Whether the AI path should be wired up at all
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.resolved_api_key().is_some()
    }
}

impl MeteoFuseConfig {
    /// Load configuration from `config_path`, or the default location, plus environment overrides
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. METEOFUSE_AI__MODEL
        builder = builder.add_source(
            Environment::with_prefix("METEOFUSE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: MeteoFuseConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("meteofuse").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.ai.base_url.is_empty() {
            self.ai.base_url = default_ai_base_url();
        }
        if self.ai.model.is_empty() {
            self.ai.model = default_ai_model();
        }
        if self.ai.timeout_seconds == 0 {
            self.ai.timeout_seconds = default_ai_timeout();
        }
        if self.ai.max_completion_tokens == 0 {
            self.ai.max_completion_tokens = default_ai_max_tokens();
        }
        if self.fusion.particle_count == 0 {
            self.fusion.particle_count = default_particle_count();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.defaults.language.is_empty() {
            self.defaults.language = default_language();
        }
        if self.defaults.forecast_days == 0 {
            self.defaults.forecast_days = default_forecast_days();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.ai.timeout_seconds > 120 {
            return Err(MeteoFuseError::config("AI timeout cannot exceed 120 seconds").into());
        }

        let alpha = self.fusion.smoothing_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(MeteoFuseError::config(format!(
                "Smoothing alpha must be in (0, 1], got {alpha}"
            ))
            .into());
        }

        if self.fusion.particle_count > 100_000 {
            return Err(MeteoFuseError::config("Particle count cannot exceed 100000").into());
        }

        for (name, variance) in [
            ("temperature", self.fusion.temperature),
            ("pressure", self.fusion.pressure),
            ("wind_speed", self.fusion.wind_speed),
        ] {
            if variance.process < 0.0 || variance.measurement <= 0.0 {
                return Err(MeteoFuseError::config(format!(
                    "Invalid {name} variances: process must be >= 0 and measurement > 0"
                ))
                .into());
            }
        }

        if self.fusion.outlier_spread_celsius <= 0.0 {
            return Err(
                MeteoFuseError::config("Outlier spread threshold must be positive").into(),
            );
        }

        if self.defaults.forecast_days > 16 {
            return Err(MeteoFuseError::config("Forecast days cannot exceed 16").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(MeteoFuseError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(MeteoFuseError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.ai.base_url.starts_with("http://") && !self.ai.base_url.starts_with("https://") {
            return Err(
                MeteoFuseError::config("AI base URL must be a valid HTTP or HTTPS URL").into(),
            );
        }

        Ok(())
    }
}
