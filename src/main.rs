use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

use chrono::Utc;
use meteofuse::aurora::{self, NoaaKpSource};
use meteofuse::models::WeatherSnapshot;
use meteofuse::service::local_hour;
use meteofuse::{
    CurrentWeather, ForecastReport, MeteoFuseConfig, MeteoFuseError, ThemeClassifier,
    WeatherAggregator, telemetry,
};

#[derive(Parser, Debug)]
#[command(name = "meteofuse")]
#[command(about = "Fuse weather snapshots from several providers into one forecast")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "METEOFUSE_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate a JSON array of snapshots and print the fused forecast
    Aggregate {
        /// JSON file holding the snapshots, primary first
        #[arg(short, long)]
        input: PathBuf,

        /// Summary and prompt language (en, cs, de)
        #[arg(short, long)]
        language: Option<String>,

        /// Hour of day (0-23) for the theme; defaults to the location's local hour
        #[arg(long)]
        hour: Option<u32>,
    },

    /// Classify a single current state into a theme
    Theme {
        /// WMO weather code
        #[arg(long)]
        code: Option<u8>,

        /// Temperature in °C
        #[arg(long, allow_negative_numbers = true)]
        temperature: f64,

        /// Wind speed in km/h
        #[arg(long)]
        wind: Option<f64>,

        /// Cloud cover in percent
        #[arg(long)]
        cloud_cover: Option<u8>,

        #[arg(long)]
        description: Option<String>,

        /// Hour of day (0-23)
        #[arg(long)]
        hour: u32,
    },

    /// Aurora visibility outlook for a latitude
    Aurora {
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,

        /// Score this Kp index instead of fetching NOAA readings
        #[arg(long)]
        kp: Option<f64>,

        /// Description language (en, cs)
        #[arg(short, long)]
        language: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        match e.downcast_ref::<MeteoFuseError>() {
            Some(err) => {
                error!("{err}");
                eprintln!("{}", err.user_message());
            }
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = MeteoFuseConfig::load_from_path(args.config.clone())
        .context("Failed to load configuration")?;
    if args.verbose {
        config.logging.level = "debug".to_string();
    }
    telemetry::init(&config.logging)?;
    debug!(?args, "Starting meteofuse");

    match args.command {
        Command::Aggregate {
            input,
            language,
            hour,
        } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let snapshots: Vec<WeatherSnapshot> = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid snapshot JSON in {}", input.display()))?;
            let language = language.unwrap_or_else(|| config.defaults.language.clone());

            let aggregator = WeatherAggregator::from_config(&config)?;
            info!(
                sources = snapshots.len(),
                ai = aggregator.has_ai(),
                "Aggregating snapshots"
            );
            let forecast = aggregator.aggregate(snapshots, &language).await?;

            let hour = hour.unwrap_or_else(|| local_hour(&forecast.location, Utc::now()));
            let theme = ThemeClassifier::new().classify(&forecast.current, hour);
            let report = ForecastReport { forecast, theme };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Theme {
            code,
            temperature,
            wind,
            cloud_cover,
            description,
            hour,
        } => {
            let state = CurrentWeather {
                temperature,
                wind_speed: wind,
                weather_code: code,
                weather_description: description,
                cloud_cover,
                ..Default::default()
            };
            let theme = ThemeClassifier::new().classify(&state, hour);
            println!("{}", serde_json::to_string_pretty(&theme)?);
        }
        Command::Aurora {
            latitude,
            kp,
            language,
        } => {
            let language = language.unwrap_or_else(|| config.defaults.language.clone());
            let output = match kp {
                Some(kp) => serde_json::json!({
                    "kp": kp,
                    "description": aurora::kp_description(kp, &language),
                    "required_kp": aurora::required_kp(latitude),
                    "visibility_probability": aurora::visibility_probability(kp, latitude),
                }),
                None => {
                    let source = NoaaKpSource::new()?;
                    serde_json::to_value(aurora::fetch_outlook(&source, latitude, &language).await?)?
                }
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
