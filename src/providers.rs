//! Weather provider boundary
//!
//! Concrete providers live outside this crate. They fetch, normalize to
//! °C / km/h / hPa / % and hand back a [`WeatherSnapshot`] tagged with a
//! stable label.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::models::{Location, WeatherSnapshot};
use crate::{MeteoFuseError, Result};

/// A source of normalized weather snapshots
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Stable label, e.g. "open_meteo"
    fn name(&self) -> &str;

    /// Fetch current conditions and a `days`-long forecast for `location`
    async fn fetch(&self, location: &Location, days: u32) -> anyhow::Result<WeatherSnapshot>;
}

/// Fetch from every provider concurrently.
///
/// Failing providers are logged and skipped; the result keeps the order of
/// `providers`. Errors only when no provider returned data.
pub async fn gather_snapshots(
    providers: &[Arc<dyn WeatherProvider>],
    location: &Location,
    days: u32,
) -> Result<Vec<WeatherSnapshot>> {
    if providers.is_empty() {
        return Err(MeteoFuseError::provider("No weather providers configured"));
    }

    let results = join_all(providers.iter().map(|p| p.fetch(location, days))).await;

    let snapshots: Vec<WeatherSnapshot> = providers
        .iter()
        .zip(results)
        .filter_map(|(provider, result)| match result {
            Ok(snapshot) => {
                debug!(provider = provider.name(), "Provider returned snapshot");
                Some(snapshot)
            }
            Err(e) => {
                warn!(provider = provider.name(), "Provider failed: {e:#}");
                None
            }
        })
        .collect();

    if snapshots.is_empty() {
        return Err(MeteoFuseError::provider("All weather providers failed"));
    }
    Ok(snapshots)
}
