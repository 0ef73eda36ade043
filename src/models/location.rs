//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

/// Location a snapshot was fetched for
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Location name (city, region, etc.)
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Country name or code
    #[serde(default)]
    pub country: Option<String>,
    /// IANA timezone name, e.g. "Europe/Prague"
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: String) -> Self {
        Self {
            name,
            latitude,
            longitude,
            country: None,
            timezone: None,
        }
    }

    /// Create a location named after its coordinates
    #[must_use]
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self::new(
            latitude,
            longitude,
            format!("Location ({latitude:.2}, {longitude:.2})"),
        )
    }

    /// Attach an IANA timezone
    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_coordinates() {
        let location = Location::from_coordinates(50.0755, 14.4378);
        assert_eq!(location.name, "Location (50.08, 14.44)");
        assert!(location.timezone.is_none());
    }

    #[test]
    fn test_location_with_timezone() {
        let location = Location::new(46.818_234, 8.227_456, "Interlaken".to_string())
            .with_timezone("Europe/Zurich");
        assert_eq!(location.name, "Interlaken");
        assert_eq!(location.timezone.as_deref(), Some("Europe/Zurich"));
    }
}
