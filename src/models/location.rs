//! Location model for geographic coordinates and geo-IP results

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// A validated (latitude, longitude) pair
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    latitude: f64,
    /// Longitude in decimal degrees
    longitude: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting values outside the valid ranges
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, WeatherError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(WeatherError::validation(format!(
                "Latitude must be between -90 and 90, got: {latitude}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(WeatherError::validation(format!(
                "Longitude must be between -180 and 180, got: {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Format as a short coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_coordinates())
    }
}

/// Where a [`LocationResult`] came from
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    /// ip-api.com (first choice)
    IpApiCom,
    /// ipapi.co (second choice)
    IpapiCo,
    /// Static fallback from configuration
    Default,
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocationSource::IpApiCom => "ip-api.com",
            LocationSource::IpapiCo => "ipapi.co",
            LocationSource::Default => "default",
        };
        f.write_str(name)
    }
}

/// Outcome of one location resolution cycle
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LocationResult {
    /// City name, already translated through the city table
    pub city: String,
    /// Neighbourhood or district when the provider knows it
    pub locality: Option<String>,
    pub coordinates: Coordinates,
    pub source: LocationSource,
}

impl LocationResult {
    #[must_use]
    pub fn new(city: String, coordinates: Coordinates, source: LocationSource) -> Self {
        Self {
            city,
            locality: None,
            coordinates,
            source,
        }
    }

    /// Attach a locality; blank values are ignored
    #[must_use]
    pub fn with_locality(mut self, locality: Option<String>) -> Self {
        self.locality = locality.filter(|l| !l.trim().is_empty());
        self
    }

    /// Most specific place name: `"locality, city"` or just the city
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.locality {
            Some(locality) => format!("{locality}, {}", self.city),
            None => self.city.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(19.4326, -99.1332).is_ok());
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_display_name_with_locality() {
        let coords = Coordinates::new(19.38, -99.16).unwrap();
        let location = LocationResult::new("Ciudad de México".into(), coords, LocationSource::IpApiCom)
            .with_locality(Some("Del Valle".into()));
        assert_eq!(location.display_name(), "Del Valle, Ciudad de México");
    }

    #[test]
    fn test_blank_locality_is_dropped() {
        let coords = Coordinates::new(40.4165, -3.7026).unwrap();
        let location = LocationResult::new("Madrid".into(), coords, LocationSource::IpapiCo)
            .with_locality(Some("  ".into()));
        assert_eq!(location.locality, None);
        assert_eq!(location.display_name(), "Madrid");
    }

    #[test]
    fn test_format_coordinates() {
        let coords = Coordinates::new(46.818_234, 8.227_456).unwrap();
        assert_eq!(coords.to_string(), "46.8182, 8.2275");
    }
}
