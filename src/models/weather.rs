//! Current conditions model and display methods

use serde::{Deserialize, Serialize};

use super::Coordinates;

/// Icon shown when the provider sends none ("clear sky, day")
pub const DEFAULT_ICON_CODE: &str = "01d";

/// Current weather at one place
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentConditions {
    /// Place name shown to the user
    pub city_name: String,
    /// Human-readable description of weather conditions
    pub description: String,
    /// Temperature in Celsius
    pub temperature_c: f64,
    /// Relative humidity (0-100)
    pub humidity_percent: f64,
    /// Wind speed in m/s
    pub wind_speed_mps: f64,
    /// Coordinates echoed by the provider, when present
    pub coordinates: Option<Coordinates>,
    /// Provider icon code such as "01d" or "10n"
    pub icon_code: String,
}

impl CurrentConditions {
    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.1}°C", self.temperature_c)
    }

    #[must_use]
    pub fn format_humidity(&self) -> String {
        format!("{:.0}%", self.humidity_percent)
    }

    /// Format wind information
    #[must_use]
    pub fn format_wind(&self) -> String {
        format!("{:.1} m/s", self.wind_speed_mps)
    }

    /// Description with its first letter upper-cased
    #[must_use]
    pub fn format_description(&self) -> String {
        let mut chars = self.description.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CurrentConditions {
        CurrentConditions {
            city_name: "Madrid".to_string(),
            description: "cielo despejado".to_string(),
            temperature_c: 21.54,
            humidity_percent: 60.0,
            wind_speed_mps: 3.2,
            coordinates: None,
            icon_code: DEFAULT_ICON_CODE.to_string(),
        }
    }

    #[test]
    fn test_formatting() {
        let weather = sample();
        assert_eq!(weather.format_temperature(), "21.5°C");
        assert_eq!(weather.format_humidity(), "60%");
        assert_eq!(weather.format_wind(), "3.2 m/s");
        assert_eq!(weather.format_description(), "Cielo despejado");
    }

    #[test]
    fn test_empty_description() {
        let mut weather = sample();
        weather.description.clear();
        assert_eq!(weather.format_description(), "");
    }
}
