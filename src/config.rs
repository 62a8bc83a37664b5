//! Configuration management for `Skycast`
//!
//! Handles loading configuration from files and environment variables and
//! validates it once at start-up. The resulting [`AppConfig`] is immutable and
//! passed by reference into the resolver, transport and orchestrator.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;
use crate::models::{Coordinates, LocationResult, LocationSource};

/// Credential values shipped in sample config files; never valid keys
pub const PLACEHOLDER_API_KEYS: [&str; 2] = ["your_openweathermap_api_key_here", "YOUR_API_KEY_HERE"];

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Geo-IP lookup and fallback location
    #[serde(default)]
    pub location: LocationConfig,
    /// Periodic refresh settings
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    pub api_key: Option<String>,
    /// Base URL for weather API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Language for weather descriptions
    #[serde(default = "default_weather_lang")]
    pub lang: String,
    /// Connect timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub connect_timeout_seconds: u32,
    /// Read timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub read_timeout_seconds: u32,
}

/// Geo-IP providers and the static default location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_city")]
    pub default_city: String,
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,
    #[serde(default = "default_longitude")]
    pub default_longitude: f64,
    /// Per-provider timeout in seconds
    #[serde(default = "default_location_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_ip_api_url")]
    pub ip_api_url: String,
    #[serde(default = "default_ipapi_co_url")]
    pub ipapi_co_url: String,
}

/// Periodic refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Interval between automatic refreshes in milliseconds
    #[serde(default = "default_refresh_interval")]
    pub interval_ms: u64,
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

// Default value functions
fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_weather_lang() -> String {
    "es".to_string()
}

fn default_weather_timeout() -> u32 {
    10
}

fn default_city() -> String {
    "Ciudad de México".to_string()
}

fn default_latitude() -> f64 {
    19.4326
}

fn default_longitude() -> f64 {
    -99.1332
}

fn default_location_timeout() -> u32 {
    5
}

fn default_ip_api_url() -> String {
    "http://ip-api.com/json?lang=es&fields=status,message,country,city,district,lat,lon".to_string()
}

fn default_ipapi_co_url() -> String {
    "https://ipapi.co/json/".to_string()
}

fn default_refresh_interval() -> u64 {
    30 * 60 * 1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            lang: default_weather_lang(),
            connect_timeout_seconds: default_weather_timeout(),
            read_timeout_seconds: default_weather_timeout(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            default_city: default_city(),
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
            timeout_seconds: default_location_timeout(),
            ip_api_url: default_ip_api_url(),
            ipapi_co_url: default_ipapi_co_url(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_refresh_interval(),
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

impl WeatherConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds.into())
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds.into())
    }

    /// Validate the API key without touching the network
    pub fn validate_api_key(&self) -> std::result::Result<&str, WeatherError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(WeatherError::configuration(
                "Weather API key is missing. Set weather.api_key in your config file.",
            ));
        };

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(WeatherError::configuration("Weather API key cannot be empty."));
        }

        if PLACEHOLDER_API_KEYS.contains(&api_key) {
            return Err(WeatherError::configuration(
                "Weather API key is still the sample placeholder. Please configure a real key.",
            ));
        }

        Ok(api_key)
    }
}

impl LocationConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }

    /// The static location used when every geo-IP provider fails
    pub fn default_location(&self) -> std::result::Result<LocationResult, WeatherError> {
        let coordinates = Coordinates::new(self.default_latitude, self.default_longitude)?;
        Ok(LocationResult::new(
            self.default_city.clone(),
            coordinates,
            LocationSource::Default,
        ))
    }
}

impl RefreshConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
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

        // Add environment variable overrides with SKYCAST_ prefix
        builder = builder.add_source(
            Environment::with_prefix("SKYCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("skycast").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.lang.is_empty() {
            self.weather.lang = default_weather_lang();
        }
        if self.weather.connect_timeout_seconds == 0 {
            self.weather.connect_timeout_seconds = default_weather_timeout();
        }
        if self.weather.read_timeout_seconds == 0 {
            self.weather.read_timeout_seconds = default_weather_timeout();
        }
        if self.location.default_city.is_empty() {
            self.location.default_city = default_city();
        }
        if self.location.timeout_seconds == 0 {
            self.location.timeout_seconds = default_location_timeout();
        }
        if self.refresh.interval_ms == 0 {
            self.refresh.interval_ms = default_refresh_interval();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings.
    ///
    /// The API key is checked separately by the transport so a bad key
    /// surfaces as a configuration error on the display instead of
    /// aborting start-up.
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.location.default_location()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.connect_timeout_seconds > 300 || self.weather.read_timeout_seconds > 300 {
            return Err(
                WeatherError::configuration("Weather API timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.location.timeout_seconds > 60 {
            return Err(
                WeatherError::configuration("Location lookup timeout cannot exceed 60 seconds")
                    .into(),
            );
        }

        if self.refresh.interval_ms < 60_000 {
            return Err(WeatherError::configuration(
                "Refresh interval must be at least 60000 ms (1 minute)",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WeatherError::configuration(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WeatherError::configuration(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("weather.base_url", &self.weather.base_url),
            ("location.ip_api_url", &self.location.ip_api_url),
            ("location.ipapi_co_url", &self.location.ipapi_co_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(WeatherError::configuration(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.weather.base_url, "https://api.openweathermap.org/data/2.5");
        assert_eq!(config.weather.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.weather.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.location.timeout(), Duration::from_secs(5));
        assert_eq!(config.refresh.interval(), Duration::from_secs(30 * 60));
        assert_eq!(config.logging.level, "info");
        assert!(config.weather.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_location() {
        let location = AppConfig::default().location.default_location().unwrap();
        assert_eq!(location.city, "Ciudad de México");
        assert_eq!(location.coordinates.latitude(), 19.4326);
        assert_eq!(location.coordinates.longitude(), -99.1332);
        assert_eq!(location.source, LocationSource::Default);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    #[case(Some("your_openweathermap_api_key_here"))]
    #[case(Some("YOUR_API_KEY_HERE"))]
    fn test_invalid_api_keys(#[case] key: Option<&str>) {
        let mut config = AppConfig::default();
        config.weather.api_key = key.map(str::to_string);
        let result = config.weather.validate_api_key();
        assert!(matches!(result, Err(WeatherError::Configuration { .. })));
    }

    #[test]
    fn test_valid_api_key_is_trimmed() {
        let mut config = AppConfig::default();
        config.weather.api_key = Some(" 0123456789abcdef ".to_string());
        assert_eq!(config.weather.validate_api_key().unwrap(), "0123456789abcdef");
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_refresh_interval() {
        let mut config = AppConfig::default();
        config.refresh.interval_ms = 1000;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Refresh interval"));
    }

    #[test]
    fn test_config_validation_default_coordinates() {
        let mut config = AppConfig::default();
        config.location.default_latitude = 123.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_fills_blanks() {
        let mut config = AppConfig::default();
        config.weather.lang = String::new();
        config.refresh.interval_ms = 0;
        config.apply_defaults();
        assert_eq!(config.weather.lang, "es");
        assert_eq!(config.refresh.interval_ms, 1_800_000);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[weather]
api_key = "abc123def456"
lang = "en"

[location]
default_city = "Madrid"
default_latitude = 40.4165
default_longitude = -3.7026

[refresh]
interval_ms = 600000
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.weather.api_key.as_deref(), Some("abc123def456"));
        assert_eq!(config.weather.lang, "en");
        assert_eq!(config.location.default_city, "Madrid");
        assert_eq!(config.refresh.interval_ms, 600_000);
        // untouched sections keep their defaults
        assert_eq!(config.location.timeout_seconds, 5);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = AppConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("skycast"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
