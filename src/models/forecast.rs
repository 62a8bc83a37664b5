//! Forecast models: raw provider slots and the display-ready series

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Upper bound on slots kept in a [`ForecastSeries`]
pub const MAX_FORECAST_SLOTS: usize = 3;

/// One forecast entry as delivered by the provider, before formatting
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RawForecastSlot {
    /// Timestamp text in `yyyy-MM-dd HH:mm:ss` form
    pub timestamp: String,
    pub temperature_c: f64,
    pub description: String,
}

/// Parsed forecast payload: city plus the full ordered slot list
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RawForecast {
    pub city_name: String,
    pub slots: Vec<RawForecastSlot>,
}

/// One display-ready forecast entry
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastSlot {
    /// Short label such as "Mon, 06 Jan"
    pub label: String,
    pub timestamp: NaiveDateTime,
    /// Temperature in Celsius
    pub temperature_c: f64,
    pub description: String,
}

impl ForecastSlot {
    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.1}°C", self.temperature_c)
    }
}

/// Bounded forecast window for one city, in source order
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastSeries {
    pub city_name: String,
    pub slots: Vec<ForecastSlot>,
}

impl ForecastSeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
