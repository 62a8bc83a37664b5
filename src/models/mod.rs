//! Data models for Skycast
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates and geo-IP results
//! - Weather: current conditions
//! - Forecast: raw provider slots and the bounded display series

pub mod forecast;
pub mod location;
pub mod weather;

// Re-export all public types for convenient access
pub use forecast::{ForecastSeries, ForecastSlot, MAX_FORECAST_SLOTS, RawForecast, RawForecastSlot};
pub use location::{Coordinates, LocationResult, LocationSource};
pub use weather::{CurrentConditions, DEFAULT_ICON_CODE};
