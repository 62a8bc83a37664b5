//! `Skycast` - current weather and a short forecast for wherever you are
//!
//! This library locates the user by IP, fetches current conditions and
//! forecast from OpenWeatherMap with a city-name fallback, and delivers the
//! newest result to a presentation layer.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod location_resolver;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod presentation;
pub mod scheduler;
pub mod transport;

// Re-export core types for public API
pub use config::AppConfig;
pub use error::{ErrorKind, TransportFailure, WeatherError};
pub use location_resolver::{LocationProvider, LocationResolver};
pub use models::{Coordinates, CurrentConditions, ForecastSeries, LocationResult};
pub use orchestrator::{FetchOrchestrator, FetchOutcome, FetchResult, FetchState};
pub use presentation::{ConsolePresenter, Presenter, ResultDispatcher};
pub use scheduler::{PipelineEvent, RefreshScheduler, Trigger};
pub use transport::{WeatherProvider, WeatherTransport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
