//! Fetch pipeline state machine
//!
//! One run resolves the location, fetches current conditions and forecast by
//! coordinates, falls back to a query by city name if anything on the
//! coordinate path fails, and ends in `Done` or `Failed` with a single
//! [`FetchResult`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::aggregator::aggregate;
use crate::error::WeatherError;
use crate::location_resolver::LocationProvider;
use crate::models::{CurrentConditions, ForecastSeries, LocationResult};
use crate::parser::{parse_current, parse_forecast};
use crate::transport::{Resource, WeatherProvider, WeatherQuery};

/// Pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    ResolvingLocation,
    FetchingByCoordinates,
    FetchingByName,
    Done,
    Failed,
}

impl FetchState {
    /// Text for the status line while in this state
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        match self {
            FetchState::Idle => "Idle",
            FetchState::ResolvingLocation => "Detecting your location...",
            FetchState::FetchingByCoordinates => "Fetching weather data...",
            FetchState::FetchingByName => "Retrying by city name...",
            FetchState::Done => "Weather updated",
            FetchState::Failed => "Could not fetch weather data",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchState::Done | FetchState::Failed)
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The single value a pipeline run emits
#[derive(Debug)]
pub enum FetchResult {
    Success(CurrentConditions, ForecastSeries),
    /// Name-based fallback produced only one of the two parts
    PartialFailure {
        current: Option<CurrentConditions>,
        forecast: Option<ForecastSeries>,
        error: WeatherError,
    },
    Failure(WeatherError),
}

/// Terminal state, result, and the location the run used (if it got that far)
#[derive(Debug)]
pub struct FetchOutcome {
    pub state: FetchState,
    pub location: Option<LocationResult>,
    pub result: FetchResult,
}

/// Records transitions and reports them to an observer
struct Transitions<'a> {
    state: FetchState,
    observer: &'a mut (dyn FnMut(FetchState) + Send),
}

impl Transitions<'_> {
    fn advance(&mut self, next: FetchState) {
        debug!("Pipeline state {} -> {}", self.state, next);
        self.state = next;
        (self.observer)(next);
    }
}

/// Sequences location resolution and weather acquisition
pub struct FetchOrchestrator {
    location: Arc<dyn LocationProvider>,
    weather: Arc<dyn WeatherProvider>,
}

impl FetchOrchestrator {
    pub fn new(location: Arc<dyn LocationProvider>, weather: Arc<dyn WeatherProvider>) -> Self {
        Self { location, weather }
    }

    /// Run one pipeline without observing intermediate states
    pub async fn run_once(&self, generation: u64) -> FetchOutcome {
        self.run(generation, &mut |_| {}).await
    }

    /// Run one pipeline, reporting every state transition to `observer`
    #[instrument(skip(self, observer))]
    pub async fn run(
        &self,
        generation: u64,
        observer: &mut (dyn FnMut(FetchState) + Send),
    ) -> FetchOutcome {
        let mut machine = Transitions {
            state: FetchState::Idle,
            observer,
        };

        if let Err(e) = self.weather.check_credentials() {
            warn!("Refusing to fetch: {}", e);
            machine.advance(FetchState::Failed);
            return FetchOutcome {
                state: FetchState::Failed,
                location: None,
                result: FetchResult::Failure(e),
            };
        }

        machine.advance(FetchState::ResolvingLocation);
        let location = self.location.resolve().await;

        machine.advance(FetchState::FetchingByCoordinates);
        let by_coords = WeatherQuery::Coordinates(location.coordinates);
        let (current, forecast) = self.fetch_pair(&by_coords).await;

        let mut errors = match (current, forecast) {
            (Ok(current), Ok(forecast)) => {
                info!("Weather fetched by coordinates");
                machine.advance(FetchState::Done);
                return finish(
                    FetchState::Done,
                    location,
                    FetchResult::Success(current, forecast),
                );
            }
            (current, forecast) => {
                let errors: Vec<WeatherError> =
                    [current.err(), forecast.err()].into_iter().flatten().collect();
                for e in &errors {
                    warn!("Coordinate query failed: {}", e);
                }
                errors
            }
        };

        machine.advance(FetchState::FetchingByName);
        let by_name = WeatherQuery::City(location.city.clone());
        let (current, forecast) = self.fetch_pair(&by_name).await;

        let result = match (current, forecast) {
            (Ok(current), Ok(forecast)) => FetchResult::Success(current, forecast),
            (Ok(current), Err(error)) => FetchResult::PartialFailure {
                current: Some(current),
                forecast: None,
                error,
            },
            (Err(error), Ok(forecast)) => FetchResult::PartialFailure {
                current: None,
                forecast: Some(forecast),
                error,
            },
            (Err(current_err), Err(forecast_err)) => {
                errors.push(forecast_err);
                let error = most_specific(current_err, errors);
                warn!("Both coordinate and city queries failed: {}", error);
                machine.advance(FetchState::Failed);
                return FetchOutcome {
                    state: FetchState::Failed,
                    location: Some(location),
                    result: FetchResult::Failure(error),
                };
            }
        };

        info!("Weather fetched by city name '{}'", location.city);
        machine.advance(FetchState::Done);
        finish(FetchState::Done, location, result)
    }

    /// Fetch and parse current conditions and forecast concurrently
    async fn fetch_pair(
        &self,
        query: &WeatherQuery,
    ) -> (Result<CurrentConditions>, Result<ForecastSeries>) {
        let current = async {
            let payload = self.weather.fetch(Resource::Current, query).await?;
            parse_current(&payload)
        };
        let forecast = async {
            let payload = self.weather.fetch(Resource::Forecast, query).await?;
            let raw = parse_forecast(&payload)?;
            Ok::<_, WeatherError>(aggregate(&raw.slots, &raw.city_name))
        };
        tokio::join!(current, forecast)
    }
}

/// Show the locality-aware place name instead of the provider's station name
fn finish(state: FetchState, location: LocationResult, mut result: FetchResult) -> FetchOutcome {
    let display_name = location.display_name();
    match &mut result {
        FetchResult::Success(current, _)
        | FetchResult::PartialFailure {
            current: Some(current),
            ..
        } => current.city_name = display_name,
        _ => {}
    }
    FetchOutcome {
        state,
        location: Some(location),
        result,
    }
}

/// Pick the error users can act on: Auth > NotFound > Transport > Parse
fn most_specific(first: WeatherError, rest: Vec<WeatherError>) -> WeatherError {
    rest.into_iter()
        .fold(first, |best, e| if e.kind() > best.kind() { e } else { best })
}
