//! Weather API transport for OpenWeatherMap
//!
//! Issues single GET requests for the `weather` (current) and `forecast`
//! resources, by city name or by coordinates, and classifies the HTTP
//! outcome into [`WeatherError`] kinds. Payloads are returned raw; parsing
//! lives in [`crate::parser`]. There is no retry here.

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, instrument, warn};

use crate::Result;
use crate::config::WeatherConfig;
use crate::error::{TransportFailure, WeatherError};
use crate::models::Coordinates;

const USER_AGENT: &str = concat!("Skycast/", env!("CARGO_PKG_VERSION"));

/// Remote resource to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Current,
    Forecast,
}

impl Resource {
    fn path(self) -> &'static str {
        match self {
            Resource::Current => "weather",
            Resource::Forecast => "forecast",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// How the location is expressed in a query
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    Coordinates(Coordinates),
    City(String),
}

impl fmt::Display for WeatherQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherQuery::Coordinates(coords) => write!(f, "({coords})"),
            WeatherQuery::City(city) => write!(f, "'{city}'"),
        }
    }
}

/// Source of raw weather payloads
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fail fast when the credential cannot possibly work
    fn check_credentials(&self) -> Result<()>;

    /// Fetch one raw payload
    async fn fetch(&self, resource: Resource, query: &WeatherQuery) -> Result<String>;
}

/// HTTP client for the weather provider
pub struct WeatherTransport {
    /// HTTP client
    client: Client,
    /// API configuration
    config: WeatherConfig,
}

impl WeatherTransport {
    /// Create a new weather transport
    pub fn new(config: WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn fetch_current_by_coords(&self, coordinates: Coordinates) -> Result<String> {
        self.fetch(Resource::Current, &WeatherQuery::Coordinates(coordinates))
            .await
    }

    pub async fn fetch_current_by_city(&self, city: &str) -> Result<String> {
        self.fetch(Resource::Current, &WeatherQuery::City(city.to_string()))
            .await
    }

    pub async fn fetch_forecast_by_coords(&self, coordinates: Coordinates) -> Result<String> {
        self.fetch(Resource::Forecast, &WeatherQuery::Coordinates(coordinates))
            .await
    }

    pub async fn fetch_forecast_by_city(&self, city: &str) -> Result<String> {
        self.fetch(Resource::Forecast, &WeatherQuery::City(city.to_string()))
            .await
    }

    fn build_url(&self, resource: Resource, query: &WeatherQuery, api_key: &str) -> String {
        let location = match query {
            WeatherQuery::Coordinates(coords) => format!(
                "lat={:.6}&lon={:.6}",
                coords.latitude(),
                coords.longitude()
            ),
            WeatherQuery::City(city) => format!("q={}", urlencoding::encode(city)),
        };

        format!(
            "{}/{}?{}&appid={}&units=metric&lang={}",
            self.config.base_url.trim_end_matches('/'),
            resource.path(),
            location,
            urlencoding::encode(api_key),
            urlencoding::encode(&self.config.lang)
        )
    }

    /// Make a single request and classify the response status
    #[instrument(skip(self, url), fields(url = %url.split("appid=").next().unwrap_or(url)))]
    async fn send_request(&self, url: &str) -> Result<String> {
        let request_start = Instant::now();

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("Network error after {:.3}s: {}", request_start.elapsed().as_secs_f64(), e);
            classify_send_error(&e)
        })?;

        let status = response.status();
        debug!(
            "HTTP response received: {} in {:.3}s",
            status,
            request_start.elapsed().as_secs_f64()
        );

        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => {
                error!("API authentication failed (HTTP 401)");
                return Err(WeatherError::auth(
                    "Invalid API key. Please check your OpenWeatherMap API key.",
                ));
            }
            StatusCode::NOT_FOUND => {
                warn!("Location not found (HTTP 404)");
                return Err(WeatherError::not_found(
                    "City or coordinates not found by the weather provider.",
                ));
            }
            other => {
                warn!("Unexpected HTTP status: {}", other);
                return Err(WeatherError::transport(
                    TransportFailure::Status(other.as_u16()),
                    format!(
                        "API request failed with status: {} - {}",
                        other,
                        other.canonical_reason().unwrap_or("Unknown error")
                    ),
                ));
            }
        }

        let body = response.text().await.map_err(|e| {
            warn!("Failed to read response body: {}", e);
            classify_send_error(&e)
        })?;

        info!(
            "Successful API request in {:.3}s ({} bytes)",
            request_start.elapsed().as_secs_f64(),
            body.len()
        );
        Ok(body)
    }
}

fn classify_send_error(err: &reqwest::Error) -> WeatherError {
    let kind = if err.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Network
    };
    WeatherError::transport(kind, err.to_string())
}

#[async_trait]
impl WeatherProvider for WeatherTransport {
    fn check_credentials(&self) -> Result<()> {
        self.config.validate_api_key().map(|_| ())
    }

    async fn fetch(&self, resource: Resource, query: &WeatherQuery) -> Result<String> {
        let api_key = self.config.validate_api_key()?;
        info!("Requesting {} for {}", resource, query);
        let url = self.build_url(resource, query, api_key);
        self.send_request(&url).await
    }
}
