//! Location Resolution Module
//!
//! Determines the user's approximate location from their IP address. Geo-IP
//! providers are tried in a fixed priority order; each has its own response
//! shape, which is normalized here into a [`LocationResult`]. When every
//! provider fails the configured default location is returned, so
//! resolution never fails outward.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::config::LocationConfig;
use crate::error::{TransportFailure, WeatherError};
use crate::models::{Coordinates, LocationResult, LocationSource};

const USER_AGENT: &str = concat!("Skycast/", env!("CARGO_PKG_VERSION"));

/// English city names mapped to the names shown to the user
static CITY_TRANSLATIONS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("Mexico City", "Ciudad de México"),
        ("Guadalajara", "Guadalajara"),
        ("Monterrey", "Monterrey"),
        ("Tijuana", "Tijuana"),
        ("Puebla", "Puebla"),
        ("Juarez", "Ciudad Juárez"),
        ("Ciudad Juarez", "Ciudad Juárez"),
        ("Leon", "León"),
        ("Zapopan", "Zapopan"),
        ("Nezahualcoyotl", "Nezahualcóyotl"),
        ("Chihuahua", "Chihuahua"),
        ("Naucalpan", "Naucalpan"),
        ("Merida", "Mérida"),
        ("San Luis Potosi", "San Luis Potosí"),
        ("Aguascalientes", "Aguascalientes"),
        ("Hermosillo", "Hermosillo"),
        ("Saltillo", "Saltillo"),
        ("Mexicali", "Mexicali"),
        ("Culiacan", "Culiacán"),
        ("Queretaro", "Querétaro"),
        ("Morelia", "Morelia"),
        ("Cancun", "Cancún"),
        ("Torreon", "Torreón"),
        ("Acapulco", "Acapulco"),
        ("Villahermosa", "Villahermosa"),
        ("Veracruz", "Veracruz"),
        ("Tuxtla Gutierrez", "Tuxtla Gutiérrez"),
        ("New York", "Nueva York"),
        ("London", "Londres"),
        ("Paris", "París"),
        ("Rome", "Roma"),
        ("Madrid", "Madrid"),
        ("Berlin", "Berlín"),
        ("Tokyo", "Tokio"),
        ("Beijing", "Pekín"),
        ("Moscow", "Moscú"),
    ])
});

/// Translate a provider city name; unknown names pass through unchanged
#[must_use]
pub fn translate_city_name(name: &str) -> String {
    CITY_TRANSLATIONS
        .get(name)
        .map_or_else(|| name.to_string(), |translated| (*translated).to_string())
}

/// Anything that can produce the location for a fetch cycle
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn resolve(&self) -> LocationResult;
}

/// A single geo-IP service
#[async_trait]
pub trait GeoIpProvider: Send + Sync {
    fn source(&self) -> LocationSource;

    /// Look up the caller's location; any failure means "try the next one"
    async fn lookup(&self, client: &Client) -> Result<LocationResult>;
}

/// ip-api.com: `{"status":"success","city":..,"district":..,"lat":..,"lon":..}`
pub struct IpApiCom {
    url: String,
}

#[derive(Debug, Deserialize)]
struct IpApiComResponse {
    status: Option<String>,
    message: Option<String>,
    city: Option<String>,
    district: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpApiCom {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl GeoIpProvider for IpApiCom {
    fn source(&self) -> LocationSource {
        LocationSource::IpApiCom
    }

    async fn lookup(&self, client: &Client) -> Result<LocationResult> {
        let body: IpApiComResponse = get_json(client, &self.url).await?;

        if body.status.as_deref() != Some("success") {
            return Err(WeatherError::not_found(format!(
                "ip-api.com lookup unsuccessful: {}",
                body.message.as_deref().unwrap_or("no status")
            )));
        }

        let location = normalize(body.city, body.lat, body.lon, self.source())?;
        Ok(location.with_locality(body.district))
    }
}

/// ipapi.co: `{"city":..,"latitude":..,"longitude":..}`
pub struct IpapiCo {
    url: String,
}

#[derive(Debug, Deserialize)]
struct IpapiCoResponse {
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl IpapiCo {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl GeoIpProvider for IpapiCo {
    fn source(&self) -> LocationSource {
        LocationSource::IpapiCo
    }

    async fn lookup(&self, client: &Client) -> Result<LocationResult> {
        let body: IpapiCoResponse = get_json(client, &self.url).await?;
        normalize(body.city, body.latitude, body.longitude, self.source())
    }
}

/// Check required fields and build the common result shape
fn normalize(
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    source: LocationSource,
) -> Result<LocationResult> {
    let city = city
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| WeatherError::parse(format!("{source} response has no city")))?;
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        return Err(WeatherError::parse(format!(
            "{source} response has no coordinates"
        )));
    };
    let coordinates = Coordinates::new(latitude, longitude)?;

    Ok(LocationResult::new(
        translate_city_name(&city),
        coordinates,
        source,
    ))
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(WeatherError::transport(
            TransportFailure::Status(status.as_u16()),
            format!("geo-IP lookup answered {status}"),
        ));
    }

    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Service for resolving the current location from geo-IP providers
pub struct LocationResolver {
    client: Client,
    providers: Vec<Box<dyn GeoIpProvider>>,
    default_location: LocationResult,
}

impl LocationResolver {
    /// Create a resolver with the standard provider chain
    pub fn new(config: &LocationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()?;

        let providers: Vec<Box<dyn GeoIpProvider>> = vec![
            Box::new(IpApiCom::new(config.ip_api_url.clone())),
            Box::new(IpapiCo::new(config.ipapi_co_url.clone())),
        ];

        Ok(Self::with_providers(
            client,
            providers,
            config.default_location()?,
        ))
    }

    /// Create a resolver with an explicit provider chain
    #[must_use]
    pub fn with_providers(
        client: Client,
        providers: Vec<Box<dyn GeoIpProvider>>,
        default_location: LocationResult,
    ) -> Self {
        Self {
            client,
            providers,
            default_location,
        }
    }

    /// Resolve the current location, falling back to the default
    #[instrument(skip(self))]
    pub async fn resolve_location(&self) -> LocationResult {
        for provider in &self.providers {
            let source = provider.source();
            debug!("Trying geo-IP provider {}", source);

            match provider.lookup(&self.client).await {
                Ok(location) => {
                    info!(
                        "Resolved location: {} at ({}) via {}",
                        location.display_name(),
                        location.coordinates,
                        source
                    );
                    return location;
                }
                Err(e) => {
                    warn!("Geo-IP provider {} failed: {}", source, e);
                }
            }
        }

        info!(
            "All geo-IP providers failed, using default location: {}",
            self.default_location.city
        );
        self.default_location.clone()
    }
}

#[async_trait]
impl LocationProvider for LocationResolver {
    async fn resolve(&self) -> LocationResult {
        self.resolve_location().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LocationConfig {
        LocationConfig {
            ip_api_url: format!("{}/ip-api", server.uri()),
            ipapi_co_url: format!("{}/ipapi-co", server.uri()),
            timeout_seconds: 1,
            ..LocationConfig::default()
        }
    }

    #[rstest]
    #[case("Mexico City", "Ciudad de México")]
    #[case("Ciudad Juarez", "Ciudad Juárez")]
    #[case("Juarez", "Ciudad Juárez")]
    #[case("London", "Londres")]
    #[case("Moscow", "Moscú")]
    #[case("Springfield", "Springfield")]
    fn test_translate_city_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(translate_city_name(input), expected);
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip-api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "country": "Mexico",
                "city": "Mexico City",
                "district": "Del Valle",
                "lat": 19.38,
                "lon": -99.16
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ipapi-co"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let resolver = LocationResolver::new(&config_for(&server)).unwrap();
        let location = resolver.resolve().await;

        assert_eq!(location.source, LocationSource::IpApiCom);
        assert_eq!(location.city, "Ciudad de México");
        assert_eq!(location.locality.as_deref(), Some("Del Valle"));
        assert_eq!(location.coordinates.latitude(), 19.38);
        assert_eq!(location.coordinates.longitude(), -99.16);
    }

    #[tokio::test]
    async fn test_falls_back_to_second_provider_on_unsuccessful_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip-api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "fail",
                "message": "reserved range"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ipapi-co"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "city": "Berlin",
                "latitude": 52.52,
                "longitude": 13.405
            })))
            .mount(&server)
            .await;

        let resolver = LocationResolver::new(&config_for(&server)).unwrap();
        let location = resolver.resolve().await;

        assert_eq!(location.source, LocationSource::IpapiCo);
        assert_eq!(location.city, "Berlín");
        assert_eq!(location.locality, None);
    }

    #[tokio::test]
    async fn test_missing_fields_count_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip-api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "city": "Madrid"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ipapi-co"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 40.4,
                "longitude": -3.7
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = LocationResolver::new(&config_for(&server)).unwrap();
        let location = resolver.resolve().await;

        assert_eq!(location.source, LocationSource::Default);
    }

    #[tokio::test]
    async fn test_all_providers_failing_returns_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip-api"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ipapi-co"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = LocationResolver::new(&config_for(&server)).unwrap();
        let location = resolver.resolve().await;

        assert_eq!(location.city, "Ciudad de México");
        assert_eq!(location.coordinates.latitude(), 19.4326);
        assert_eq!(location.coordinates.longitude(), -99.1332);
        assert_eq!(location.source, LocationSource::Default);
        assert_eq!(location.locality, None);
    }

    #[tokio::test]
    async fn test_slow_provider_is_abandoned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip-api"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "status": "success",
                        "city": "Madrid",
                        "lat": 40.4,
                        "lon": -3.7
                    }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ipapi-co"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "city": "Rome",
                "latitude": 41.9,
                "longitude": 12.5
            })))
            .mount(&server)
            .await;

        let resolver = LocationResolver::new(&config_for(&server)).unwrap();
        let location = resolver.resolve().await;

        assert_eq!(location.source, LocationSource::IpapiCo);
        assert_eq!(location.city, "Roma");
    }

    #[tokio::test]
    async fn test_unreachable_providers_return_default() {
        let config = LocationConfig {
            ip_api_url: "http://127.0.0.1:9/json".to_string(),
            ipapi_co_url: "http://127.0.0.1:9/json/".to_string(),
            timeout_seconds: 1,
            ..LocationConfig::default()
        };
        let resolver = LocationResolver::new(&config).unwrap();
        let location = resolver.resolve().await;
        assert_eq!(location.source, LocationSource::Default);
    }
}
