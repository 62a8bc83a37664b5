//! Conversion of raw OpenWeatherMap payloads into domain records
//!
//! Malformed payloads are reported as [`WeatherError::Parse`]; nothing in
//! here panics on bad input.

use serde::Deserialize;

use crate::Result;
use crate::error::WeatherError;
use crate::models::{
    Coordinates, CurrentConditions, DEFAULT_ICON_CODE, RawForecast, RawForecastSlot,
};

/// OpenWeatherMap `weather` response (fields we use)
#[derive(Debug, Deserialize)]
struct CurrentPayload {
    name: String,
    main: MainBlock,
    wind: WindBlock,
    #[serde(default)]
    weather: Vec<ConditionEntry>,
    coord: Option<CoordBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    #[serde(default)]
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoordBlock {
    lat: f64,
    lon: f64,
}

/// OpenWeatherMap `forecast` response (fields we use)
#[derive(Debug, Deserialize)]
struct ForecastPayload {
    city: CityBlock,
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct CityBlock {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt_txt: String,
    main: ForecastMain,
    #[serde(default)]
    weather: Vec<ConditionEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastMain {
    temp: f64,
}

/// Parse a current-weather payload
pub fn parse_current(payload: &str) -> Result<CurrentConditions> {
    let parsed: CurrentPayload = serde_json::from_str(payload)
        .map_err(|e| WeatherError::parse(format!("Invalid current weather payload: {e}")))?;

    let temperature_c = check_temperature(parsed.main.temp)?;
    let humidity_percent = parsed.main.humidity;
    if !(0.0..=100.0).contains(&humidity_percent) {
        return Err(WeatherError::parse(format!(
            "Humidity out of range: {humidity_percent}"
        )));
    }

    let first = parsed.weather.into_iter().next();
    let (description, icon_code) = match first {
        Some(entry) => (entry.description, entry.icon),
        None => (String::new(), None),
    };

    Ok(CurrentConditions {
        city_name: parsed.name,
        description,
        temperature_c,
        humidity_percent,
        wind_speed_mps: parsed.wind.speed,
        coordinates: parsed
            .coord
            .and_then(|c| Coordinates::new(c.lat, c.lon).ok()),
        icon_code: icon_code
            .filter(|icon| !icon.is_empty())
            .unwrap_or_else(|| DEFAULT_ICON_CODE.to_string()),
    })
}

/// Parse a forecast payload into the full ordered list of slots
pub fn parse_forecast(payload: &str) -> Result<RawForecast> {
    let parsed: ForecastPayload = serde_json::from_str(payload)
        .map_err(|e| WeatherError::parse(format!("Invalid forecast payload: {e}")))?;

    let slots = parsed
        .list
        .into_iter()
        .map(|entry| {
            Ok(RawForecastSlot {
                timestamp: entry.dt_txt,
                temperature_c: check_temperature(entry.main.temp)?,
                description: entry
                    .weather
                    .into_iter()
                    .next()
                    .map(|w| w.description)
                    .unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RawForecast {
        city_name: parsed.city.name,
        slots,
    })
}

fn check_temperature(temp: f64) -> Result<f64> {
    if temp.is_finite() {
        Ok(temp)
    } else {
        Err(WeatherError::parse(format!("Temperature is not finite: {temp}")))
    }
}
