//! Selection and formatting of the forecast window shown to the user

use chrono::NaiveDateTime;
use tracing::warn;

use crate::models::{ForecastSeries, ForecastSlot, MAX_FORECAST_SLOTS, RawForecastSlot};

/// Timestamp format used by the provider's `dt_txt` field
pub const SOURCE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Short label format, e.g. "Mon, 06 Jan"
pub const LABEL_FORMAT: &str = "%a, %d %b";

/// Keep the earliest slots, in the order the provider sent them.
///
/// The window is taken before formatting, so a slot with an unreadable
/// timestamp shrinks the series rather than pulling in a later one.
#[must_use]
pub fn aggregate(raw_slots: &[RawForecastSlot], city_name: &str) -> ForecastSeries {
    let slots = raw_slots
        .iter()
        .take(MAX_FORECAST_SLOTS)
        .filter_map(|raw| {
            match NaiveDateTime::parse_from_str(&raw.timestamp, SOURCE_TIMESTAMP_FORMAT) {
                Ok(timestamp) => Some(ForecastSlot {
                    label: timestamp.format(LABEL_FORMAT).to_string(),
                    timestamp,
                    temperature_c: raw.temperature_c,
                    description: raw.description.clone(),
                }),
                Err(e) => {
                    warn!("Dropping forecast slot with bad timestamp '{}': {}", raw.timestamp, e);
                    None
                }
            }
        })
        .collect();

    ForecastSeries {
        city_name: city_name.to_string(),
        slots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(timestamp: &str, temperature_c: f64) -> RawForecastSlot {
        RawForecastSlot {
            timestamp: timestamp.to_string(),
            temperature_c,
            description: format!("slot at {timestamp}"),
        }
    }

    #[test]
    fn test_never_more_than_three_slots() {
        for len in 0..8 {
            let raw: Vec<_> = (0..len)
                .map(|i| slot(&format!("2025-01-06 {:02}:00:00", i * 3), f64::from(i)))
                .collect();
            let series = aggregate(&raw, "Madrid");
            assert_eq!(series.len(), len.min(3) as usize);
            assert_eq!(series.city_name, "Madrid");
        }
    }

    #[test]
    fn test_preserves_input_order_without_sorting() {
        let raw = vec![
            slot("2025-01-07 09:00:00", 1.0),
            slot("2025-01-06 09:00:00", 2.0),
            slot("2025-01-08 09:00:00", 3.0),
            slot("2025-01-05 09:00:00", 4.0),
        ];
        let series = aggregate(&raw, "Madrid");
        let temps: Vec<f64> = series.slots.iter().map(|s| s.temperature_c).collect();
        assert_eq!(temps, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_label_format() {
        let series = aggregate(&[slot("2025-01-06 12:00:00", 10.0)], "Madrid");
        assert_eq!(series.slots[0].label, "Mon, 06 Jan");
        assert_eq!(series.slots[0].description, "slot at 2025-01-06 12:00:00");
    }

    #[test]
    fn test_malformed_timestamp_drops_only_that_slot() {
        let raw = vec![
            slot("2025-01-06 12:00:00", 1.0),
            slot("06/01/2025 15:00", 2.0),
            slot("2025-01-06 18:00:00", 3.0),
            slot("2025-01-06 21:00:00", 4.0),
        ];
        let series = aggregate(&raw, "Madrid");
        let temps: Vec<f64> = series.slots.iter().map(|s| s.temperature_c).collect();
        assert_eq!(temps, vec![1.0, 3.0]);
    }

    #[test]
    fn test_empty_input() {
        let series = aggregate(&[], "Madrid");
        assert!(series.is_empty());
    }
}
