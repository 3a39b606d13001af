use crate::error::Result;
use crate::models::{without_sentinel, HourlyReading};
use crate::storage::columns::{f64_column, has_column, string_column};
use crate::utils::constants::{LAST30_WINDOW_DAYS, OBS_KEY_COLUMN};
use crate::utils::time::parse_compact_timestamp;
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDateTime, Timelike};
use std::collections::BTreeMap;

fn optional_f64(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    if has_column(batch, name) {
        f64_column(batch, name)
    } else {
        Ok(vec![None; batch.num_rows()])
    }
}

/// Hourly readings of the last 30 days for `last30.json`.
///
/// `now` is wall-clock time in the station's zone. When several readings
/// fall in one hour the last one in the batch wins.
pub fn last_30_days(batch: &RecordBatch, now: NaiveDateTime) -> Result<Vec<HourlyReading>> {
    let cutoff = now - Duration::days(LAST30_WINDOW_DAYS);

    let stamps = string_column(batch, OBS_KEY_COLUMN)?;
    let temps = optional_f64(batch, "air_temp")?;
    let rain = optional_f64(batch, "rain_trace[80]")?;
    let wind = optional_f64(batch, "wind_spd_kmh")?;
    let humidity = optional_f64(batch, "rel_hum")?;

    let mut hours: BTreeMap<(String, u32), HourlyReading> = BTreeMap::new();
    for (row, stamp) in stamps.iter().enumerate() {
        let Some(ts) = stamp.as_deref().and_then(parse_compact_timestamp) else {
            continue;
        };
        if ts < cutoff {
            continue;
        }

        let date = ts.format("%Y-%m-%d").to_string();
        let hour = ts.hour();
        hours.insert(
            (date.clone(), hour),
            HourlyReading {
                date,
                hour,
                temp: without_sentinel(temps[row]),
                rain: without_sentinel(rain[row]),
                wind: without_sentinel(wind[row]),
                humidity: without_sentinel(humidity[row]),
            },
        );
    }

    Ok(hours.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn batch(rows: &[(&str, f64)]) -> RecordBatch {
        RecordBatch::try_new(
            Arc::new(Schema::new(vec![
                Field::new(OBS_KEY_COLUMN, DataType::Utf8, true),
                Field::new("air_temp", DataType::Float64, true),
                Field::new("wind_spd_kmh", DataType::Float64, true),
            ])),
            vec![
                Arc::new(StringArray::from(
                    rows.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
                )),
                Arc::new(Float64Array::from(
                    rows.iter().map(|(_, t)| *t).collect::<Vec<_>>(),
                )),
                Arc::new(Float64Array::from(vec![-9999.0; rows.len()])),
            ],
        )
        .unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 25)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_window_and_hour_dedup() -> Result<()> {
        let readings = last_30_days(
            &batch(&[
                ("20250901000000", 9.0),
                ("20251025093000", 14.0),
                ("20251025090000", 13.0),
                ("20251024230000", 11.0),
            ]),
            now(),
        )?;

        assert_eq!(
            readings,
            vec![
                HourlyReading {
                    date: "2025-10-24".to_string(),
                    hour: 23,
                    temp: Some(11.0),
                    rain: None,
                    wind: None,
                    humidity: None,
                },
                HourlyReading {
                    date: "2025-10-25".to_string(),
                    hour: 9,
                    temp: Some(13.0),
                    rain: None,
                    wind: None,
                    humidity: None,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_empty_batch() -> Result<()> {
        assert!(last_30_days(&batch(&[]), now())?.is_empty());
        Ok(())
    }
}
