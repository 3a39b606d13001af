use crate::error::Result;
use crate::settings::CombinerSettings;
use crate::storage::columns::{f64_column, has_column, string_column, timestamp_column};
use crate::utils::constants::{CITY_COLUMN, TIME_COLUMN};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Where a row came from. Observations sort first and win ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    Observation,
    Forecast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub time: DateTime<Utc>,
    pub source: Source,
    pub values: BTreeMap<String, Option<f64>>,
}

/// Builds the per-city dashboard series from archived observations and the
/// latest hourly forecast.
pub struct Combiner {
    variables: Vec<String>,
    forecast_only_variables: Vec<String>,
    today_only_variables: Vec<String>,
}

impl Combiner {
    pub fn new(settings: &CombinerSettings) -> Self {
        Self {
            variables: settings.variables.clone(),
            forecast_only_variables: settings.forecast_only_variables.clone(),
            today_only_variables: settings.today_only_variables.clone(),
        }
    }

    fn output_variables(&self) -> impl Iterator<Item = &String> {
        self.variables.iter().chain(self.forecast_only_variables.iter())
    }

    /// Archive rows for one city.
    pub fn observation_rows(&self, batch: &RecordBatch, city: &str) -> Result<Vec<SourceRow>> {
        let cities = string_column(batch, CITY_COLUMN)?;
        let times = timestamp_column(batch, TIME_COLUMN)?;

        let mut columns = Vec::new();
        for variable in self.output_variables() {
            if has_column(batch, variable) {
                columns.push((variable.clone(), f64_column(batch, variable)?));
            }
        }

        Ok((0..batch.num_rows())
            .filter(|&row| cities[row].as_deref() == Some(city))
            .filter_map(|row| {
                Some(SourceRow {
                    time: times[row]?,
                    source: Source::Observation,
                    values: columns
                        .iter()
                        .map(|(name, values)| (name.clone(), values[row]))
                        .collect(),
                })
            })
            .collect())
    }

    /// Hourly records from a city's forecast JSON.
    pub fn forecast_rows(&self, hourly: &[Value]) -> Vec<SourceRow> {
        hourly
            .iter()
            .filter_map(|record| {
                let time = DateTime::parse_from_rfc3339(record.get(TIME_COLUMN)?.as_str()?)
                    .ok()?
                    .with_timezone(&Utc);
                let values = self
                    .output_variables()
                    .filter_map(|variable| {
                        let value = record.get(variable.as_str())?;
                        Some((variable.clone(), value.as_f64()))
                    })
                    .collect();
                Some(SourceRow {
                    time,
                    source: Source::Forecast,
                    values,
                })
            })
            .collect()
    }

    /// The dashboard document for one city, or `None` without any data.
    ///
    /// Where an observation and a forecast share a timestamp the observation
    /// is kept. Hourly averages use observations only.
    pub fn combine(
        &self,
        observations: &[SourceRow],
        forecast: &[SourceRow],
        now: DateTime<Tz>,
    ) -> Option<Map<String, Value>> {
        if observations.is_empty() && forecast.is_empty() {
            return None;
        }
        let tz = now.timezone();
        let today = now.date_naive();

        let mut combined: Vec<&SourceRow> = observations.iter().chain(forecast.iter()).collect();
        combined.sort_by_key(|row| (row.time, row.source));
        combined.dedup_by_key(|row| row.time);

        let mut output = Map::new();
        for variable in self.output_variables() {
            if !combined.iter().any(|row| row.values.contains_key(variable)) {
                continue;
            }
            let today_only = self.today_only_variables.contains(variable);

            let series: Vec<Value> = combined
                .iter()
                .filter_map(|row| {
                    let value = (*row.values.get(variable)?)?;
                    let local = row.time.with_timezone(&tz);
                    if today_only && local.date_naive() != today {
                        return None;
                    }
                    Some(json!({ "time": local.to_rfc3339(), "value": round1(value) }))
                })
                .collect();
            output.insert(variable.clone(), Value::Array(series));
        }

        for variable in &self.variables {
            if !observations.iter().any(|row| row.values.contains_key(variable)) {
                continue;
            }
            output.insert(
                format!("{}_avg", variable),
                Value::Array(hourly_means(observations, variable, tz)),
            );
        }

        Some(output)
    }
}

/// Mean of a variable per local hour of day, skipping hours with no values.
fn hourly_means(rows: &[SourceRow], variable: &str, tz: Tz) -> Vec<Value> {
    let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for row in rows {
        if let Some(Some(value)) = row.values.get(variable) {
            let hour = row.time.with_timezone(&tz).hour();
            let entry = sums.entry(hour).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(hour, (sum, count))| json!({ "hour": hour, "value": round1(sum / count as f64) }))
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HourlySeries;
    use crate::utils::time::from_unix_seconds;
    use crate::writers::hourly_series_to_batch;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    // 2025-10-25T00:00:00Z is 11:00 in Melbourne
    const MIDNIGHT_UTC: i64 = 1_761_350_400;

    fn combiner() -> Combiner {
        Combiner::new(&CombinerSettings {
            cities: vec!["Melbourne".to_string()],
            variables: vec!["temperature_2m".to_string(), "cloud_cover".to_string()],
            forecast_only_variables: vec!["precipitation_probability".to_string()],
            today_only_variables: vec!["cloud_cover".to_string()],
            output_dir: "cities".into(),
        })
    }

    fn melbourne_now() -> DateTime<Tz> {
        chrono_tz::Australia::Melbourne
            .timestamp_opt(MIDNIGHT_UTC + 3 * 3600, 0)
            .unwrap()
    }

    fn archive() -> RecordBatch {
        let series = HourlySeries {
            city: "Melbourne".to_string(),
            variables: vec!["temperature_2m".to_string(), "cloud_cover".to_string()],
            times: vec![
                from_unix_seconds(MIDNIGHT_UTC - 86_400).unwrap(),
                from_unix_seconds(MIDNIGHT_UTC).unwrap(),
                from_unix_seconds(MIDNIGHT_UTC + 3600).unwrap(),
            ],
            values: vec![
                vec![Some(10.0), Some(14.26), None],
                vec![Some(80.0), Some(20.0), Some(40.0)],
            ],
        };
        hourly_series_to_batch(&series).unwrap()
    }

    fn forecast_json() -> Vec<Value> {
        vec![
            json!({"time": "2025-10-25T01:00:00+00:00", "temperature_2m": 99.0, "precipitation_probability": 10, "city": "Melbourne"}),
            json!({"time": "2025-10-25T02:00:00+00:00", "temperature_2m": 16.0, "precipitation_probability": 30, "city": "Melbourne"}),
        ]
    }

    #[test]
    fn test_observation_rows_filter_city() -> Result<()> {
        let rows = combiner().observation_rows(&archive(), "Melbourne")?;
        assert_eq!(rows.len(), 3);
        assert!(combiner().observation_rows(&archive(), "Sydney")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_combine_prefers_observations() -> Result<()> {
        let combiner = combiner();
        let obs = combiner.observation_rows(&archive(), "Melbourne")?;
        let forecast = combiner.forecast_rows(&forecast_json());

        let output = combiner.combine(&obs, &forecast, melbourne_now()).unwrap();

        // 01:00Z exists in both; the observation (null) wins over the forecast 99
        assert_eq!(
            output["temperature_2m"],
            json!([
                {"time": "2025-10-24T11:00:00+11:00", "value": 10.0},
                {"time": "2025-10-25T11:00:00+11:00", "value": 14.3},
                {"time": "2025-10-25T13:00:00+11:00", "value": 16.0},
            ])
        );
        assert_eq!(
            output["precipitation_probability"],
            json!([{"time": "2025-10-25T13:00:00+11:00", "value": 30.0}])
        );
        Ok(())
    }

    #[test]
    fn test_today_only_and_hourly_average() -> Result<()> {
        let combiner = combiner();
        let obs = combiner.observation_rows(&archive(), "Melbourne")?;
        let output = combiner.combine(&obs, &[], melbourne_now()).unwrap();

        assert_eq!(
            output["cloud_cover"],
            json!([
                {"time": "2025-10-25T11:00:00+11:00", "value": 20.0},
                {"time": "2025-10-25T12:00:00+11:00", "value": 40.0},
            ])
        );
        assert_eq!(
            output["cloud_cover_avg"],
            json!([{"hour": 11, "value": 50.0}, {"hour": 12, "value": 40.0}])
        );
        assert_eq!(output["temperature_2m_avg"], json!([{"hour": 11, "value": 12.1}]));
        assert!(!output.contains_key("precipitation_probability"));
        Ok(())
    }

    #[test]
    fn test_no_data() {
        assert!(combiner().combine(&[], &[], melbourne_now()).is_none());
    }
}
