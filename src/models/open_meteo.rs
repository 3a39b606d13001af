use crate::error::{ProcessingError, Result};
use crate::utils::time::from_unix_seconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use validator::Validate;

/// Geocoded city, as cached in `geocode_cache.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GeoLocation {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    pub name: String,

    #[serde(default)]
    pub country: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub results: Option<Vec<GeoLocation>>,
}

/// Column block of an API response (`hourly` or `daily`).
///
/// Requested with `timeformat=unixtime`, so `time` is seconds since the epoch.
#[derive(Debug, Deserialize)]
pub struct ApiBlock {
    pub time: Vec<i64>,

    #[serde(flatten)]
    pub columns: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub hourly: Option<ApiBlock>,

    #[serde(default)]
    pub daily: Option<ApiBlock>,
}

/// Hourly table for one city: a time column plus one column per variable.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    pub city: String,
    pub variables: Vec<String>,
    pub times: Vec<DateTime<Utc>>,
    /// `values[v][i]` is variable `v` at `times[i]`
    pub values: Vec<Vec<Option<f64>>>,
}

impl HourlySeries {
    pub fn empty(city: &str, variables: &[String]) -> Self {
        Self {
            city: city.to_string(),
            variables: variables.to_vec(),
            times: Vec::new(),
            values: vec![Vec::new(); variables.len()],
        }
    }

    pub fn from_block(city: &str, variables: &[String], block: &ApiBlock) -> Result<Self> {
        let times = block
            .time
            .iter()
            .map(|secs| from_unix_seconds(*secs))
            .collect::<Result<Vec<_>>>()?;

        let mut values = Vec::with_capacity(variables.len());
        for variable in variables {
            let column = block
                .columns
                .get(variable)
                .and_then(Value::as_array)
                .ok_or_else(|| ProcessingError::MissingColumn(variable.clone()))?;

            if column.len() != times.len() {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Column '{}' has {} values for {} timestamps",
                    variable,
                    column.len(),
                    times.len()
                )));
            }
            values.push(column.iter().map(Value::as_f64).collect());
        }

        Ok(Self {
            city: city.to_string(),
            variables: variables.to_vec(),
            times,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn extend(&mut self, other: HourlySeries) {
        self.times.extend(other.times);
        for (column, more) in self.values.iter_mut().zip(other.values) {
            column.extend(more);
        }
    }

    pub fn max_time(&self) -> Option<DateTime<Utc>> {
        self.times.iter().max().copied()
    }

    /// Rows at or after `cutoff`.
    pub fn since(&self, cutoff: DateTime<Utc>) -> Self {
        let keep: Vec<usize> = (0..self.len()).filter(|&i| self.times[i] >= cutoff).collect();
        Self {
            city: self.city.clone(),
            variables: self.variables.clone(),
            times: keep.iter().map(|&i| self.times[i]).collect(),
            values: self
                .values
                .iter()
                .map(|column| keep.iter().map(|&i| column[i]).collect())
                .collect(),
        }
    }

    /// One JSON object per row with `time`, `city` and each variable.
    pub fn to_json_rows(&self) -> Vec<Value> {
        (0..self.len())
            .map(|i| {
                let mut row = Map::new();
                row.insert("time".to_string(), Value::String(self.times[i].to_rfc3339()));
                for (variable, column) in self.variables.iter().zip(&self.values) {
                    row.insert(variable.clone(), number_or_null(column[i]));
                }
                row.insert("city".to_string(), Value::String(self.city.clone()));
                Value::Object(row)
            })
            .collect()
    }
}

/// Daily forecast table. Kept as raw JSON values because `sunrise` and
/// `sunset` are timestamps rather than measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    pub city: String,
    pub times: Vec<DateTime<Utc>>,
    pub columns: Vec<(String, Vec<Value>)>,
}

impl DailySeries {
    pub fn from_block(city: &str, variables: &[String], block: &ApiBlock) -> Result<Self> {
        let times = block
            .time
            .iter()
            .map(|secs| from_unix_seconds(*secs))
            .collect::<Result<Vec<_>>>()?;

        let columns = variables
            .iter()
            .map(|variable| {
                let values = block
                    .columns
                    .get(variable)
                    .and_then(Value::as_array)
                    .cloned()
                    .ok_or_else(|| ProcessingError::MissingColumn(variable.clone()))?;
                Ok((variable.clone(), values))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            city: city.to_string(),
            times,
            columns,
        })
    }

    pub fn to_json_rows(&self) -> Vec<Value> {
        (0..self.times.len())
            .map(|i| {
                let mut row = Map::new();
                row.insert("time".to_string(), Value::String(self.times[i].to_rfc3339()));
                for (name, values) in &self.columns {
                    row.insert(name.clone(), values.get(i).cloned().unwrap_or(Value::Null));
                }
                row.insert("city".to_string(), Value::String(self.city.clone()));
                Value::Object(row)
            })
            .collect()
    }
}

fn number_or_null(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
