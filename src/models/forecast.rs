use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `forecast-period` of a BOM précis forecast for an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub index: String,

    /// Local date of the period start, `YYYY-MM-DD`
    pub date: Option<String>,

    /// Element and text values keyed by their `type` attribute.
    /// Elements with units carry them: `"22 Celsius"`.
    pub fields: BTreeMap<String, String>,
}

impl ForecastPeriod {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Daily summary row of `forecasts.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Max_temp")]
    pub max_temp: Option<f64>,

    #[serde(rename = "Rain")]
    pub rain: Option<f64>,
}
