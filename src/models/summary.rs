use serde::{Deserialize, Serialize};

/// Daily row of `observations.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Temp")]
    pub temp: Option<f64>,

    /// Rainfall since midnight
    #[serde(rename = "Rain")]
    pub rain: Option<f64>,

    #[serde(rename = "Wind")]
    pub wind: Option<f64>,

    #[serde(rename = "Humidity")]
    pub humidity: Option<f64>,
}

impl DailySummary {
    pub fn is_empty(&self) -> bool {
        self.temp.is_none() && self.rain.is_none() && self.wind.is_none() && self.humidity.is_none()
    }
}

/// Hourly row of `last30.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyReading {
    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Hour")]
    pub hour: u32,

    #[serde(rename = "Temp")]
    pub temp: Option<f64>,

    #[serde(rename = "Rain")]
    pub rain: Option<f64>,

    #[serde(rename = "Wind")]
    pub wind: Option<f64>,

    #[serde(rename = "Humidity")]
    pub humidity: Option<f64>,
}

/// Daily value from a BOM zipped history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyValue {
    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Value")]
    pub value: Option<f64>,
}

/// Contents of `last_updated.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastUpdated {
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}
