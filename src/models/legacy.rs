use serde::{Deserialize, Serialize};

/// Observation row in the column layout of the original accessible
/// observations page, which the per-city CSV dumps still use. Numeric
/// readings keep BOM's `-9999` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyObservation {
    /// `09:30 am`
    #[serde(rename = "Time (AEDT)")]
    pub time: String,

    #[serde(rename = "Temp (°C)")]
    pub temp: Option<f64>,

    #[serde(rename = "Feels Like (°C)")]
    pub feels_like: Option<f64>,

    #[serde(rename = "Humidity(%)")]
    pub humidity: Option<f64>,

    #[serde(rename = "Wind Direction")]
    pub wind_direction: Option<String>,

    /// `<kmh> <knots>`, `–` where missing
    #[serde(rename = "Wind Speed (km/h) (knots)")]
    pub wind_speed: String,

    #[serde(rename = "Wind Gust (km/h) (knots)")]
    pub wind_gust: String,

    #[serde(rename = "Pressure (hPa)")]
    pub pressure: Option<f64>,

    #[serde(rename = "Rainfall since 9 am (mm)")]
    pub rain_since_9am: Option<f64>,

    /// `YYYY-MM-DD`
    #[serde(rename = "Date")]
    pub date: String,
}

impl LegacyObservation {
    /// Leading km/h figure of the wind speed column.
    pub fn wind_speed_kmh(&self) -> Option<f64> {
        let digits: String = self
            .wind_speed
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<f64>().ok()
    }
}
