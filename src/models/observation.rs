use crate::utils::constants::MISSING_SENTINEL;
use crate::utils::time::parse_compact_timestamp;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// One row of a BOM AXF observation product.
///
/// Only the columns the summaries use are typed here. The full row,
/// including cloud, swell and visibility columns, is archived from the raw
/// table (see `AxfDocument::to_record_batch`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "name[80]", default)]
    pub station_name: Option<String>,

    /// `25/09:30am`
    #[serde(rename = "local_date_time[80]", default)]
    pub local_date_time: Option<String>,

    /// `20251025093000`
    #[serde(rename = "local_date_time_full[80]", default)]
    pub local_date_time_full: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub air_temp: Option<f64>,

    #[serde(rename = "apparent_t", default, deserialize_with = "lenient_f64")]
    pub apparent_temp: Option<f64>,

    #[serde(rename = "rel_hum", default, deserialize_with = "lenient_f64")]
    pub rel_humidity: Option<f64>,

    #[serde(rename = "wind_dir[80]", default)]
    pub wind_dir: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub wind_spd_kmh: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub wind_spd_kt: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub gust_kmh: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub gust_kt: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub press_qnh: Option<f64>,

    /// Rainfall since 9am. BOM reports this as text; `-` and `Trace` read as missing.
    #[serde(rename = "rain_trace[80]", default, deserialize_with = "lenient_f64")]
    pub rain_trace: Option<f64>,
}

impl Observation {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.local_date_time_full
            .as_deref()
            .and_then(parse_compact_timestamp)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.timestamp().map(|ts| ts.date())
    }
}

/// Drop the `-9999` placeholder BOM uses for readings that were not taken.
pub fn without_sentinel(value: Option<f64>) -> Option<f64> {
    value.filter(|v| (*v - MISSING_SENTINEL).abs() > f64::EPSILON)
}

/// Parse a number, treating blanks and placeholders (`-`, `Trace`) as missing.
pub fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| parse_lenient(&s)))
}

pub fn parse_lenient(value: &str) -> Option<f64> {
    let trimmed = value.trim().trim_matches('"');
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_lenient("19.2"), Some(19.2));
        assert_eq!(parse_lenient(" -9999.0 "), Some(-9999.0));
        assert_eq!(parse_lenient("-"), None);
        assert_eq!(parse_lenient("Trace"), None);
        assert_eq!(parse_lenient(""), None);
        assert_eq!(parse_lenient("NaN"), None);
    }

    #[test]
    fn test_without_sentinel() {
        assert_eq!(without_sentinel(Some(-9999.0)), None);
        assert_eq!(without_sentinel(Some(0.0)), Some(0.0));
        assert_eq!(without_sentinel(None), None);
    }

    #[test]
    fn test_observation_date() {
        let obs = Observation {
            station_name: None,
            local_date_time: Some("25/09:30am".to_string()),
            local_date_time_full: Some("20251025093000".to_string()),
            air_temp: Some(14.1),
            apparent_temp: None,
            rel_humidity: None,
            wind_dir: None,
            wind_spd_kmh: None,
            wind_spd_kt: None,
            gust_kmh: None,
            gust_kt: None,
            press_qnh: None,
            rain_trace: None,
        };
        assert_eq!(obs.date(), NaiveDate::from_ymd_opt(2025, 10, 25));
    }
}
