use crate::error::Result;
use crate::models::{without_sentinel, LegacyObservation, Observation};
use crate::utils::constants::MISSING_WIND;
use crate::utils::text::format_number;
use regex::Regex;
use tracing::debug;

/// Converts AXF observations to the column layout of the old accessible
/// observations table.
pub struct LegacyConverter {
    time_pattern: Regex,
}

impl LegacyConverter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            time_pattern: Regex::new(r"\d+/(\d+:\d+)(am|pm)")?,
        })
    }

    /// Rows without a readable time or date are dropped.
    pub fn convert(&self, observations: &[Observation]) -> Vec<LegacyObservation> {
        let rows: Vec<LegacyObservation> = observations
            .iter()
            .filter_map(|obs| self.convert_one(obs))
            .collect();

        if rows.len() < observations.len() {
            debug!(
                dropped = observations.len() - rows.len(),
                "Dropped observations without a time"
            );
        }
        rows
    }

    fn convert_one(&self, obs: &Observation) -> Option<LegacyObservation> {
        let time = self.clock_time(obs.local_date_time.as_deref()?)?;
        let date = obs.date()?.format("%Y-%m-%d").to_string();

        Some(LegacyObservation {
            time,
            temp: obs.air_temp,
            feels_like: obs.apparent_temp,
            humidity: obs.rel_humidity,
            wind_direction: obs.wind_dir.clone(),
            wind_speed: wind_pair(obs.wind_spd_kmh, obs.wind_spd_kt),
            wind_gust: wind_pair(obs.gust_kmh, obs.gust_kt),
            pressure: obs.press_qnh,
            rain_since_9am: obs.rain_trace,
            date,
        })
    }

    /// `25/09:30am` → `09:30 am`
    pub fn clock_time(&self, local_date_time: &str) -> Option<String> {
        let caps = self.time_pattern.captures(local_date_time)?;
        Some(format!("{} {}", &caps[1], &caps[2]))
    }
}

/// `"<km/h> <knots>"`, each side `–` when not observed.
fn wind_pair(kmh: Option<f64>, knots: Option<f64>) -> String {
    let part = |value: Option<f64>| {
        without_sentinel(value)
            .map(format_number)
            .unwrap_or_else(|| MISSING_WIND.to_string())
    };
    format!("{} {}", part(kmh), part(knots))
}
