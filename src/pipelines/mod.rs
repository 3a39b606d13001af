//! End-to-end jobs. Each one fetches, parses, stores and summarises; the
//! offline half of every job takes already-fetched text so it can be driven
//! from fixtures.

pub mod bom_forecasts;
pub mod bom_observations;
pub mod combine;
pub mod history;
pub mod open_meteo;

pub use bom_forecasts::ForecastPipeline;
pub use bom_observations::{ObservationOutcome, ObservationPipeline};
pub use combine::combine_cities;
pub use history::HistoryPipeline;
pub use open_meteo::OpenMeteoPipeline;

use crate::error::Result;
use crate::settings::Settings;
use crate::writers::ParquetWriter;
use std::time::Duration;
use tracing::warn;

/// Per-city results of a job. A failing city does not stop the others.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl RunReport {
    pub fn record<T>(&mut self, name: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.succeeded.push(name.to_string());
                Some(value)
            }
            Err(e) => {
                warn!(city = name, error = %e, "Job failed, continuing with the rest");
                self.failed.push((name.to_string(), e.to_string()));
                None
            }
        }
    }

    pub fn merge(&mut self, other: RunReport) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} succeeded, {} failed",
            self.succeeded.len(),
            self.failed.len()
        );
        for (name, error) in &self.failed {
            text.push_str(&format!("\n  - {}: {}", name, error));
        }
        text
    }
}

/// True when no filter is given or the names match, ignoring case.
pub fn city_selected(filter: Option<&str>, city: &str) -> bool {
    filter.map_or(true, |f| f.eq_ignore_ascii_case(city))
}

pub(crate) async fn pause(secs: f64) {
    if secs > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}

pub(crate) fn partition_writer(settings: &Settings) -> Result<ParquetWriter> {
    ParquetWriter::new().with_compression(&settings.compression)
}
