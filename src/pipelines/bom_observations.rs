use crate::client::BomClient;
use crate::error::Result;
use crate::models::LastUpdated;
use crate::pipelines::{city_selected, partition_writer, pause, RunReport};
use crate::processors::{last_30_days, summarize_days, LegacyConverter};
use crate::readers::AxfDocument;
use crate::settings::{Settings, StationFeed};
use crate::storage::{PartitionBy, PartitionStore, PartitionSummary};
use crate::utils::constants::{LAST30_JSON, LAST_UPDATED_JSON, OBSERVATIONS_JSON, OBS_KEY_COLUMN};
use crate::utils::filename::raw_snapshot_path;
use crate::utils::progress::ProgressReporter;
use crate::utils::time::{now_in, parse_timezone};
use crate::writers::csv_writer::write_records;
use crate::writers::{write_json, ParquetWriter};
use chrono::DateTime;
use chrono_tz::Tz;
use std::path::PathBuf;
use tracing::{info, warn};

/// What one station's ingest produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ObservationOutcome {
    pub partitions: Vec<PartitionSummary>,
    pub legacy_rows: usize,
    pub legacy_csv: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
    pub summaries_written: bool,
}

/// Fetches every station's AXF feed into monthly partitions, legacy CSVs
/// and, for the featured city, the dashboard summaries.
pub struct ObservationPipeline<'a> {
    settings: &'a Settings,
    converter: LegacyConverter,
    writer: ParquetWriter,
    scrape_tz: Tz,
    display_tz: Tz,
    silent: bool,
}

impl<'a> ObservationPipeline<'a> {
    pub fn new(settings: &'a Settings) -> Result<Self> {
        Ok(Self {
            settings,
            converter: LegacyConverter::new()?,
            writer: partition_writer(settings)?,
            scrape_tz: parse_timezone(&settings.scrape_timezone)?,
            display_tz: parse_timezone(&settings.display_timezone)?,
            silent: false,
        })
    }

    /// Hide the progress bar.
    pub fn silent(self, silent: bool) -> Self {
        Self { silent, ..self }
    }

    pub async fn run(&self, client: &BomClient, city: Option<&str>) -> Result<RunReport> {
        let feeds: Vec<&StationFeed> = self
            .settings
            .stations
            .iter()
            .filter(|feed| city_selected(city, &feed.city))
            .collect();
        if feeds.is_empty() {
            warn!(city = ?city, "No configured station matches");
        }

        let progress = ProgressReporter::new(feeds.len() as u64, "Fetching observations", self.silent);
        let mut report = RunReport::default();
        for feed in feeds {
            progress.set_message(&feed.city);
            let result = self.observe_station(client, feed).await;
            report.record(&feed.city, result);
            progress.increment(1);
            pause(self.settings.request_delay_secs).await;
        }
        progress.finish_with_message(&format!("Observations: {}", report.summary()));

        self.write_last_updated(now_in(self.display_tz))?;
        Ok(report)
    }

    async fn observe_station(
        &self,
        client: &BomClient,
        feed: &StationFeed,
    ) -> Result<ObservationOutcome> {
        let text = client.get_text(&feed.url).await?;
        self.ingest(&feed.city, &text, now_in(self.scrape_tz))
    }

    /// Store one AXF payload for a city. `now` is the scrape time in the
    /// scrape zone.
    pub fn ingest(&self, city: &str, text: &str, now: DateTime<Tz>) -> Result<ObservationOutcome> {
        let document = AxfDocument::parse(text)?;
        if document.is_empty() {
            warn!(city, "Observation feed has no rows");
            return Ok(ObservationOutcome::default());
        }

        let store = self.store(city);
        let partitions = store.append(
            &document.to_record_batch()?,
            &PartitionBy::CompactTimestamp(OBS_KEY_COLUMN.to_string()),
            &[OBS_KEY_COLUMN],
        )?;

        let legacy = self.converter.convert(&document.observations()?);
        if legacy.is_empty() {
            // Keep the previous CSV rather than replacing it with an empty file
            warn!(city, "No observation had a readable time, legacy CSV not written");
            return Ok(ObservationOutcome {
                partitions,
                ..ObservationOutcome::default()
            });
        }

        let legacy_csv = self.settings.data_dir.join(format!("{}.csv", city));
        write_records(&legacy_csv, &legacy)?;
        let snapshot = raw_snapshot_path(&self.settings.raw_dir(), &now, city);
        write_records(&snapshot, &legacy)?;

        let summaries_written = if self.settings.is_featured(city) {
            write_json(
                &self.settings.static_dir.join(OBSERVATIONS_JSON),
                &summarize_days(&legacy),
            )?;
            self.write_last30(&store, now)?;
            true
        } else {
            false
        };

        info!(city, rows = legacy.len(), partitions = partitions.len(), "Stored observations");
        Ok(ObservationOutcome {
            partitions,
            legacy_rows: legacy.len(),
            legacy_csv: Some(legacy_csv),
            snapshot: Some(snapshot),
            summaries_written,
        })
    }

    fn store(&self, city: &str) -> PartitionStore {
        PartitionStore::new(self.settings.observations_dir(city)).with_writer(self.writer.clone())
    }

    fn write_last30(&self, store: &PartitionStore, now: DateTime<Tz>) -> Result<()> {
        let Some(batch) = store.read_all()? else {
            return Ok(());
        };
        let readings = last_30_days(&batch, now.naive_local())?;
        write_json(&self.settings.static_dir.join(LAST30_JSON), &readings)
    }

    pub fn write_last_updated(&self, now: DateTime<Tz>) -> Result<()> {
        let stamp = LastUpdated {
            last_updated: now.to_rfc3339(),
        };
        write_json(&self.settings.static_dir.join(LAST_UPDATED_JSON), &stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_shown_unless_silenced() -> Result<()> {
        let settings = Settings::default();
        assert!(!ObservationPipeline::new(&settings)?.silent);
        assert!(ObservationPipeline::new(&settings)?.silent(true).silent);
        Ok(())
    }
}
