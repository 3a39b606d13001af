use crate::client::BomClient;
use crate::error::Result;
use crate::models::ForecastSummary;
use crate::pipelines::{city_selected, partition_writer, pause, RunReport};
use crate::processors::ForecastSummarizer;
use crate::readers::{read_forecast_page, ForecastXmlReader};
use crate::settings::{ForecastFeed, Settings};
use crate::storage::{PartitionBy, PartitionStore};
use crate::utils::constants::{FORECASTS_JSON, FORECAST_KEY_COLUMN};
use crate::utils::filename::forecast_page_path;
use crate::utils::time::{now_in, parse_timezone};
use crate::writers::csv_writer;
use crate::writers::{forecast_periods_to_batch, write_json, ParquetWriter};
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{info, warn};

pub struct ForecastPipeline<'a> {
    settings: &'a Settings,
    summarizer: ForecastSummarizer,
    writer: ParquetWriter,
    scrape_tz: Tz,
}

impl<'a> ForecastPipeline<'a> {
    pub fn new(settings: &'a Settings) -> Result<Self> {
        Ok(Self {
            settings,
            summarizer: ForecastSummarizer::new()?,
            writer: partition_writer(settings)?,
            scrape_tz: parse_timezone(&settings.scrape_timezone)?,
        })
    }

    /// Précis XML feeds for every configured city.
    pub async fn run(&self, client: &BomClient, city: Option<&str>) -> Result<RunReport> {
        let mut report = RunReport::default();
        let feeds: Vec<&ForecastFeed> = self
            .settings
            .forecasts
            .iter()
            .filter(|feed| city_selected(city, &feed.city))
            .collect();

        for feed in feeds {
            let result = match client.get_text(&feed.url).await {
                Ok(xml) => self.ingest(&feed.city, &xml),
                Err(e) => Err(e),
            };
            report.record(&feed.city, result);
            pause(self.settings.request_delay_secs).await;
        }
        Ok(report)
    }

    /// Store the periods of one city's area. Returns how many were found.
    pub fn ingest(&self, city: &str, xml: &str) -> Result<usize> {
        let periods = ForecastXmlReader::new(city).read_periods(xml)?;
        if periods.is_empty() {
            warn!(city, "No forecast area matches the city");
            return Ok(0);
        }

        let batch = forecast_periods_to_batch(&periods)?;
        PartitionStore::new(self.settings.forecast_dir(city))
            .with_writer(self.writer.clone())
            .append(
                &batch,
                &PartitionBy::IsoDate(FORECAST_KEY_COLUMN.to_string()),
                &[FORECAST_KEY_COLUMN],
            )?;

        let csv_path = self
            .settings
            .data_dir
            .join("forecasts")
            .join(format!("{}.csv", city));
        csv_writer::write_batch(&csv_path, &batch)?;

        if self.settings.is_featured(city) {
            let summary = self.summarizer.summarize(&periods);
            write_json(&self.settings.static_dir.join(FORECASTS_JSON), &summary)?;
        }

        info!(city, periods = periods.len(), "Stored forecast");
        Ok(periods.len())
    }

    /// The featured city's HTML forecast page, an alternative source for
    /// `forecasts.json`.
    pub async fn run_page(&self, client: &BomClient) -> Result<Vec<ForecastSummary>> {
        let html = client.get_text(&self.settings.forecast_page_url).await?;
        self.ingest_page(&html, now_in(self.scrape_tz))
    }

    pub fn ingest_page(&self, html: &str, now: DateTime<Tz>) -> Result<Vec<ForecastSummary>> {
        let days = read_forecast_page(html, now.date_naive())?;
        if days.is_empty() {
            warn!("Forecast page has no usable days");
            return Ok(days);
        }

        let snapshot = forecast_page_path(&self.settings.featured_dir().join("forecasts"), &now);
        csv_writer::write_records(&snapshot, &days)?;
        write_json(&self.settings.static_dir.join(FORECASTS_JSON), &days)?;

        info!(days = days.len(), path = %snapshot.display(), "Stored forecast page");
        Ok(days)
    }
}
