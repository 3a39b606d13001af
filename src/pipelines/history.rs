use crate::archive::{extract_first_csv, HistoryProduct};
use crate::client::BomClient;
use crate::error::Result;
use crate::models::DailyValue;
use crate::pipelines::RunReport;
use crate::processors::MELBOURNE_OLYMPIC_PARK;
use crate::readers::{find_link, ClimateTable, HistoryReader};
use crate::settings::Settings;
use crate::utils::constants::{
    ALL_YEARS_LINK_TEXT, CLIMATE_CSV, CLIMATE_JSON, CLIMATE_STATS_JSON,
};
use crate::utils::text::decode_feed;
use crate::writers::csv_writer;
use crate::writers::write_json;
use std::path::Path;
use tracing::info;

/// Long-term daily records and climate tables for the featured station.
pub struct HistoryPipeline<'a> {
    settings: &'a Settings,
}

impl<'a> HistoryPipeline<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Download every configured product's full history.
    pub async fn run(&self, client: &BomClient) -> Result<RunReport> {
        let mut report = RunReport::default();
        for &product in &self.settings.history.products {
            let result = self.fetch_product(client, product).await;
            report.record(product.display_name(), result);
        }
        Ok(report)
    }

    async fn fetch_product(&self, client: &BomClient, product: HistoryProduct) -> Result<usize> {
        let page_url = self.settings.history.page_url(product);
        let page = client.get_text(&page_url).await?;
        let zip_url = find_link(&page, &page_url, ALL_YEARS_LINK_TEXT)?;
        info!(product = %product, url = %zip_url, "Downloading daily history");

        let bytes = client.get_bytes(zip_url.as_str()).await?;
        let csv = extract_first_csv(&bytes, zip_url.as_str())?;
        self.ingest(product, &csv.text)
    }

    /// Import a history file already on disk, zipped or plain CSV.
    pub fn ingest_file(&self, path: &Path, product: HistoryProduct) -> Result<usize> {
        let bytes = std::fs::read(path)?;
        let text = if bytes.starts_with(b"PK") {
            extract_first_csv(&bytes, &path.display().to_string())?.text
        } else {
            decode_feed(&bytes)
        };
        self.ingest(product, &text)
    }

    /// Write `<stem>.csv` with every day and `historic_<stem>.json` with
    /// only the days that have a value. Returns the number of days read.
    pub fn ingest(&self, product: HistoryProduct, text: &str) -> Result<usize> {
        let values = HistoryReader::new(product.value_column()).read_daily_values(text)?;

        let csv_path = self
            .settings
            .featured_dir()
            .join(format!("{}.csv", product.stem()));
        csv_writer::write_records(&csv_path, &values)?;

        let present: Vec<&DailyValue> = values.iter().filter(|v| v.value.is_some()).collect();
        let json_path = self
            .settings
            .static_dir
            .join(format!("historic_{}.json", product.stem()));
        write_json(&json_path, &present)?;

        info!(
            product = %product,
            days = values.len(),
            with_values = present.len(),
            "Stored daily history"
        );
        Ok(values.len())
    }

    pub async fn run_climate(&self, client: &BomClient) -> Result<usize> {
        let text = client.get_text(&self.settings.history.climate_url).await?;
        self.ingest_climate(&text)
    }

    /// Clean the climate statistics table into CSV and JSON.
    pub fn ingest_climate(&self, text: &str) -> Result<usize> {
        let table = ClimateTable::parse(text)?;
        csv_writer::write_rows(
            &self.settings.featured_dir().join(CLIMATE_CSV),
            &table.headers,
            &table.rows,
        )?;
        write_json(&self.settings.static_dir.join(CLIMATE_JSON), &table.to_json_rows())?;

        info!(rows = table.rows.len(), "Stored climate table");
        Ok(table.rows.len())
    }

    pub fn write_climate_stats(&self) -> Result<()> {
        write_json(
            &self.settings.static_dir.join(CLIMATE_STATS_JSON),
            MELBOURNE_OLYMPIC_PARK,
        )
    }
}
