use crate::client::OpenMeteoClient;
use crate::error::{ProcessingError, Result};
use crate::models::{DailySeries, GeoLocation, HourlySeries};
use crate::pipelines::{city_selected, partition_writer, pause, RunReport};
use crate::settings::{OpenMeteoSettings, Settings};
use crate::storage::columns::{string_column, timestamp_column};
use crate::storage::{PartitionBy, PartitionStore, PartitionSummary};
use crate::utils::constants::{
    ARCHIVE_CHUNK_DELAY_MILLIS, CITY_COLUMN, GEOCODE_DELAY_MILLIS, RECENT_OBSERVATION_DAYS,
    TIME_COLUMN,
};
use crate::utils::progress::ProgressReporter;
use crate::writers::{hourly_series_to_batch, read_json, write_json, ParquetWriter};
use chrono::{Days, Duration, NaiveDate, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub type GeocodeCache = BTreeMap<String, GeoLocation>;

const ARCHIVE_KEYS: &[&str] = &[CITY_COLUMN, TIME_COLUMN];

/// Hourly history and forecasts from Open-Meteo for every configured city.
pub struct OpenMeteoPipeline<'a> {
    settings: &'a OpenMeteoSettings,
    writer: ParquetWriter,
    silent: bool,
}

impl<'a> OpenMeteoPipeline<'a> {
    pub fn new(settings: &'a Settings) -> Result<Self> {
        Ok(Self {
            settings: &settings.open_meteo,
            writer: partition_writer(settings)?,
            silent: false,
        })
    }

    /// Hide the progress bars.
    pub fn silent(self, silent: bool) -> Self {
        Self { silent, ..self }
    }

    pub fn observations_store(&self) -> PartitionStore {
        PartitionStore::new(self.settings.observations_archive_dir()).with_writer(self.writer.clone())
    }

    pub fn forecasts_store(&self) -> PartitionStore {
        PartitionStore::new(self.settings.forecasts_archive_dir()).with_writer(self.writer.clone())
    }

    pub async fn run(&self, client: &OpenMeteoClient, city: Option<&str>) -> Result<RunReport> {
        let cities: Vec<&String> = self
            .settings
            .cities
            .iter()
            .filter(|c| city_selected(city, c))
            .collect();
        let locations = self.geocode_all(client, &cities).await?;
        let yesterday = Utc::now().date_naive() - Days::new(1);

        let mut report = RunReport::default();
        let progress = ProgressReporter::new(locations.len() as u64, "Fetching observations", self.silent);
        for (name, location) in &locations {
            progress.set_message(name);
            let result = self.update_observations(client, name, location, yesterday).await;
            report.record(name, result);
            progress.increment(1);
            pause(self.settings.request_delay_secs).await;
        }
        progress.finish_with_message("Observations done");

        let progress = ProgressReporter::new(locations.len() as u64, "Fetching forecasts", self.silent);
        for (name, location) in &locations {
            progress.set_message(name);
            let result = self.update_forecast(client, name, location).await;
            report.record(&format!("{} forecast", name), result);
            progress.increment(1);
            pause(self.settings.request_delay_secs).await;
        }
        progress.finish_with_message("Forecasts done");

        Ok(report)
    }

    /// Locations for the given cities, from the cache where possible.
    /// Cities that cannot be geocoded are skipped with a warning.
    pub async fn geocode_all(
        &self,
        client: &OpenMeteoClient,
        cities: &[&String],
    ) -> Result<Vec<(String, GeoLocation)>> {
        let cache_path = self.settings.geocode_cache_path();
        let mut cache = load_geocode_cache(&cache_path)?;
        let mut changed = false;

        for city in cities {
            if cache.contains_key(city.as_str()) {
                continue;
            }
            match client.geocode(city).await {
                Ok(location) => {
                    info!(
                        city = %city,
                        latitude = location.latitude,
                        longitude = location.longitude,
                        timezone = %location.timezone,
                        "Geocoded"
                    );
                    cache.insert(city.to_string(), location);
                    changed = true;
                }
                Err(e) => warn!(city = %city, error = %e, "Geocoding failed, skipping city"),
            }
            tokio::time::sleep(std::time::Duration::from_millis(GEOCODE_DELAY_MILLIS)).await;
        }

        if changed {
            write_json(&cache_path, &cache)?;
        }

        Ok(cities
            .iter()
            .filter_map(|city| {
                cache
                    .get(city.as_str())
                    .map(|location| (city.to_string(), location.clone()))
            })
            .collect())
    }

    async fn update_observations(
        &self,
        client: &OpenMeteoClient,
        city: &str,
        location: &GeoLocation,
        end: NaiveDate,
    ) -> Result<usize> {
        let start = self.resume_date(city)?;
        let mut series = HourlySeries::empty(city, &self.settings.hourly_variables);

        let chunks = chunk_ranges(start, end, self.settings.chunk_days);
        for (i, (chunk_start, chunk_end)) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(ARCHIVE_CHUNK_DELAY_MILLIS))
                    .await;
            }
            debug!(city, start = %chunk_start, end = %chunk_end, "Archive chunk");
            let response = client
                .archive(location, *chunk_start, *chunk_end, &self.settings.hourly_variables)
                .await?;
            let block = response
                .hourly
                .ok_or_else(|| ProcessingError::MissingData("hourly block".to_string()))?;
            series.extend(HourlySeries::from_block(
                city,
                &self.settings.hourly_variables,
                &block,
            )?);
        }

        if series.is_empty() {
            warn!(city, "No observation data returned");
            return Ok(0);
        }
        self.store_observations(&series)?;
        Ok(series.len())
    }

    /// Day to resume the archive from: the last day on file for the city
    /// in the newest partition, or the configured history start.
    pub fn resume_date(&self, city: &str) -> Result<NaiveDate> {
        if let Some(last) = last_archived_date(&self.observations_store(), city)? {
            info!(city, from = %last, "Resuming archive");
            return Ok(last);
        }
        NaiveDate::parse_from_str(&self.settings.history_start, "%Y-%m-%d").map_err(|e| {
            ProcessingError::Config(format!(
                "Invalid history_start '{}': {}",
                self.settings.history_start, e
            ))
        })
    }

    /// Write the recent-window JSON and merge the rows into the archive.
    pub fn store_observations(&self, series: &HourlySeries) -> Result<Vec<PartitionSummary>> {
        if let Some(latest) = series.max_time() {
            let recent = series.since(latest - Duration::days(RECENT_OBSERVATION_DAYS));
            let path = self.city_json(&self.settings.observations_dir(), &series.city);
            write_json(&path, &recent.to_json_rows())?;
        }

        self.observations_store().append(
            &hourly_series_to_batch(series)?,
            &PartitionBy::UtcTimestamp(TIME_COLUMN.to_string()),
            ARCHIVE_KEYS,
        )
    }

    async fn update_forecast(
        &self,
        client: &OpenMeteoClient,
        city: &str,
        location: &GeoLocation,
    ) -> Result<usize> {
        let hourly_variables = self.settings.forecast_hourly_variables();
        let response = client
            .forecast(location, &hourly_variables, &self.settings.daily_variables)
            .await?;

        let block = response
            .hourly
            .ok_or_else(|| ProcessingError::MissingData("hourly block".to_string()))?;
        let hourly = HourlySeries::from_block(city, &hourly_variables, &block)?;
        let daily = match response.daily {
            Some(block) => Some(DailySeries::from_block(
                city,
                &self.settings.daily_variables,
                &block,
            )?),
            None => None,
        };

        self.store_forecast(&hourly, daily.as_ref())?;
        Ok(hourly.len())
    }

    /// Write `forecasts/<city>.json` and merge the hourly rows into the
    /// forecast archive.
    pub fn store_forecast(
        &self,
        hourly: &HourlySeries,
        daily: Option<&DailySeries>,
    ) -> Result<Vec<PartitionSummary>> {
        let document = json!({
            "hourly": hourly.to_json_rows(),
            "daily": daily.map(DailySeries::to_json_rows).unwrap_or_default(),
        });
        write_json(&self.city_json(&self.settings.forecasts_dir(), &hourly.city), &document)?;

        self.forecasts_store().append(
            &hourly_series_to_batch(hourly)?,
            &PartitionBy::UtcTimestamp(TIME_COLUMN.to_string()),
            ARCHIVE_KEYS,
        )
    }

    fn city_json(&self, dir: &Path, city: &str) -> PathBuf {
        dir.join(format!("{}.json", city))
    }
}

pub fn load_geocode_cache(path: &Path) -> Result<GeocodeCache> {
    if path.exists() {
        read_json(path)
    } else {
        Ok(GeocodeCache::new())
    }
}

/// Inclusive date ranges of at most `chunk_days` days covering `start..=end`.
pub fn chunk_ranges(start: NaiveDate, end: NaiveDate, chunk_days: u32) -> Vec<(NaiveDate, NaiveDate)> {
    let step = u64::from(chunk_days.max(1));
    let mut ranges = Vec::new();
    let mut chunk_start = start;
    while chunk_start <= end {
        let chunk_end = (chunk_start + Days::new(step - 1)).min(end);
        ranges.push((chunk_start, chunk_end));
        chunk_start = chunk_end + Days::new(1);
    }
    ranges
}

/// Date of the city's newest row in the latest archive partition.
pub fn last_archived_date(store: &PartitionStore, city: &str) -> Result<Option<NaiveDate>> {
    let Some(path) = store.latest_partition()? else {
        return Ok(None);
    };
    let batch = store.read_partition(&path)?;
    let cities = string_column(&batch, CITY_COLUMN)?;
    let times = timestamp_column(&batch, TIME_COLUMN)?;

    Ok(cities
        .iter()
        .zip(times)
        .filter(|(c, _)| c.as_deref() == Some(city))
        .filter_map(|(_, t)| t)
        .max()
        .map(|t| t.date_naive()))
}
