//! Layered configuration.
//!
//! Built-in defaults describe the stations and feeds the dashboard has always
//! used. An optional `bom-weather.toml` overrides them, and environment
//! variables prefixed `BOM_WEATHER__` override both (`__` separates nesting,
//! e.g. `BOM_WEATHER__OPEN_METEO__CHUNK_DAYS=30`).

use crate::archive::HistoryProduct;
use crate::error::Result;
use crate::utils::constants::{COMPRESSION_SNAPPY, GEOCODE_CACHE_FILE};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

pub const DEFAULT_CONFIG_FILE: &str = "bom-weather.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Settings {
    /// Root for CSV dumps and Parquet partitions
    pub data_dir: PathBuf,

    /// Dashboard static folder receiving the summary JSON files
    pub static_dir: PathBuf,

    /// Zone used for scrape dates and partition stamps
    pub scrape_timezone: String,

    /// Zone used for the `last_updated.json` stamp
    pub display_timezone: String,

    /// City whose summaries feed the dashboard
    #[validate(length(min = 1))]
    pub featured_city: String,

    /// Pause between station fetches
    #[validate(range(min = 0.0, max = 60.0))]
    pub request_delay_secs: f64,

    #[validate(length(min = 1))]
    pub stations: Vec<StationFeed>,

    pub forecasts: Vec<ForecastFeed>,

    pub forecast_page_url: String,

    #[validate(nested)]
    pub history: HistorySettings,

    #[validate(nested)]
    pub open_meteo: OpenMeteoSettings,

    #[validate(nested)]
    pub combiner: CombinerSettings,

    pub compression: String,
}

/// An AXF observation product for one station
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationFeed {
    pub city: String,
    pub url: String,
}

/// A précis forecast XML product and the area description to pick from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastFeed {
    pub city: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HistorySettings {
    /// Daily data page carrying the "All years of data" link
    pub daily_data_url: String,

    #[validate(length(min = 1))]
    pub station_number: String,

    pub products: Vec<HistoryProduct>,

    /// Climate statistics table
    pub climate_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenMeteoSettings {
    pub base_dir: PathBuf,

    #[validate(length(min = 1))]
    pub cities: Vec<String>,

    /// First day fetched for a city with no archive yet (YYYY-MM-DD)
    pub history_start: String,

    #[validate(length(min = 1))]
    pub hourly_variables: Vec<String>,

    /// Hourly variables only the forecast API serves
    pub forecast_extra_hourly_variables: Vec<String>,

    pub daily_variables: Vec<String>,

    #[validate(range(min = 1, max = 366))]
    pub chunk_days: u32,

    #[validate(range(min = 0.0, max = 60.0))]
    pub request_delay_secs: f64,

    pub geocoding_url: String,
    pub archive_url: String,
    pub forecast_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CombinerSettings {
    #[validate(length(min = 1))]
    pub cities: Vec<String>,

    pub variables: Vec<String>,

    /// Variables only present in forecast data
    pub forecast_only_variables: Vec<String>,

    /// Variables restricted to today's local date
    pub today_only_variables: Vec<String>,

    pub output_dir: PathBuf,
}

impl Settings {
    /// Load defaults, then the config file (if present), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_source = match path {
            Some(path) => File::from(path.to_path_buf()).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file_source)
            .add_source(Environment::with_prefix("BOM_WEATHER").separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn observations_dir(&self, city: &str) -> PathBuf {
        self.data_dir.join("new").join(city)
    }

    pub fn forecast_dir(&self, city: &str) -> PathBuf {
        self.data_dir.join("forecasts").join(city)
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn featured_dir(&self) -> PathBuf {
        self.data_dir.join("melbs")
    }

    pub fn is_featured(&self, city: &str) -> bool {
        self.featured_city == city
    }
}

impl HistorySettings {
    /// Daily data page for one product at the configured station.
    pub fn page_url(&self, product: HistoryProduct) -> String {
        format!(
            "{}?p_nccObsCode={}&p_display_type=dailyDataFile&p_startYear=&p_c=&p_stn_num={}",
            self.daily_data_url,
            product.obs_code(),
            self.station_number
        )
    }
}

impl OpenMeteoSettings {
    pub fn geocode_cache_path(&self) -> PathBuf {
        self.base_dir.join(GEOCODE_CACHE_FILE)
    }

    pub fn observations_dir(&self) -> PathBuf {
        self.base_dir.join("observations")
    }

    pub fn observations_archive_dir(&self) -> PathBuf {
        self.observations_dir().join("archive")
    }

    pub fn forecasts_dir(&self) -> PathBuf {
        self.base_dir.join("forecasts")
    }

    pub fn forecasts_archive_dir(&self) -> PathBuf {
        self.forecasts_dir().join("archive")
    }

    pub fn forecast_hourly_variables(&self) -> Vec<String> {
        self.hourly_variables
            .iter()
            .chain(self.forecast_extra_hourly_variables.iter())
            .cloned()
            .collect()
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn station(city: &str, product: &str, wmo: &str) -> StationFeed {
    StationFeed {
        city: city.to_string(),
        url: format!("https://reg.bom.gov.au/fwo/{product}/{product}.{wmo}.axf"),
    }
}

fn forecast(city: &str, product: &str) -> ForecastFeed {
    ForecastFeed {
        city: city.to_string(),
        url: format!("https://reg.bom.gov.au/fwo/{product}.xml"),
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            static_dir: PathBuf::from("melbs/static"),
            scrape_timezone: "Australia/Brisbane".to_string(),
            display_timezone: "Australia/Melbourne".to_string(),
            featured_city: "Melbourne".to_string(),
            request_delay_secs: 2.0,
            stations: vec![
                station("Sydney", "IDN60901", "94768"),
                station("Melbourne", "IDV60901", "95936"),
                station("Brisbane", "IDQ60901", "94576"),
                station("Adelaide", "IDS60901", "94648"),
                station("Perth", "IDW60901", "94608"),
                station("Hobart", "IDT60901", "94970"),
                station("Darwin", "IDD60901", "94120"),
            ],
            forecasts: vec![
                forecast("Sydney", "IDN11060"),
                forecast("Melbourne", "IDV10753"),
                forecast("Brisbane", "IDQ11295"),
                forecast("Canberra", "IDN11060"),
            ],
            forecast_page_url: "https://www.bom.gov.au/places/vic/melbourne/forecast/".to_string(),
            history: HistorySettings::default(),
            open_meteo: OpenMeteoSettings::default(),
            combiner: CombinerSettings::default(),
            compression: COMPRESSION_SNAPPY.to_string(),
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            daily_data_url: "https://www.bom.gov.au/jsp/ncc/cdio/weatherData/av".to_string(),
            station_number: "086338".to_string(),
            products: vec![HistoryProduct::Rainfall, HistoryProduct::MaxTemperature],
            climate_url: "https://www.bom.gov.au/clim_data/cdio/tables/text/IDCJCM0035_086338.csv"
                .to_string(),
        }
    }
}

impl Default for OpenMeteoSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("new_data"),
            cities: strings(&[
                "Melbourne", "Sydney", "Brisbane", "Adelaide", "Perth", "Hobart", "Darwin",
                "Canberra",
            ]),
            history_start: "2020-01-01".to_string(),
            hourly_variables: strings(&[
                "temperature_2m",
                "apparent_temperature",
                "dew_point_2m",
                "relative_humidity_2m",
                "precipitation",
                "rain",
                "snowfall",
                "cloud_cover",
                "pressure_msl",
                "surface_pressure",
                "wind_speed_10m",
                "wind_direction_10m",
                "wind_gusts_10m",
                "visibility",
                "uv_index",
                "sunshine_duration",
            ]),
            forecast_extra_hourly_variables: strings(&["precipitation_probability"]),
            daily_variables: strings(&[
                "temperature_2m_max",
                "temperature_2m_min",
                "precipitation_sum",
                "rain_sum",
                "wind_speed_10m_max",
                "wind_gusts_10m_max",
                "uv_index_max",
                "sunrise",
                "sunset",
            ]),
            chunk_days: 90,
            request_delay_secs: 1.0,
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            archive_url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
        }
    }
}

impl Default for CombinerSettings {
    fn default() -> Self {
        Self {
            cities: strings(&["Melbourne", "Sydney"]),
            variables: strings(&[
                "temperature_2m",
                "apparent_temperature",
                "cloud_cover",
                "precipitation",
                "relative_humidity_2m",
            ]),
            forecast_only_variables: strings(&["precipitation_probability"]),
            today_only_variables: strings(&["cloud_cover"]),
            output_dir: PathBuf::from("dash/static/cities"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.stations.len(), 7);
        assert!(settings.stations[1].url.ends_with("IDV60901.95936.axf"));
        assert!(settings.forecasts.iter().all(|f| f.url.starts_with("https://")));
    }

    #[test]
    fn test_load_overrides_from_file() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "featured_city = \"Sydney\"")?;
        writeln!(file, "[open_meteo]")?;
        writeln!(file, "chunk_days = 30")?;

        let settings = Settings::load(Some(file.path()))?;
        assert_eq!(settings.featured_city, "Sydney");
        assert_eq!(settings.open_meteo.chunk_days, 30);
        // Untouched values keep their defaults
        assert_eq!(settings.open_meteo.history_start, "2020-01-01");
        assert_eq!(settings.scrape_timezone, "Australia/Brisbane");
        Ok(())
    }

    #[test]
    fn test_load_rejects_out_of_range_chunk() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "[open_meteo]")?;
        writeln!(file, "chunk_days = 0")?;

        assert!(Settings::load(Some(file.path())).is_err());
        Ok(())
    }

    #[test]
    fn test_history_page_url() {
        let history = HistorySettings::default();
        let url = history.page_url(HistoryProduct::Rainfall);
        assert!(url.contains("p_nccObsCode=136"));
        assert!(url.ends_with("p_stn_num=086338"));
    }

    #[test]
    fn test_forecast_hourly_variables_include_extras() {
        let settings = OpenMeteoSettings::default();
        let vars = settings.forecast_hourly_variables();
        assert_eq!(vars.len(), settings.hourly_variables.len() + 1);
        assert_eq!(vars.last().map(String::as_str), Some("precipitation_probability"));
    }
}
