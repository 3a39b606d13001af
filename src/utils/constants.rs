/// BOM observation feed columns
pub const OBS_KEY_COLUMN: &str = "local_date_time_full[80]";
pub const OBS_LOCAL_TIME_COLUMN: &str = "local_date_time[80]";

/// AXF columns that hold numbers. Anything else is kept as text.
pub const AXF_NUMERIC_COLUMNS: &[&str] = &[
    "sort_order",
    "wmo",
    "lat",
    "lon",
    "air_temp",
    "apparent_t",
    "rel_hum",
    "wind_spd_kmh",
    "wind_spd_kt",
    "gust_kmh",
    "gust_kt",
    "press_qnh",
    "rain_trace[80]",
    "cloud_base_m",
    "cloud_oktas",
    "delta_t",
    "dewpt",
    "press",
    "press_msl",
    "swell_height",
    "swell_period",
    "vis_km[80]",
];

/// BOM writes this for readings that were not taken
pub const MISSING_SENTINEL: f64 = -9999.0;

/// Replacement for missing wind readings in the legacy CSV
pub const MISSING_WIND: &str = "–";

/// Forecast XML
pub const FORECAST_KEY_COLUMN: &str = "date";
pub const FORECAST_MAX_TEMP_ELEMENT: &str = "air_temperature_maximum";
pub const FORECAST_RAIN_RANGE_ELEMENT: &str = "precipitation_range";

/// Open-Meteo archive and forecast tables
pub const CITY_COLUMN: &str = "city";
pub const TIME_COLUMN: &str = "time";

/// Observation feed hours are reconciled against the 9am rainfall reset
pub const RAIN_RESET_HOUR: u32 = 9;

/// Link text on the BOM daily data page pointing at the full zipped history
pub const ALL_YEARS_LINK_TEXT: &str = "All years of data";

/// Marker line preceding the header of the BOM climate statistics table
pub const CLIMATE_HEADER_MARKER: &str = "Statistic Element";

/// File names
pub const OBSERVATIONS_JSON: &str = "observations.json";
pub const LAST30_JSON: &str = "last30.json";
pub const FORECASTS_JSON: &str = "forecasts.json";
pub const LAST_UPDATED_JSON: &str = "last_updated.json";
pub const CLIMATE_JSON: &str = "climate.json";
pub const CLIMATE_CSV: &str = "climate.csv";
pub const CLIMATE_STATS_JSON: &str = "climate_stats.json";
pub const GEOCODE_CACHE_FILE: &str = "geocode_cache.json";
pub const CITY_LIST_FILE: &str = "_list.json";

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const LAST30_WINDOW_DAYS: i64 = 30;
pub const RECENT_OBSERVATION_DAYS: i64 = 7;
pub const RATE_LIMIT_MAX_RETRIES: u32 = 5;
pub const RATE_LIMIT_BASE_WAIT_SECS: u64 = 60;
pub const GEOCODE_DELAY_MILLIS: u64 = 500;
pub const ARCHIVE_CHUNK_DELAY_MILLIS: u64 = 2000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
