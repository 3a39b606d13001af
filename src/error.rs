use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Pattern error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unsupported URL scheme in '{0}'")]
    UnsupportedScheme(String),

    #[error("{url} returned unexpected content: {preview}")]
    UnexpectedContent { url: String, preview: String },

    #[error("API returned {status}: {reason}")]
    Api { status: u16, reason: String },

    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("No geocoding results for '{0}'")]
    GeocodeNotFound(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}
