pub mod batches;
pub mod csv_writer;
pub mod json_writer;
pub mod parquet_writer;

pub use batches::{forecast_periods_to_batch, hourly_series_to_batch};
pub use json_writer::{read_json, write_json};
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};
