pub mod constants;
pub mod filename;
pub mod progress;
pub mod text;
pub mod time;

pub use constants::*;
pub use filename::{forecast_page_path, raw_snapshot_path, scrape_date_stem};
pub use progress::ProgressReporter;
pub use text::decode_feed;
