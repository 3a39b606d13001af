pub mod climate_stats;
pub mod combiner;
pub mod daily_summary;
pub mod forecast_summary;
pub mod last30;
pub mod legacy;
pub mod raw_combiner;

pub use climate_stats::{ClimateStat, MELBOURNE_OLYMPIC_PARK};
pub use combiner::{Combiner, Source, SourceRow};
pub use daily_summary::summarize_days;
pub use forecast_summary::ForecastSummarizer;
pub use last30::last_30_days;
pub use legacy::LegacyConverter;
pub use raw_combiner::{combine_raw, RawTable};
