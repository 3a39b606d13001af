pub mod forecast;
pub mod legacy;
pub mod observation;
pub mod open_meteo;
pub mod summary;

pub use forecast::{ForecastPeriod, ForecastSummary};
pub use legacy::LegacyObservation;
pub use observation::{without_sentinel, Observation};
pub use open_meteo::{DailySeries, GeoLocation, HourlySeries};
pub use summary::{DailySummary, DailyValue, HourlyReading, LastUpdated};
