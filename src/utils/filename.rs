use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Scrape-date folder name with format: {YYYYMMDD}
pub fn scrape_date_stem<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    now.format("%Y%m%d").to_string()
}

/// Raw snapshot path with format: {root}/{YYYYMMDD}/{city}_{HH}.csv
pub fn raw_snapshot_path<Tz: TimeZone>(root: &Path, now: &DateTime<Tz>, city: &str) -> PathBuf
where
    Tz::Offset: Display,
{
    root.join(scrape_date_stem(now))
        .join(format!("{}_{}.csv", city, now.format("%H")))
}

/// Forecast page snapshot path with format: {root}/{YYYYMMDD}.csv
pub fn forecast_page_path<Tz: TimeZone>(root: &Path, now: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: Display,
{
    root.join(format!("{}.csv", scrape_date_stem(now)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_raw_snapshot_path() {
        let now = Utc.with_ymd_and_hms(2025, 10, 25, 7, 15, 0).unwrap();
        let path = raw_snapshot_path(Path::new("data/raw"), &now, "Sydney");
        assert_eq!(path, PathBuf::from("data/raw/20251025/Sydney_07.csv"));
    }

    #[test]
    fn test_forecast_page_path() {
        let now = Utc.with_ymd_and_hms(2025, 1, 3, 9, 0, 0).unwrap();
        let path = forecast_page_path(Path::new("data/melbs/forecasts"), &now);
        assert_eq!(path, PathBuf::from("data/melbs/forecasts/20250103.csv"));
    }
}
