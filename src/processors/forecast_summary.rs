use crate::error::Result;
use crate::models::{ForecastPeriod, ForecastSummary};
use crate::utils::constants::{FORECAST_MAX_TEMP_ELEMENT, FORECAST_RAIN_RANGE_ELEMENT};
use regex::Regex;

/// Reduces précis forecast periods to the daily max and rain upper bound.
pub struct ForecastSummarizer {
    rain_upper: Regex,
}

impl ForecastSummarizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            rain_upper: Regex::new(r"to (\d+)")?,
        })
    }

    /// Periods without a date are skipped.
    pub fn summarize(&self, periods: &[ForecastPeriod]) -> Vec<ForecastSummary> {
        periods
            .iter()
            .filter_map(|period| {
                Some(ForecastSummary {
                    date: period.date.clone()?,
                    max_temp: period
                        .field(FORECAST_MAX_TEMP_ELEMENT)
                        .and_then(parse_max_temp),
                    rain: period
                        .field(FORECAST_RAIN_RANGE_ELEMENT)
                        .and_then(|range| self.rain_upper_bound(range)),
                })
            })
            .collect()
    }

    /// `0 to 5 mm` → 5
    pub fn rain_upper_bound(&self, range: &str) -> Option<f64> {
        self.rain_upper.captures(range)?[1].parse().ok()
    }
}

/// `22 Celsius` → 22
fn parse_max_temp(value: &str) -> Option<f64> {
    value.trim_end_matches(" Celsius").trim().parse().ok()
}
