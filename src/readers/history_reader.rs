use crate::error::{ProcessingError, Result};
use crate::models::observation::parse_lenient;
use crate::models::DailyValue;
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use tracing::debug;

/// Reader for BOM daily data files (`IDCJAC0009_086338_1800_Data.csv`).
///
/// Each row carries `Year`, `Month` and `Day` columns plus one value column
/// whose name depends on the product.
pub struct HistoryReader {
    value_column: String,
}

impl HistoryReader {
    pub fn new(value_column: &str) -> Self {
        Self {
            value_column: value_column.to_string(),
        }
    }

    pub fn read_daily_values(&self, text: &str) -> Result<Vec<DailyValue>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ProcessingError::MissingColumn(name.to_string()))
        };
        let year_idx = column("Year")?;
        let month_idx = column("Month")?;
        let day_idx = column("Day")?;
        let value_idx = column(&self.value_column)?;

        let mut values = Vec::new();
        for record in reader.records() {
            let record = record?;
            let (Some(year), Some(month), Some(day)) = (
                record.get(year_idx).and_then(|v| v.parse::<i32>().ok()),
                record.get(month_idx).and_then(|v| v.parse::<u32>().ok()),
                record.get(day_idx).and_then(|v| v.parse::<u32>().ok()),
            ) else {
                continue;
            };
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                debug!(year, month, day, "Skipping row with an impossible date");
                continue;
            };

            values.push(DailyValue {
                date: date.format("%Y-%m-%d").to_string(),
                value: record.get(value_idx).and_then(parse_lenient),
            });
        }

        Ok(values)
    }
}
