//! Typed records to Arrow record batches.

use crate::error::Result;
use crate::models::{ForecastPeriod, HourlySeries};
use crate::storage::columns::utc_timestamp_type;
use crate::utils::constants::{CITY_COLUMN, FORECAST_KEY_COLUMN, TIME_COLUMN};
use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::collections::BTreeSet;
use std::sync::Arc;

/// `index`, `date`, then every field seen in any period, alphabetically.
pub fn forecast_periods_to_batch(periods: &[ForecastPeriod]) -> Result<RecordBatch> {
    let field_names: BTreeSet<&str> = periods
        .iter()
        .flat_map(|p| p.fields.keys().map(String::as_str))
        .collect();

    let mut fields = vec![
        Field::new("index", DataType::Utf8, true),
        Field::new(FORECAST_KEY_COLUMN, DataType::Utf8, true),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter(
            periods.iter().map(|p| Some(p.index.as_str())),
        )),
        Arc::new(StringArray::from_iter(periods.iter().map(|p| p.date.as_deref()))),
    ];

    for name in field_names {
        fields.push(Field::new(name, DataType::Utf8, true));
        columns.push(Arc::new(StringArray::from_iter(
            periods.iter().map(|p| p.field(name)),
        )));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// `time` (UTC), one Float64 column per variable, then `city`.
pub fn hourly_series_to_batch(series: &HourlySeries) -> Result<RecordBatch> {
    let mut fields = vec![Field::new(TIME_COLUMN, utc_timestamp_type(), true)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(
        TimestampMicrosecondArray::from(
            series
                .times
                .iter()
                .map(|t| t.timestamp_micros())
                .collect::<Vec<_>>(),
        )
        .with_timezone("UTC"),
    )];

    for (name, values) in series.variables.iter().zip(&series.values) {
        fields.push(Field::new(name, DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(values.clone())));
    }

    fields.push(Field::new(CITY_COLUMN, DataType::Utf8, true));
    columns.push(Arc::new(StringArray::from(vec![
        series.city.as_str();
        series.len()
    ])));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
