//! Typed access to record batch columns.
//!
//! Partitions written by older versions of the scrapers do not always agree
//! on column types, so every accessor casts to the type it needs. Casts are
//! lenient: a value that cannot be converted reads as null.

use crate::error::{ProcessingError, Result};
use crate::utils::text::format_number;
use arrow::array::{Array, ArrayRef, AsArray, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, TimeUnit, TimestampMicrosecondType};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

/// Separator between key parts; cannot appear in scraped text.
const KEY_SEPARATOR: char = '\u{1f}';

pub fn utc_timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some(Arc::from("UTC")))
}

pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ProcessingError::MissingColumn(name.to_string()))
}

pub fn has_column(batch: &RecordBatch, name: &str) -> bool {
    batch.schema().column_with_name(name).is_some()
}

/// Cast that turns unconvertible values into nulls.
///
/// Floats become text the way they were scraped (`15`, not `15.0`).
pub fn cast_lenient(array: &ArrayRef, to_type: &DataType) -> Result<ArrayRef> {
    if array.data_type() == to_type {
        return Ok(array.clone());
    }
    if to_type == &DataType::Utf8 && array.data_type().is_floating() {
        let values = float_values(array)?;
        let text: StringArray = values.iter().map(|v| v.map(format_number)).collect();
        return Ok(Arc::new(text));
    }
    Ok(cast(array, to_type)?)
}

fn float_values(array: &ArrayRef) -> Result<Vec<Option<f64>>> {
    let array = cast(array, &DataType::Float64)?;
    let values = array.as_primitive::<Float64Type>();
    Ok((0..values.len())
        .map(|i| (!values.is_null(i)).then(|| values.value(i)))
        .collect())
}

/// Values as rendered text, `None` for nulls.
pub fn text_values(array: &ArrayRef) -> Result<Vec<Option<String>>> {
    if array.data_type().is_floating() {
        return Ok(float_values(array)?
            .into_iter()
            .map(|v| v.map(format_number))
            .collect());
    }

    let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
    Ok((0..array.len())
        .map(|i| {
            if array.is_null(i) {
                None
            } else {
                Some(formatter.value(i).to_string())
            }
        })
        .collect())
}

pub fn string_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<String>>> {
    text_values(column(batch, name)?)
}

pub fn f64_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    float_values(column(batch, name)?)
}

pub fn timestamp_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<DateTime<Utc>>>> {
    let array = cast(column(batch, name)?, &utc_timestamp_type())?;
    let values = array.as_primitive::<TimestampMicrosecondType>();
    Ok((0..values.len())
        .map(|i| {
            if values.is_null(i) {
                return None;
            }
            let micros = values.value(i);
            Utc.timestamp_opt(
                micros.div_euclid(1_000_000),
                (micros.rem_euclid(1_000_000) * 1_000) as u32,
            )
            .single()
        })
        .collect())
}

/// Normalise a key cell: numbers stored as floats by older writers render
/// with a trailing `.0` that text keys never have.
pub fn normalize_key(value: &str) -> &str {
    value.strip_suffix(".0").unwrap_or(value)
}

/// One comparable key per row over the given columns.
pub fn row_keys(batch: &RecordBatch, keys: &[&str]) -> Result<Vec<String>> {
    let rendered = keys
        .iter()
        .map(|key| string_column(batch, key))
        .collect::<Result<Vec<_>>>()?;

    Ok((0..batch.num_rows())
        .map(|row| {
            let mut key = String::new();
            for (i, values) in rendered.iter().enumerate() {
                if i > 0 {
                    key.push(KEY_SEPARATOR);
                }
                if let Some(value) = &values[row] {
                    key.push_str(normalize_key(value));
                }
            }
            key
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, TimestampMicrosecondArray};
    use arrow::datatypes::{Field, Schema};

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("key", DataType::Float64, true),
            Field::new("temp", DataType::Utf8, true),
            Field::new("time", utc_timestamp_type(), true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![Some(20251025093000.0), None])),
                Arc::new(StringArray::from(vec![Some("14.5"), Some("-")])),
                Arc::new(
                    TimestampMicrosecondArray::from(vec![Some(1_700_000_000_000_000), None])
                        .with_timezone("UTC"),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_f64_column_is_lenient() -> Result<()> {
        assert_eq!(f64_column(&batch(), "temp")?, vec![Some(14.5), None]);
        Ok(())
    }

    #[test]
    fn test_timestamp_column() -> Result<()> {
        let times = timestamp_column(&batch(), "time")?;
        assert_eq!(times[0], Utc.timestamp_opt(1_700_000_000, 0).single());
        assert_eq!(times[1], None);
        Ok(())
    }

    #[test]
    fn test_row_keys_render_floats_as_integers() -> Result<()> {
        let keys = row_keys(&batch(), &["key"])?;
        assert_eq!(keys, vec!["20251025093000".to_string(), String::new()]);
        Ok(())
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("20251025093000.0"), "20251025093000");
        assert_eq!(normalize_key("2025-10-25"), "2025-10-25");
    }

    #[test]
    fn test_cast_lenient_float_to_text() -> Result<()> {
        let array: ArrayRef = Arc::new(Float64Array::from(vec![Some(15.0), Some(7.4), None]));
        let text = cast_lenient(&array, &DataType::Utf8)?;
        assert_eq!(
            text_values(&text)?,
            vec![Some("15".to_string()), Some("7.4".to_string()), None]
        );
        Ok(())
    }

    #[test]
    fn test_cast_lenient_text_to_float() -> Result<()> {
        let array: ArrayRef = Arc::new(StringArray::from(vec![Some("1.5"), Some("Trace"), None]));
        let numbers = cast_lenient(&array, &DataType::Float64)?;
        let values = numbers.as_primitive::<Float64Type>();
        assert_eq!(values.value(0), 1.5);
        assert!(values.is_null(1));
        assert!(values.is_null(2));
        Ok(())
    }

    #[test]
    fn test_missing_column() {
        assert!(matches!(
            f64_column(&batch(), "rain"),
            Err(ProcessingError::MissingColumn(_))
        ));
    }
}
