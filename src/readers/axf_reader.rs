use crate::error::{ProcessingError, Result};
use crate::models::Observation;
use crate::models::observation::parse_lenient;
use crate::utils::constants::AXF_NUMERIC_COLUMNS;
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A parsed BOM AXF observation product.
///
/// The product is a plain-text file split into `[notice]`, `[header]` and
/// `[data]` sections, each closed by `[$]`. Only the header and the data
/// table are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct AxfDocument {
    /// Header entries with the `[80]` width suffix removed from the key
    pub header: BTreeMap<String, String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl AxfDocument {
    pub fn parse(text: &str) -> Result<Self> {
        let mut header = BTreeMap::new();
        let mut section = String::new();
        let mut data_lines: Vec<&str> = Vec::new();
        let mut in_table = false;

        for line in text.lines() {
            let trimmed = line.trim();

            if in_table {
                if trimmed.starts_with('[') {
                    in_table = false;
                    section = section_name(trimmed).unwrap_or_default();
                } else if !trimmed.is_empty() {
                    data_lines.push(trimmed);
                }
                continue;
            }

            if trimmed.starts_with("sort_order") {
                in_table = true;
                data_lines.push(trimmed);
                continue;
            }

            if let Some(name) = section_name(trimmed) {
                section = name;
                continue;
            }

            if section == "header" {
                if let Some((key, value)) = parse_header_entry(trimmed) {
                    header.insert(key, value);
                }
            }
        }

        if data_lines.is_empty() {
            return Err(ProcessingError::MissingData(
                "AXF product has no data table".to_string(),
            ));
        }

        let table = data_lines.join("\n");
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(table.as_bytes());

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(columns.len(), String::new());
            rows.push(row);
        }

        debug!(columns = columns.len(), rows = rows.len(), "Parsed AXF product");
        Ok(Self {
            header,
            columns,
            rows,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Typed view of the data table.
    pub fn observations(&self) -> Result<Vec<Observation>> {
        let headers = StringRecord::from(self.columns.clone());
        self.rows
            .iter()
            .map(|row| {
                let record = StringRecord::from(row.clone());
                record
                    .deserialize::<Observation>(Some(&headers))
                    .map_err(ProcessingError::from)
            })
            .collect()
    }

    /// Every column of the data table, numeric columns as Float64 and the
    /// rest as text. Blank cells are null.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());

        for (idx, name) in self.columns.iter().enumerate() {
            let cells = self.rows.iter().map(|row| row[idx].as_str());
            if AXF_NUMERIC_COLUMNS.contains(&name.as_str()) {
                fields.push(Field::new(name, DataType::Float64, true));
                arrays.push(Arc::new(cells.map(parse_lenient).collect::<Float64Array>()));
            } else {
                fields.push(Field::new(name, DataType::Utf8, true));
                arrays.push(Arc::new(
                    cells
                        .map(|cell| (!cell.is_empty()).then_some(cell))
                        .collect::<StringArray>(),
                ));
            }
        }

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }
}

fn section_name(line: &str) -> Option<String> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.to_string())
}

/// `refresh_message[80]="Issued at 9:40 am EDT"` → (`refresh_message`, `Issued at 9:40 am EDT`)
fn parse_header_entry(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.split('[').next()?.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().trim_matches('"').to_string()))
}
