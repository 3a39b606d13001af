use crate::error::{ProcessingError, Result};
use crate::models::observation::parse_lenient;
use crate::utils::constants::CLIMATE_HEADER_MARKER;
use csv::{ReaderBuilder, Trim};
use serde_json::{Map, Value};

/// Cleaned BOM climate statistics table.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ClimateTable {
    /// Parse the table that follows the `Statistic Element` header line.
    ///
    /// Rows with two or fewer populated data cells are section headings and
    /// footnotes, and are dropped.
    pub fn parse(text: &str) -> Result<Self> {
        let start = text
            .lines()
            .position(|line| line.contains(CLIMATE_HEADER_MARKER))
            .ok_or_else(|| ProcessingError::MissingData(format!("'{}' header", CLIMATE_HEADER_MARKER)))?;
        let table = text.lines().skip(start).collect::<Vec<_>>().join("\n");

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(table.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if h.is_empty() {
                    format!("Unnamed: {}", i)
                } else {
                    h.to_string()
                }
            })
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let populated = record.iter().skip(1).filter(|cell| !cell.is_empty()).count();
            if populated <= 2 {
                continue;
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Rows as JSON objects: numbers where the cell parses, null where it is
    /// blank, text otherwise.
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .headers
                    .iter()
                    .zip(row)
                    .map(|(header, cell)| (header.clone(), cell_value(cell)))
                    .collect();
                Value::Object(object)
            })
            .collect()
    }
}

fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    match parse_lenient(cell).and_then(serde_json::Number::from_f64) {
        Some(number) => Value::Number(number),
        None => Value::String(cell.to_string()),
    }
}
