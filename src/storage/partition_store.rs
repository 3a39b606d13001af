use crate::error::{ProcessingError, Result};
use crate::storage::columns::{row_keys, string_column, timestamp_column};
use crate::storage::unify::{concat_unified, conform, unified_schema};
use crate::utils::time::parse_compact_timestamp;
use crate::writers::ParquetWriter;
use arrow::array::UInt32Array;
use arrow::compute::{concat_batches, lexsort_to_indices, take_record_batch, SortColumn, SortOptions};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Calendar month naming a partition file (`2025-10.parquet`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ProcessingError::InvalidFormat(format!(
                "Invalid month: {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.parquet", self)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ProcessingError::InvalidFormat(format!("Invalid year-month: '{}'", s));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        YearMonth::new(year, month).map_err(|_| invalid())
    }
}

/// How the month of each row is found.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionBy {
    /// BOM `YYYYMMDDhhmmss` text
    CompactTimestamp(String),
    /// Text starting `YYYY-MM-DD`
    IsoDate(String),
    /// Arrow timestamp, month taken in UTC
    UtcTimestamp(String),
    /// Every row goes to one month
    Fixed(YearMonth),
}

impl PartitionBy {
    pub fn months(&self, batch: &RecordBatch) -> Result<Vec<Option<YearMonth>>> {
        match self {
            PartitionBy::CompactTimestamp(column) => Ok(string_column(batch, column)?
                .iter()
                .map(|value| {
                    value
                        .as_deref()
                        .and_then(parse_compact_timestamp)
                        .map(|ts| YearMonth::of(&ts))
                })
                .collect()),
            PartitionBy::IsoDate(column) => Ok(string_column(batch, column)?
                .iter()
                .map(|value| {
                    value
                        .as_deref()
                        .and_then(|v| v.get(..10))
                        .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
                        .map(|d| YearMonth::of(&d))
                })
                .collect()),
            PartitionBy::UtcTimestamp(column) => Ok(timestamp_column(batch, column)?
                .iter()
                .map(|ts| ts.as_ref().map(YearMonth::of))
                .collect()),
            PartitionBy::Fixed(month) => Ok(vec![Some(*month); batch.num_rows()]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSummary {
    pub path: PathBuf,
    pub rows: usize,
}

/// A directory of monthly Parquet files, merged on every append.
///
/// There is no locking: one writer per directory at a time.
pub struct PartitionStore {
    root: PathBuf,
    writer: ParquetWriter,
}

impl PartitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writer: ParquetWriter::new(),
        }
    }

    pub fn with_writer(mut self, writer: ParquetWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn partition_path(&self, month: YearMonth) -> PathBuf {
        self.root.join(month.file_name())
    }

    /// Merge new rows into their monthly partitions.
    ///
    /// Rows whose month cannot be read are dropped. For each month touched,
    /// duplicate keys keep the newly appended row.
    pub fn append(
        &self,
        batch: &RecordBatch,
        partition_by: &PartitionBy,
        keys: &[&str],
    ) -> Result<Vec<PartitionSummary>> {
        if batch.num_rows() == 0 {
            return Ok(Vec::new());
        }

        let mut by_month: BTreeMap<YearMonth, Vec<u32>> = BTreeMap::new();
        let mut skipped = 0usize;
        for (row, month) in partition_by.months(batch)?.into_iter().enumerate() {
            match month {
                Some(month) => by_month.entry(month).or_default().push(row as u32),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(
                root = %self.root.display(),
                skipped,
                "Dropping rows without a usable partition date"
            );
        }

        let mut summaries = Vec::with_capacity(by_month.len());
        for (month, rows) in by_month {
            let part = take_record_batch(batch, &UInt32Array::from(rows))?;
            summaries.push(self.merge_into(&self.partition_path(month), &part, keys)?);
        }
        Ok(summaries)
    }

    /// Merge rows into one partition file, creating it if needed.
    pub fn merge_into(
        &self,
        path: &Path,
        batch: &RecordBatch,
        keys: &[&str],
    ) -> Result<PartitionSummary> {
        let combined = if path.exists() {
            let existing = self.writer.read_batch(path)?;
            let schema = unified_schema(&existing.schema(), &batch.schema());
            concat_batches(
                &schema,
                &[conform(&existing, &schema)?, conform(batch, &schema)?],
            )?
        } else {
            batch.clone()
        };

        let merged = sort_by_keys(&dedup_keep_last(&combined, keys)?, keys)?;
        self.writer.write_batch(&merged, path)?;

        info!(
            path = %path.display(),
            rows = merged.num_rows(),
            added = batch.num_rows(),
            "Updated partition"
        );
        Ok(PartitionSummary {
            path: path.to_path_buf(),
            rows: merged.num_rows(),
        })
    }

    pub fn read_partition(&self, path: &Path) -> Result<RecordBatch> {
        self.writer.read_batch(path)
    }

    /// Partition files under the root, sorted by name (and so by month).
    pub fn list_partitions(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if partition_month(&path).is_some() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    pub fn latest_partition(&self) -> Result<Option<PathBuf>> {
        Ok(self.list_partitions()?.pop())
    }

    pub fn read_all(&self) -> Result<Option<RecordBatch>> {
        self.read_matching(|_| true)
    }

    /// The given calendar month of every year on file.
    pub fn read_month_across_years(&self, month: u32) -> Result<Option<RecordBatch>> {
        self.read_matching(|ym| ym.month == month)
    }

    fn read_matching(&self, filter: impl Fn(&YearMonth) -> bool) -> Result<Option<RecordBatch>> {
        let mut batches = Vec::new();
        for path in self.list_partitions()? {
            if partition_month(&path).is_some_and(|ym| filter(&ym)) {
                batches.push(self.read_partition(&path)?);
            }
        }
        debug!(root = %self.root.display(), partitions = batches.len(), "Read partitions");
        concat_unified(&batches)
    }
}

/// Month named by a partition file, if the path is one.
pub fn partition_month(path: &Path) -> Option<YearMonth> {
    if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Keep the last row for each key, preserving row order otherwise.
pub fn dedup_keep_last(batch: &RecordBatch, keys: &[&str]) -> Result<RecordBatch> {
    if keys.is_empty() || batch.num_rows() == 0 {
        return Ok(batch.clone());
    }

    let row_keys = row_keys(batch, keys)?;
    let mut last_seen: HashMap<&str, usize> = HashMap::with_capacity(row_keys.len());
    for (row, key) in row_keys.iter().enumerate() {
        last_seen.insert(key.as_str(), row);
    }

    let keep: Vec<u32> = row_keys
        .iter()
        .enumerate()
        .filter(|(row, key)| last_seen.get(key.as_str()) == Some(row))
        .map(|(row, _)| row as u32)
        .collect();

    if keep.len() == batch.num_rows() {
        return Ok(batch.clone());
    }
    Ok(take_record_batch(batch, &UInt32Array::from(keep))?)
}

/// Stable ascending sort on the key columns, nulls first.
pub fn sort_by_keys(batch: &RecordBatch, keys: &[&str]) -> Result<RecordBatch> {
    if keys.is_empty() || batch.num_rows() < 2 {
        return Ok(batch.clone());
    }

    let columns = keys
        .iter()
        .map(|key| {
            let values = batch
                .column_by_name(key)
                .ok_or_else(|| ProcessingError::MissingColumn(key.to_string()))?
                .clone();
            Ok(SortColumn {
                values,
                options: Some(SortOptions {
                    descending: false,
                    nulls_first: true,
                }),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let indices = lexsort_to_indices(&columns, None)?;
    Ok(take_record_batch(batch, &indices)?)
}
