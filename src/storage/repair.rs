use crate::error::Result;
use crate::storage::columns::cast_lenient;
use crate::storage::unify::is_text;
use crate::writers::ParquetWriter;
use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a repair run over a directory tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    pub total: usize,
    pub fixed: usize,
    pub failed: Vec<PathBuf>,
}

impl RepairReport {
    pub fn summary(&self) -> String {
        format!(
            "Repaired {}/{} partitions ({} failed)",
            self.fixed,
            self.total,
            self.failed.len()
        )
    }
}

/// Cast listed columns stored as text to Float64, rewriting the file only
/// when something changed. Returns whether it did.
pub fn repair_numeric_columns(
    writer: &ParquetWriter,
    path: &Path,
    numeric_columns: &[&str],
) -> Result<bool> {
    let batch = writer.read_batch(path)?;
    let schema = batch.schema();

    let mut changed = false;
    let mut fields: Vec<FieldRef> = Vec::with_capacity(schema.fields().len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        if numeric_columns.contains(&field.name().as_str()) && is_text(field.data_type()) {
            columns.push(cast_lenient(array, &DataType::Float64)?);
            fields.push(Arc::new(Field::new(field.name(), DataType::Float64, true)));
            changed = true;
        } else {
            columns.push(array.clone());
            fields.push(field.clone());
        }
    }

    if changed {
        let repaired = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        writer.write_batch(&repaired, path)?;
        info!(path = %path.display(), "Repaired numeric column types");
    }
    Ok(changed)
}

/// Repair every `*.parquet` file beneath `root`.
///
/// A file that cannot be read is reported and skipped.
pub fn repair_tree(
    writer: &ParquetWriter,
    root: &Path,
    numeric_columns: &[&str],
) -> Result<RepairReport> {
    let mut report = RepairReport::default();
    let mut files = Vec::new();
    collect_parquet_files(root, &mut files)?;
    files.sort();

    for path in files {
        report.total += 1;
        match repair_numeric_columns(writer, &path, numeric_columns) {
            Ok(true) => report.fixed += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not repair partition");
                report.failed.push(path);
            }
        }
    }

    Ok(report)
}

fn collect_parquet_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_parquet_files(&path, files)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
            files.push(path);
        }
    }
    Ok(())
}
