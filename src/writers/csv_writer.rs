use crate::error::Result;
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

fn temp_beside(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    Ok(NamedTempFile::new_in(dir)?)
}

/// Write serde records with a header row. Missing values are blank cells.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut temp = temp_beside(path)?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file_mut());
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    temp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), rows = records.len(), "Wrote CSV");
    Ok(())
}

/// Write string rows under the given header.
pub fn write_rows(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut temp = temp_beside(path)?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file_mut());
        writer.write_record(headers)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    temp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), rows = rows.len(), "Wrote CSV");
    Ok(())
}

/// Dump a record batch as CSV.
pub fn write_batch(path: &Path, batch: &RecordBatch) -> Result<()> {
    let mut temp = temp_beside(path)?;
    {
        let mut writer = arrow::csv::WriterBuilder::new()
            .with_header(true)
            .build(temp.as_file_mut());
        writer.write(batch)?;
    }
    temp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), rows = batch.num_rows(), "Wrote CSV");
    Ok(())
}
