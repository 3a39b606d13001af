use crate::error::{ProcessingError, Result};
use crate::writers::csv_writer::write_rows;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rows gathered from the per-run raw snapshots of one city.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    fn column_index(&self, predicate: impl Fn(&str) -> bool) -> Option<usize> {
        self.headers.iter().position(|h| predicate(h))
    }

    /// Newest date first, then one row per (time, date), keeping the first
    /// seen. Rows without a date sort last.
    pub fn dedup_newest(mut self) -> Result<Self> {
        let date_idx = self
            .column_index(|h| h == "Date")
            .ok_or_else(|| ProcessingError::MissingColumn("Date".to_string()))?;
        let time_idx = self.column_index(|h| h.to_lowercase().contains("time"));

        // Stable sort keeps snapshot order among equal dates
        self.rows.sort_by(|a, b| b[date_idx].cmp(&a[date_idx]));

        let mut seen = HashSet::new();
        self.rows.retain(|row| {
            let time = time_idx.map(|i| row[i].clone()).unwrap_or_default();
            seen.insert((time, row[date_idx].clone()))
        });
        Ok(self)
    }
}

/// Snapshot files `raw/<YYYYMMDD>/<city>_<HH>.csv` of one city.
pub fn snapshot_files(raw_dir: &Path, city: &str) -> Result<Vec<PathBuf>> {
    let prefix = format!("{}_", city);
    let mut files = Vec::new();
    if !raw_dir.exists() {
        return Ok(files);
    }

    for day in std::fs::read_dir(raw_dir)? {
        let day = day?.path();
        if !day.is_dir() {
            continue;
        }
        for entry in std::fs::read_dir(&day)? {
            let path = entry?.path();
            let matches = path.extension().is_some_and(|ext| ext == "csv")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix));
            if matches {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Stack snapshot CSVs under the header of the first non-empty one.
/// Columns a later file lacks are left blank; extra columns are dropped.
pub fn read_snapshots(files: &[PathBuf]) -> Result<Option<RawTable>> {
    let mut table: Option<RawTable> = None;

    for path in files {
        let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
            Ok(reader) => reader,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable snapshot");
                continue;
            }
        };
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.is_empty()) {
            warn!(path = %path.display(), "Skipping snapshot without a header");
            continue;
        }
        let target = table.get_or_insert_with(|| RawTable {
            headers: headers.clone(),
            rows: Vec::new(),
        });

        let positions: Vec<Option<usize>> = target
            .headers
            .iter()
            .map(|h| headers.iter().position(|x| x == h))
            .collect();

        for record in reader.records() {
            let record = record?;
            target.rows.push(
                positions
                    .iter()
                    .map(|p| p.and_then(|i| record.get(i)).unwrap_or("").to_string())
                    .collect(),
            );
        }
        debug!(path = %path.display(), "Read snapshot");
    }

    Ok(table)
}

/// Rebuild `<output>` for a city from every raw snapshot. Returns the number
/// of rows written, or `None` when there were no snapshots.
pub fn combine_raw(raw_dir: &Path, city: &str, output: &Path) -> Result<Option<usize>> {
    let files = snapshot_files(raw_dir, city)?;
    let Some(table) = read_snapshots(&files)? else {
        return Ok(None);
    };

    let table = table.dedup_newest()?;
    write_rows(output, &table.headers, &table.rows)?;

    info!(
        city,
        files = files.len(),
        rows = table.rows.len(),
        path = %output.display(),
        "Combined raw snapshots"
    );
    Ok(Some(table.rows.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const HEADER: &str = "Time (AEDT),Temp (°C),Date";

    fn write_snapshot(root: &Path, day: &str, name: &str, rows: &[&str]) {
        let dir = root.join(day);
        std::fs::create_dir_all(&dir).unwrap();
        let mut text = format!("{}\n", HEADER);
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        std::fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn test_combine_raw_dedups_and_sorts() -> Result<()> {
        let dir = TempDir::new()?;
        let raw = dir.path().join("raw");
        write_snapshot(
            &raw,
            "20251024",
            "Melbourne_09.csv",
            &["09:00 am,12.0,2025-10-24", "08:30 am,11.5,2025-10-24"],
        );
        write_snapshot(
            &raw,
            "20251025",
            "Melbourne_10.csv",
            &["10:00 am,15.0,2025-10-25", "09:00 am,12.0,2025-10-24"],
        );
        write_snapshot(&raw, "20251025", "Sydney_10.csv", &["10:00 am,20.0,2025-10-25"]);

        let output = dir.path().join("Melbourne.csv");
        let rows = combine_raw(&raw, "Melbourne", &output)?;
        assert_eq!(rows, Some(3));

        let text = std::fs::read_to_string(&output)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                HEADER,
                "10:00 am,15.0,2025-10-25",
                "09:00 am,12.0,2025-10-24",
                "08:30 am,11.5,2025-10-24",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_empty_snapshot_is_skipped() -> Result<()> {
        let dir = TempDir::new()?;
        let raw = dir.path().join("raw");
        std::fs::create_dir_all(raw.join("20251024"))?;
        std::fs::write(raw.join("20251024").join("Hobart_10.csv"), "")?;
        write_snapshot(&raw, "20251025", "Hobart_10.csv", &["10:00 am,14.0,2025-10-25"]);

        let output = dir.path().join("Hobart.csv");
        assert_eq!(combine_raw(&raw, "Hobart", &output)?, Some(1));
        Ok(())
    }

    #[test]
    fn test_snapshot_files_match_the_city_prefix() -> Result<()> {
        let dir = TempDir::new()?;
        let raw = dir.path().join("raw");
        write_snapshot(&raw, "20251025", "Perth_10.csv", &[]);
        write_snapshot(&raw, "20251025", "North Perth_10.csv", &[]);

        let files = snapshot_files(&raw, "Perth")?;
        assert_eq!(files, vec![raw.join("20251025").join("Perth_10.csv")]);
        Ok(())
    }

    #[test]
    fn test_combine_raw_without_snapshots() -> Result<()> {
        let dir = TempDir::new()?;
        let output = dir.path().join("Perth.csv");
        assert_eq!(combine_raw(&dir.path().join("raw"), "Perth", &output)?, None);
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn test_dedup_requires_date() {
        let table = RawTable {
            headers: vec!["Time".to_string()],
            rows: vec![],
        };
        assert!(matches!(
            table.dedup_newest(),
            Err(ProcessingError::MissingColumn(_))
        ));
    }
}
