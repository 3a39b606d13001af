use crate::error::{ProcessingError, Result};
use crate::utils::text::{decode_feed, preview};
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// First CSV member of a downloaded ZIP payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedCsv {
    pub name: String,
    pub text: String,
}

impl ExtractedCsv {
    /// File name without directory or extension, used for output names.
    pub fn stem(&self) -> &str {
        let file_name = self.name.rsplit('/').next().unwrap_or(&self.name);
        file_name.strip_suffix(".csv").unwrap_or(file_name)
    }
}

/// Extract the first `*.csv` entry of a ZIP payload.
///
/// BOM answers bad requests with an HTML page and a 200 status, so anything
/// that is not a ZIP is reported with a preview of what came back.
pub fn extract_first_csv(bytes: &[u8], source: &str) -> Result<ExtractedCsv> {
    if !bytes.starts_with(ZIP_MAGIC) {
        return Err(ProcessingError::UnexpectedContent {
            url: source.to_string(),
            preview: preview(&decode_feed(bytes), 200),
        });
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !entry.is_file() || !entry.name().to_lowercase().ends_with(".csv") {
            continue;
        }

        let name = entry.name().to_string();
        let mut raw = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut raw)?;
        debug!(entry = %name, bytes = raw.len(), "Extracted CSV from archive");

        return Ok(ExtractedCsv {
            name,
            text: decode_feed(&raw),
        });
    }

    Err(ProcessingError::MissingData(format!(
        "No CSV file in archive from {}",
        source
    )))
}
