use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Reads and writes whole partition files.
#[derive(Debug, Clone)]
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

/// Map a configured codec name to its Parquet compression.
pub fn parse_compression(name: &str) -> Result<Compression> {
    match name.to_lowercase().as_str() {
        COMPRESSION_SNAPPY => Ok(Compression::SNAPPY),
        COMPRESSION_GZIP => Ok(Compression::GZIP(GzipLevel::default())),
        COMPRESSION_LZ4 => Ok(Compression::LZ4),
        COMPRESSION_ZSTD => Ok(Compression::ZSTD(ZstdLevel::default())),
        COMPRESSION_NONE => Ok(Compression::UNCOMPRESSED),
        other => Err(ProcessingError::Config(format!(
            "Unsupported compression '{}', expected one of {}, {}, {}, {}, {}",
            other, COMPRESSION_SNAPPY, COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_ZSTD, COMPRESSION_NONE
        ))),
    }
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(self, name: &str) -> Result<Self> {
        Ok(Self {
            compression: parse_compression(name)?,
            ..self
        })
    }

    pub fn with_row_group_size(self, row_group_size: usize) -> Self {
        Self {
            row_group_size,
            ..self
        }
    }

    /// Write a batch to `path`, replacing any existing file.
    ///
    /// The file is written next to its destination and renamed into place,
    /// so readers never see a half-written partition.
    pub fn write_batch(&self, batch: &RecordBatch, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = ArrowWriter::try_new(temp.as_file_mut(), batch.schema(), Some(props))?;
            writer.write(batch)?;
            writer.close()?;
        }
        temp.persist(path).map_err(|e| e.error)?;

        debug!(path = %path.display(), rows = batch.num_rows(), "Wrote partition");
        Ok(())
    }

    /// Read a whole file into one batch.
    pub fn read_batch(&self, path: &Path) -> Result<RecordBatch> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
        let schema: SchemaRef = builder.schema().clone();
        let batches = builder
            .build()?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(concat_batches(&schema, &batches)?)
    }

    /// Row count, layout and column types of a partition, read from the
    /// footer only.
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
        let metadata = builder.metadata();

        let compression = metadata
            .row_groups()
            .first()
            .and_then(|rg| rg.columns().first())
            .map(|c| c.compression())
            .unwrap_or(Compression::UNCOMPRESSED);

        Ok(ParquetFileInfo {
            rows: metadata.file_metadata().num_rows(),
            row_groups: metadata.num_row_groups(),
            bytes: std::fs::metadata(path)?.len(),
            compression,
            fields: builder
                .schema()
                .fields()
                .iter()
                .map(|f| (f.name().clone(), f.data_type().clone()))
                .collect(),
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ParquetFileInfo {
    pub rows: i64,
    pub row_groups: usize,
    pub bytes: u64,
    pub compression: Compression,
    pub fields: Vec<(String, DataType)>,
}

impl ParquetFileInfo {
    /// Columns stored as text. In an observation partition these are the
    /// candidates for `repair`.
    pub fn text_columns(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, data_type)| matches!(data_type, DataType::Utf8 | DataType::LargeUtf8))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} rows in {} row group(s), {:.1} KiB, {:?}",
            self.rows,
            self.row_groups,
            self.bytes as f64 / 1024.0,
            self.compression
        );
        for (name, data_type) in &self.fields {
            text.push_str(&format!("\n  {}: {}", name, data_type));
        }
        text
    }
}
