// src/interchange.rs

//! Stage hand-off: one Parquet file per stage output.

use crate::error::{EtlError, Result};
use arrow::{compute::concat_batches, error::ArrowError, record_batch::RecordBatch};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    io,
    path::Path,
};
use tracing::debug;

/// Write `batch` to `path`, going through a temp file so readers never see
/// a half-written output.
pub fn write_batch<P: AsRef<Path>>(batch: &RecordBatch, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");

    let file = File::create(&tmp_path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), rows = batch.num_rows(), "wrote stage output");
    Ok(())
}

/// Read a stage output back as a single batch.
pub fn read_batch<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => EtlError::SourceNotFound(path.to_path_buf()),
        _ => EtlError::Io(e),
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, ArrowError>>()?;
    concat_batches(&schema, &batches).map_err(Into::into)
}
