// src/extract/mod.rs
use crate::error::{EtlError, Result};
use arrow::{
    array::{ArrayRef, StringBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use csv::ReaderBuilder;
use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
    sync::Arc,
};
use tracing::{debug, info};

/// Read a whole CSV file into a single all-`Utf8` batch.
///
/// Headers are kept exactly as written. Empty fields become nulls.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => EtlError::SourceNotFound(path.to_path_buf()),
        _ => EtlError::Io(e),
    })?;
    let batch = read_csv_from_reader(BufReader::new(file))?;
    info!(
        rows = batch.num_rows(),
        cols = batch.num_columns(),
        "extracted"
    );
    Ok(batch)
}

/// Same as [`read_csv`] over any byte source.
pub fn read_csv_from_reader<R: Read>(reader: R) -> Result<RecordBatch> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| EtlError::Parse(format!("reading header row: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(EtlError::Parse("no header row".into()));
    }
    debug!(?headers, "parsed header");

    let mut builders: Vec<StringBuilder> = headers.iter().map(|_| StringBuilder::new()).collect();
    for (idx, result) in rdr.records().enumerate() {
        let record =
            result.map_err(|e| EtlError::Parse(format!("record {}: {e}", idx + 1)))?;
        for (builder, field) in builders.iter_mut().zip(record.iter()) {
            if field.is_empty() {
                builder.append_null();
            } else {
                builder.append_value(field);
            }
        }
    }

    let fields: Vec<Field> = headers
        .iter()
        .map(|h| Field::new(h, DataType::Utf8, true))
        .collect();
    let columns: Vec<ArrayRef> = builders
        .iter_mut()
        .map(|b| Arc::new(b.finish()) as ArrayRef)
        .collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Into::into)
}
