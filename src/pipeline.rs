// src/pipeline.rs

//! The three named stages, run strictly one after another. Each consumes its
//! predecessor's whole output.

use crate::{
    error::Result,
    extract, interchange,
    load::{self, LoadSummary},
    sink::Sink,
    transform,
};
use std::path::Path;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub extracted: usize,
    pub transformed: usize,
    pub load: LoadSummary,
}

/// CSV → raw stage file.
#[instrument(level = "info", skip_all, fields(source = %source.display()))]
pub fn extract_stage(source: &Path, out: &Path) -> Result<usize> {
    let raw = extract::read_csv(source)?;
    interchange::write_batch(&raw, out)?;
    Ok(raw.num_rows())
}

/// Raw stage file → canonical stage file.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn transform_stage(input: &Path, out: &Path) -> Result<usize> {
    let raw = interchange::read_batch(input)?;
    let canonical = transform::transform(&raw)?;
    interchange::write_batch(&canonical, out)?;
    Ok(canonical.num_rows())
}

/// Canonical stage file → sink table.
#[instrument(level = "info", skip_all, fields(input = %input.display(), table = %table))]
pub async fn load_stage<S: Sink>(sink: &S, input: &Path, table: &str) -> Result<LoadSummary> {
    let canonical = interchange::read_batch(input)?;
    load::load(sink, &canonical, table).await
}

/// All three stages in memory, in order.
#[instrument(level = "info", skip_all, fields(source = %source.display(), table = %table))]
pub async fn run<S: Sink>(sink: &S, source: &Path, table: &str) -> Result<RunReport> {
    let raw = extract::read_csv(source)?;
    let canonical = transform::transform(&raw)?;
    let summary = load::load(sink, &canonical, table).await?;

    let report = RunReport {
        extracted: raw.num_rows(),
        transformed: canonical.num_rows(),
        load: summary,
    };
    info!(?report, "pipeline finished");
    Ok(report)
}
