//! Build and update pipelines: files in, index document out.

use anyhow::{Context, Result};
use coord_index::{build_space, BuildReport, CoordinateSpace};
use std::path::PathBuf;
use tracing::info;

use crate::config::IndexerConfig;
use crate::dims::build_dimensions;
use crate::document::IndexDocument;
use crate::load::{collect_inputs, load_records};

/// Scan `paths` and index every record over the configured dimensions.
pub async fn build_index(paths: &[PathBuf], config: &IndexerConfig) -> Result<(IndexDocument, CoordinateSpace)> {
    config.validate()?;
    let dimensions = build_dimensions(&config.dimensions)?;

    let files = collect_inputs(paths, config)?;
    let loaded = load_records(&files, config).await?;

    let (space, report) = build_space(&dimensions, &loaded.records, &config.index)
        .context("Failed to build coordinate space")?;

    info!(
        shape = ?space.shape(),
        cells = space.cell_count(),
        density = space.density(),
        "Built index"
    );

    let mut document = IndexDocument::new(
        &space,
        report,
        loaded.files,
        config.dimensions.clone(),
        config.parameter.clone(),
    );
    document.scan_errors = loaded.scan_errors;
    document.filtered = loaded.filtered;
    Ok((document, space))
}

/// Add the records of `paths` to an existing index.
///
/// The dimensions and parameter filter stored in the document are reused so
/// the new records land on the same axes.
pub async fn update_index(
    document: &IndexDocument,
    paths: &[PathBuf],
    config: &IndexerConfig,
) -> Result<(IndexDocument, CoordinateSpace)> {
    let config = IndexerConfig {
        dimensions: document.dimensions.clone(),
        parameter: document.parameter.clone(),
        ..config.clone()
    };
    config.validate()?;
    let dimensions = build_dimensions(&config.dimensions)?;

    let known: Vec<PathBuf> = document.files.clone();
    let files: Vec<PathBuf> = collect_inputs(paths, &config)?
        .into_iter()
        .filter(|f| !known.contains(f))
        .collect();
    let space = document.to_space().context("Stored index is corrupt")?;

    if files.is_empty() {
        info!("No new files to index");
        return Ok((document.clone(), space));
    }

    let base = u32::try_from(known.len()).context("Too many indexed files")?;
    let mut loaded = load_records(&files, &config).await?;
    for record in &mut loaded.records {
        record.file_id += base;
    }

    let (extended, report) = space
        .extend(&dimensions, &loaded.records, &config.index)
        .context("Failed to extend coordinate space")?;

    info!(
        new_files = files.len(),
        indexed = report.records_indexed,
        shape = ?extended.shape(),
        "Updated index"
    );

    let mut all_files = known;
    all_files.extend(loaded.files);
    let mut updated = IndexDocument::new(
        &extended,
        merge_reports(&document.report, report),
        all_files,
        config.dimensions.clone(),
        config.parameter.clone(),
    );
    updated.scan_errors = document.scan_errors + loaded.scan_errors;
    updated.filtered = document.filtered + loaded.filtered;
    Ok((updated, extended))
}

/// Duplicates are recomputed over the whole extended space, so only the
/// per-record counts and lists accumulate.
fn merge_reports(previous: &BuildReport, mut next: BuildReport) -> BuildReport {
    next.records_seen += previous.records_seen;
    next.records_indexed += previous.records_indexed;

    let mut skipped = previous.skipped.clone();
    skipped.append(&mut next.skipped);
    next.skipped = skipped;

    let mut misses = previous.misses.clone();
    misses.append(&mut next.misses);
    next.misses = misses;

    next
}
