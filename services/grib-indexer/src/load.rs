//! Locating, reading and scanning GRIB2 input files.

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use grib2_parser::{Grib2Scanner, Grib2Tables, GribRecord, ParameterId};
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::IndexerConfig;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decompress {path}: {source}")]
    Decompression {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("no GRIB2 files found")]
    NoInputs,
}

/// Records scanned from a set of files, in file order then stream order.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    /// Input files; a record's `file_id` indexes this list.
    pub files: Vec<PathBuf>,
    pub records: Vec<GribRecord>,
    /// Messages the scanner could not decode.
    pub scan_errors: usize,
    /// Records dropped by the parameter filter.
    pub filtered: usize,
}

/// Expand `paths` into the list of files to index.
///
/// Explicit files are always taken; directories are walked recursively and
/// only names the configuration accepts are kept. Directory entries are
/// sorted by name so file identifiers are stable between runs.
pub fn collect_inputs(paths: &[PathBuf], config: &IndexerConfig) -> Result<Vec<PathBuf>, LoadError> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let walker = walkdir::WalkDir::new(path).sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|source| LoadError::Walk {
                    path: path.clone(),
                    source,
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if config.accepts(&name) && seen.insert(entry.path().to_path_buf()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if seen.insert(path.clone()) {
            files.push(path.clone());
        }
    }

    if files.is_empty() {
        return Err(LoadError::NoInputs);
    }
    Ok(files)
}

/// Decompress gzip-compressed GRIB2 data.
pub fn decompress_gzip(data: &[u8]) -> std::io::Result<Bytes> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(Bytes::from(decompressed))
}

fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

async fn read_grib(path: &Path) -> Result<Bytes, LoadError> {
    let data = tokio::fs::read(path).await.map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if is_gzip(&data) {
        debug!(path = %path.display(), compressed = data.len(), "Decompressing gzip input");
        decompress_gzip(&data).map_err(|source| LoadError::Decompression {
            path: path.to_path_buf(),
            source,
        })
    } else {
        Ok(Bytes::from(data))
    }
}

fn resolve_parameter(
    tables: &Grib2Tables,
    config: &IndexerConfig,
) -> Result<Option<ParameterId>, LoadError> {
    match &config.parameter {
        None => Ok(None),
        Some(name) => tables
            .parameter_id(name)
            .map(Some)
            .ok_or_else(|| LoadError::UnknownParameter(name.clone())),
    }
}

/// Read and scan `files` concurrently, keeping their order.
pub async fn load_records(files: &[PathBuf], config: &IndexerConfig) -> Result<LoadedRecords, LoadError> {
    let tables = Grib2Tables::ncep();
    let parameter = resolve_parameter(&tables, config)?;

    let scans: Vec<_> = stream::iter(files.iter().enumerate())
        .map(|(file_id, path)| async move {
            let data = read_grib(path).await?;
            let size = data.len();
            let (records, errors) = Grib2Scanner::new(data).with_file_id(file_id as u32).scan_all();
            for e in &errors {
                warn!(path = %path.display(), error = %e, "Skipping undecodable GRIB2 message");
            }
            debug!(
                path = %path.display(),
                bytes = size,
                records = records.len(),
                errors = errors.len(),
                "Scanned file"
            );
            Ok::<_, LoadError>((records, errors.len()))
        })
        .buffered(config.concurrency)
        .collect()
        .await;

    let mut loaded = LoadedRecords {
        files: files.to_vec(),
        ..Default::default()
    };

    for scan in scans {
        let (records, errors) = scan?;
        loaded.scan_errors += errors;
        for record in records {
            match parameter {
                Some(id) if record.parameter != id => {
                    debug!(
                        record = %tables.describe(&record),
                        offset = record.offset,
                        "Filtered record"
                    );
                    loaded.filtered += 1;
                }
                _ => loaded.records.push(record),
            }
        }
    }

    info!(
        files = loaded.files.len(),
        records = loaded.records.len(),
        filtered = loaded.filtered,
        scan_errors = loaded.scan_errors,
        "Loaded GRIB2 records"
    );

    Ok(loaded)
}
