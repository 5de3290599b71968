//! Production data source loading.
//!
//! Reads the comma-separated production file into [`RawRecord`]s. A missing
//! file is reported as [`SourceError::NotFound`] so the caller can show a
//! notice instead of failing.

use crate::models::RawRecord;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Columns every source file must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = ["Unidade", "Indicador", "Meta", "Producao"];

/// Errors raised while loading the data source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The file does not exist. Recoverable: the caller shows a notice.
    #[error("Arquivo {} não encontrado.", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    /// Malformed header or row; the csv error carries the line number.
    #[error("Invalid data: {0}")]
    Csv(#[from] csv::Error),
}

/// Load all production rows from a CSV file.
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let records = read_records(file)?;
    debug!("Loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// Parse production rows from any reader with a header line.
///
/// Extra columns are ignored; blank lines are skipped.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, SourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(SourceError::MissingColumn(column.to_string()));
        }
    }

    // A blank or non-numeric Meta/Producao cell rejects the whole file.
    let records = reader
        .deserialize::<RawRecord>()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}
