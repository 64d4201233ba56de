//! CSV source: reads a delimited file into an in-memory dataset.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::error::{LoaderError, Result};

/// Column names and raw text rows of a delimited file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// Read a CSV file with a header row.
pub fn read_csv(path: &Path, config: &SourceConfig) -> Result<Dataset> {
    let file = std::fs::File::open(path)
        .map_err(|e| LoaderError::Source(format!("opening {}: {}", path.display(), e)))?;
    let dataset = read_csv_from(file, config)?;
    info!(
        "Read {} rows x {} columns from {}",
        dataset.len(),
        dataset.columns.len(),
        path.display()
    );
    Ok(dataset)
}

/// Read CSV data from any reader.
pub fn read_csv_from<R: Read>(reader: R, config: &SourceConfig) -> Result<Dataset> {
    let delimiter = u8::try_from(config.delimiter).map_err(|_| {
        LoaderError::Config(format!(
            "delimiter {:?} is not a single-byte character",
            config.delimiter
        ))
    })?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            let h = if idx == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(LoaderError::Source("CSV has no header row".into()));
    }

    let columns = unique_headers(headers);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!("Parsed CSV columns: {:?}", columns);
    Ok(Dataset { columns, rows })
}

/// Make header names unique: a repeated `name` becomes `name.1`, `name.2`, ...
/// Empty headers become `Unnamed: <index>`.
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut columns = Vec::with_capacity(headers.len());

    for (idx, header) in headers.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            header
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, n);
            n += 1;
        }
        seen.insert(candidate.clone());
        columns.push(candidate);
    }

    columns
}
