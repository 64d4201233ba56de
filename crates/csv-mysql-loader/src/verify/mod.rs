//! Verification read-back of the loaded table.

use tracing::info;

use crate::core::traits::TargetWriter;
use crate::core::value::Sample;
use crate::error::{LoaderError, Result};

/// Rows read back when no limit is configured.
pub const DEFAULT_SAMPLE_ROWS: usize = 10;

/// Read the first `limit` rows of `table`.
pub async fn sample(target: &dyn TargetWriter, table: &str, limit: usize) -> Result<Sample> {
    let sample = target
        .fetch_sample(table, limit)
        .await
        .map_err(|e| LoaderError::Verification(format!("reading {}: {}", table, e)))?;
    info!(
        "Verification sample of {}: {} rows, {} columns",
        table,
        sample.rows.len(),
        sample.columns.len()
    );
    Ok(sample)
}
