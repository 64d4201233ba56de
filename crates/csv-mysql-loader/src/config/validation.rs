//! Configuration validation.

use super::{Config, TargetConfig};
use crate::core::identifier::validate_identifier;
use crate::error::{LoaderError, Result};

/// Validate the configuration.
///
/// The table name may still be empty here because the CLI can supply it;
/// [`validate_table_name`] enforces it before a run.
pub fn validate(config: &Config) -> Result<()> {
    if !config.table_name.is_empty() {
        validate_table_name(&config.table_name)?;
    }

    for spec in &config.columns {
        validate_identifier(&spec.name).map_err(|e| {
            LoaderError::Config(format!("columns: invalid column name {:?}: {}", spec.name, e))
        })?;
    }

    if !config.source.delimiter.is_ascii() {
        return Err(LoaderError::Config(format!(
            "source.delimiter must be a single ASCII character, got {:?}",
            config.source.delimiter
        )));
    }

    if config.load.batch_size == 0 {
        return Err(LoaderError::Config(
            "load.batch_size must be at least 1".into(),
        ));
    }

    if config.verify.sample_rows == 0 {
        return Err(LoaderError::Config(
            "verify.sample_rows must be at least 1".into(),
        ));
    }

    Ok(())
}

/// The destination table name must be present and a valid identifier.
pub fn validate_table_name(table: &str) -> Result<()> {
    if table.trim().is_empty() {
        return Err(LoaderError::Config("table_name is required".into()));
    }
    validate_identifier(table)
        .map_err(|e| LoaderError::Config(format!("table_name {:?} is invalid: {}", table, e)))
}

/// Validate the fields needed to open a connection.
pub fn validate_connection(target: &TargetConfig) -> Result<()> {
    if target.host.is_empty() {
        return Err(LoaderError::Config("connection.host is required".into()));
    }
    if target.username.is_empty() {
        return Err(LoaderError::Config(
            "connection.username is required".into(),
        ));
    }
    if target.database_name.is_empty() {
        return Err(LoaderError::Config(
            "connection.database_name is required".into(),
        ));
    }
    validate_identifier(&target.database_name)
}
