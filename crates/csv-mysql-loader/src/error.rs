//! Error types for the loader library.

use thiserror::Error;

/// Main error type for load and transform operations.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Configuration error (invalid YAML, missing fields, bad identifiers)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Destination unreachable or rejected the credentials
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Source file could not be read
    #[error("Source error: {0}")]
    Source(String),

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Table create/replace or bulk insert failed
    #[error("Load failed for table {table}: {message}")]
    Load { table: String, message: String },

    /// A single update command failed
    #[error("Update of column {column} failed: {message}")]
    Command { column: String, message: String },

    /// The transform transaction could not be started, committed or rolled back
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Read-back of the verification sample failed
    #[error("Verification failed: {0}")]
    Verification(String),

    /// Connection profile could not be persisted
    #[error("Profile error: {0}")]
    Profile(String),

    /// Destination database error
    #[error("Database error: {0}")]
    Database(#[from] mysql_async::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoaderError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        LoaderError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Load error
    pub fn load(table: impl Into<String>, message: impl ToString) -> Self {
        LoaderError::Load {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Command error
    pub fn command(column: impl Into<String>, message: impl ToString) -> Self {
        LoaderError::Command {
            column: column.into(),
            message: message.to_string(),
        }
    }

    /// Re-wrap an error raised while loading `table` as a Load error.
    ///
    /// Connection and configuration errors keep their kind.
    pub fn into_load(self, table: &str) -> Self {
        match self {
            e @ (LoaderError::Load { .. }
            | LoaderError::Connection { .. }
            | LoaderError::Config(_)) => e,
            other => LoaderError::load(table, other),
        }
    }

    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoaderError::Config(_) | LoaderError::Yaml(_) => 2,
            LoaderError::Connection { .. } => 3,
            LoaderError::Load { .. } | LoaderError::Source(_) | LoaderError::Csv(_) => 4,
            LoaderError::Transaction(_) => 5,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;
