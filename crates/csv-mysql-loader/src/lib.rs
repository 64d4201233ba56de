//! # csv-mysql-loader
//!
//! Schema-mapped CSV load and transform engine for MySQL.
//!
//! This library loads a delimited file into a MySQL or MariaDB table with
//! user-chosen column types, then runs a small set of text normalizations
//! on the loaded data:
//!
//! - **Type resolution** from logical types and unvalidated size modifiers
//! - **Atomic replace** of the destination table through a staging table
//! - **Update pipeline** in one transaction with a configurable commit policy
//! - **Verification** read-back of the first rows
//! - **Connection profile** remembered between runs
//!
//! ## Example
//!
//! ```rust,no_run
//! use csv_mysql_loader::{read_csv, Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> csv_mysql_loader::Result<()> {
//!     let config = Config::load("loader.yaml")?;
//!     let dataset = read_csv("customers.csv".as_ref(), &config.source)?;
//!     let orchestrator = Orchestrator::new(config).await?;
//!     let result = orchestrator.run(&dataset).await?;
//!     println!("Loaded {} rows", result.rows_loaded);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod loader;
pub mod orchestrator;
pub mod pipeline;
pub mod preview;
pub mod profile;
pub mod source;
pub mod typemap;
pub mod verify;

// Re-exports for convenient access
pub use config::{CommitPolicy, Config, DbKind, SourceConfig, TargetConfig};
pub use crate::core::{
    ColumnSpec, ConcreteType, LogicalType, ResolvedColumn, Sample, SqlValue, TableSchema,
    TargetTransaction, TargetWriter, UpdateCommand, UpdateDirective, UpdateKind,
};
pub use drivers::{MemoryTarget, MysqlWriter};
pub use error::{LoaderError, Result};
pub use orchestrator::{HealthCheckResult, LoadPlan, Orchestrator, RunResult, RunStatus};
pub use pipeline::{CommandOutcome, CommandResult, PipelineReport};
pub use preview::{render_table, TablePreview};
pub use profile::{ConnectionProfile, FileProfileStore, NoOpProfileStore, ProfileStore};
pub use source::{read_csv, Dataset};
