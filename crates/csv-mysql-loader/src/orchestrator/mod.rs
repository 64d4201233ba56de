//! Load orchestrator - main workflow coordinator.
//!
//! A run goes through fixed phases, each awaiting the previous one:
//! plan columns, resolve types, load, transform, verify, save profile.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{validate_table_name, Config};
use crate::core::schema::{TableSchema, UpdateCommand};
use crate::core::traits::TargetWriter;
use crate::drivers::{MysqlDialect, MysqlWriter};
use crate::error::{LoaderError, Result};
use crate::loader;
use crate::pipeline::{self, CommandOutcome};
use crate::preview::TablePreview;
use crate::profile::{FileProfileStore, NoOpProfileStore, ProfileStore};
use crate::source::Dataset;
use crate::typemap::{build_update_commands, plan_columns, resolve_all};
use crate::verify;

/// Load orchestrator.
pub struct Orchestrator {
    config: Config,
    target: Arc<dyn TargetWriter>,
    profile_store: Arc<dyn ProfileStore>,
}

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// At least one command failed and the transaction was still committed.
    CompletedWithErrors,
    RolledBack,
}

/// Result of a load run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: RunStatus,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Destination table.
    pub table: String,

    /// Resolved destination schema.
    pub schema: TableSchema,

    /// Rows written to the destination.
    pub rows_loaded: u64,

    /// Outcome of every update command, in order.
    pub commands: Vec<CommandOutcome>,

    /// Whether the transform transaction was committed.
    pub committed: bool,

    /// First dataset rows before loading.
    pub preview_before: TablePreview,

    /// First table rows after the transform, if they could be read.
    pub preview_after: Option<TablePreview>,

    /// Non-fatal problems (verification, profile persistence).
    pub warnings: Vec<String>,

    /// Whether the connection profile was saved.
    pub profile_saved: bool,
}

impl RunResult {
    /// Convert result to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of update commands that failed.
    pub fn failed_commands(&self) -> usize {
        self.commands.iter().filter(|c| c.is_failed()).count()
    }
}

/// What a run would do, computed without touching a database.
#[derive(Debug, Clone, Serialize)]
pub struct LoadPlan {
    pub table: String,
    pub schema: TableSchema,
    pub ddl: String,
    pub commands: Vec<UpdateCommand>,
    pub update_statements: Vec<String>,
}

/// Result of a connection test.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub db_type: String,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_error: Option<String>,
    pub healthy: bool,
}

/// Plan a load of `dataset` using `config`.
pub fn plan(config: &Config, dataset: &Dataset) -> Result<LoadPlan> {
    let table = config.table_name.trim();
    validate_table_name(table)?;

    let specs = plan_columns(&dataset.columns, &config.columns);
    let schema = resolve_all(table, &specs);
    let commands = build_update_commands(&specs);

    let dialect = MysqlDialect::new();
    let ddl = dialect.create_table(&schema)?;
    let update_statements = commands
        .iter()
        .map(|c| dialect.update(table, c))
        .collect::<Result<Vec<_>>>()?;

    Ok(LoadPlan {
        table: table.to_string(),
        schema,
        ddl,
        commands,
        update_statements,
    })
}

impl Orchestrator {
    /// Create an orchestrator connected to MySQL.
    ///
    /// Connection fields left empty in `config` are filled from the saved
    /// profile before connecting.
    pub async fn new(mut config: Config) -> Result<Self> {
        let profile_store: Arc<dyn ProfileStore> =
            Arc::new(FileProfileStore::new(config.profile.path.clone()));
        config.connection.apply_profile(&profile_store.load());

        let target = MysqlWriter::new(&config.connection, config.load.batch_size).await?;

        Ok(Self {
            config,
            target: Arc::new(target),
            profile_store,
        })
    }

    /// Create an orchestrator around an existing target. Nothing is
    /// persisted until a profile store is set.
    pub fn with_target(config: Config, target: Arc<dyn TargetWriter>) -> Self {
        Self {
            config,
            target,
            profile_store: Arc::new(NoOpProfileStore),
        }
    }

    /// Set the store the connection profile is saved to.
    pub fn with_profile_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.profile_store = store;
        self
    }

    /// Plan a load without touching the target.
    pub fn plan(&self, dataset: &Dataset) -> Result<LoadPlan> {
        plan(&self.config, dataset)
    }

    /// Load `dataset`, run the update commands and read the result back.
    pub async fn run(&self, dataset: &Dataset) -> Result<RunResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut warnings = Vec::new();

        info!("Starting load run: {}", run_id);

        let table = self.config.table_name.trim().to_string();
        validate_table_name(&table)?;

        // Phase 1: Resolve column types
        info!("Phase 1: Resolving {} columns", dataset.columns.len());
        let specs = plan_columns(&dataset.columns, &self.config.columns);
        let schema = resolve_all(&table, &specs);
        let commands = build_update_commands(&specs);
        let sample_rows = self.config.verify.sample_rows;
        let preview_before = TablePreview::from_dataset(dataset, sample_rows);

        // Phase 2: Load
        info!("Phase 2: Loading {} rows into {}", dataset.len(), table);
        let load = loader::load(
            self.target.as_ref(),
            &schema,
            dataset,
            self.config.load.batch_size,
        )
        .await?;

        // Phase 3: Transform
        info!("Phase 3: Running {} update commands", commands.len());
        let report = pipeline::apply(
            self.target.as_ref(),
            &table,
            &commands,
            self.config.transform.on_command_failure,
        )
        .await?;

        // Phase 4: Verify
        info!("Phase 4: Reading back {} rows", sample_rows);
        let preview_after = match verify::sample(self.target.as_ref(), &table, sample_rows).await {
            Ok(sample) => Some(TablePreview::from_sample(&sample)),
            Err(e) => {
                warn!("{}", e);
                warnings.push(e.to_string());
                None
            }
        };

        // Phase 5: Remember the connection
        let mut profile_saved = false;
        if self.config.profile.save && report.committed && preview_after.is_some() {
            match self.profile_store.save(&self.config.connection.to_profile()) {
                Ok(()) => profile_saved = true,
                Err(e) => {
                    warn!("Could not save connection profile: {}", e);
                    warnings.push(e.to_string());
                }
            }
        }

        let status = if !report.committed {
            RunStatus::RolledBack
        } else if report.has_failures() {
            RunStatus::CompletedWithErrors
        } else {
            RunStatus::Completed
        };

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let result = RunResult {
            run_id,
            status,
            started_at,
            completed_at,
            duration_seconds: duration,
            table,
            schema,
            rows_loaded: load.rows_loaded,
            commands: report.outcomes,
            committed: report.committed,
            preview_before,
            preview_after,
            warnings,
            profile_saved,
        };

        info!(
            "Load run {:?}: {} rows into {}, {} commands ({} failed) in {:.1}s",
            result.status,
            result.rows_loaded,
            result.table,
            result.commands.len(),
            result.failed_commands(),
            result.duration_seconds
        );

        Ok(result)
    }

    /// Test the target connection.
    pub async fn health_check(&self) -> Result<HealthCheckResult> {
        let start = Instant::now();
        let outcome = self.target.ping().await;
        let latency = start.elapsed().as_millis() as u64;

        let target_error = outcome.err().map(|e: LoaderError| e.to_string());
        let connected = target_error.is_none();

        Ok(HealthCheckResult {
            db_type: self.target.db_type().to_string(),
            target_connected: connected,
            target_latency_ms: latency,
            target_error,
            healthy: connected,
        })
    }

    /// Close the target connection pool.
    pub async fn close(&self) {
        self.target.close().await;
    }
}
