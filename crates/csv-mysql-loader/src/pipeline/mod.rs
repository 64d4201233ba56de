//! Transform pipeline: runs update commands in one transaction.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::CommitPolicy;
use crate::core::schema::UpdateCommand;
use crate::core::traits::TargetWriter;
use crate::error::{LoaderError, Result};

/// Result of running one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandResult {
    Applied { rows_affected: u64 },
    Failed { error: String },
    /// Not run because an earlier command failed under
    /// [`CommitPolicy::RollbackOnFailure`].
    Skipped,
}

/// A command with its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    #[serde(flatten)]
    pub command: UpdateCommand,
    #[serde(flatten)]
    pub result: CommandResult,
}

impl CommandOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.result, CommandResult::Failed { .. })
    }
}

/// Outcomes of a pipeline run in command order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub policy: CommitPolicy,
    pub committed: bool,
    pub outcomes: Vec<CommandOutcome>,
}

impl PipelineReport {
    pub fn applied_count(&self) -> usize {
        self.count(|r| matches!(r, CommandResult::Applied { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|r| matches!(r, CommandResult::Failed { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|r| matches!(r, CommandResult::Skipped))
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    /// Rows changed across all applied commands.
    pub fn rows_affected(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.result {
                CommandResult::Applied { rows_affected } => rows_affected,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&CommandResult) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.result)).count()
    }
}

/// Run `commands` against `table` in declared order.
///
/// A failing command never aborts the run: its error is recorded and the
/// policy decides what happens next. Only failing to begin, commit or roll
/// back the transaction is an error.
pub async fn apply(
    target: &dyn TargetWriter,
    table: &str,
    commands: &[UpdateCommand],
    policy: CommitPolicy,
) -> Result<PipelineReport> {
    if commands.is_empty() {
        info!("No update commands for {}", table);
        return Ok(PipelineReport {
            policy,
            committed: true,
            outcomes: Vec::new(),
        });
    }

    let mut tx = target.begin().await.map_err(as_transaction_error)?;
    let mut outcomes = Vec::with_capacity(commands.len());
    let mut stopped = false;

    for command in commands {
        let result = if stopped {
            CommandResult::Skipped
        } else {
            match tx.execute_update(table, command).await {
                Ok(rows_affected) => {
                    info!("{}: {} rows affected", command, rows_affected);
                    CommandResult::Applied { rows_affected }
                }
                Err(e) => {
                    warn!("{} failed: {}", command, e);
                    stopped = policy == CommitPolicy::RollbackOnFailure;
                    CommandResult::Failed {
                        error: e.to_string(),
                    }
                }
            }
        };
        outcomes.push(CommandOutcome {
            command: command.clone(),
            result,
        });
    }

    let committed = if stopped {
        tx.rollback().await.map_err(as_transaction_error)?;
        warn!("Rolled back update commands on {}", table);
        false
    } else {
        tx.commit().await.map_err(as_transaction_error)?;
        info!("Committed {} update commands on {}", commands.len(), table);
        true
    };

    Ok(PipelineReport {
        policy,
        committed,
        outcomes,
    })
}

fn as_transaction_error(e: LoaderError) -> LoaderError {
    match e {
        e @ (LoaderError::Transaction(_) | LoaderError::Connection { .. }) => e,
        other => LoaderError::Transaction(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ConcreteType, ResolvedColumn, TableSchema, UpdateKind};
    use crate::core::value::{Batch, SqlValue};
    use crate::drivers::MemoryTarget;

    async fn target_with(values: &[&str]) -> MemoryTarget {
        let schema = TableSchema {
            table: "t".to_string(),
            columns: vec![
                ResolvedColumn {
                    name: "phone".to_string(),
                    db_type: ConcreteType::BoundedString(20),
                },
                ResolvedColumn {
                    name: "crn".to_string(),
                    db_type: ConcreteType::BoundedString(20),
                },
            ],
        };
        let target = MemoryTarget::new();
        target.create_table(&schema).await.unwrap();
        let rows = values
            .iter()
            .map(|v| vec![SqlValue::Text(v.to_string()), SqlValue::Text(v.to_string())])
            .collect();
        target
            .write_batch("t", &schema.column_names(), Batch::new(rows))
            .await
            .unwrap();
        target
    }

    async fn column(target: &MemoryTarget, idx: usize) -> Vec<String> {
        target
            .rows("t")
            .await
            .unwrap()
            .iter()
            .map(|r| r[idx].to_string())
            .collect()
    }

    fn commands_with_failing_middle() -> Vec<UpdateCommand> {
        vec![
            UpdateCommand::new("phone", UpdateKind::NormalizeLeadingZero),
            UpdateCommand::new("missing", UpdateKind::NormalizeLeadingZero),
            UpdateCommand::new("crn", UpdateKind::ZeroPadFixedWidth),
        ]
    }

    #[tokio::test]
    async fn test_commit_always_keeps_successful_commands() {
        let target = target_with(&["1234"]).await;
        let report = apply(
            &target,
            "t",
            &commands_with_failing_middle(),
            CommitPolicy::CommitAlways,
        )
        .await
        .unwrap();

        assert!(report.committed);
        assert_eq!(report.applied_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert!(report.outcomes[1].is_failed());
        assert_eq!(column(&target, 0).await, vec!["01234"]);
        assert_eq!(column(&target, 1).await, vec!["00001234"]);
    }

    #[tokio::test]
    async fn test_rollback_on_failure_skips_and_discards() {
        let target = target_with(&["1234"]).await;
        let report = apply(
            &target,
            "t",
            &commands_with_failing_middle(),
            CommitPolicy::RollbackOnFailure,
        )
        .await
        .unwrap();

        assert!(!report.committed);
        assert_eq!(report.applied_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.outcomes[2].result, CommandResult::Skipped);
        assert_eq!(column(&target, 0).await, vec!["1234"]);
    }

    #[tokio::test]
    async fn test_normalize_leading_zero_is_idempotent() {
        let target = target_with(&["5551234", "0555", "77"]).await;
        let commands = vec![UpdateCommand::new("phone", UpdateKind::NormalizeLeadingZero)];

        let first = apply(&target, "t", &commands, CommitPolicy::CommitAlways)
            .await
            .unwrap();
        let after_first = column(&target, 0).await;
        let second = apply(&target, "t", &commands, CommitPolicy::CommitAlways)
            .await
            .unwrap();

        assert_eq!(first.rows_affected(), 2);
        assert_eq!(second.rows_affected(), 0);
        assert_eq!(column(&target, 0).await, after_first);
        assert_eq!(after_first, vec!["05551234", "0555", "077"]);
    }

    #[tokio::test]
    async fn test_zero_pad_leaves_long_values_alone() {
        let target = target_with(&["1234", "12345678", "123456789"]).await;
        let commands = vec![UpdateCommand::new("crn", UpdateKind::ZeroPadFixedWidth)];
        let report = apply(&target, "t", &commands, CommitPolicy::CommitAlways)
            .await
            .unwrap();

        assert_eq!(report.rows_affected(), 1);
        assert_eq!(
            column(&target, 1).await,
            vec!["00001234", "12345678", "123456789"]
        );
    }

    #[tokio::test]
    async fn test_empty_command_list_commits_without_transaction() {
        let target = MemoryTarget::new();
        let report = apply(&target, "absent", &[], CommitPolicy::RollbackOnFailure)
            .await
            .unwrap();
        assert!(report.committed);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let outcome = CommandOutcome {
            command: UpdateCommand::new("phone", UpdateKind::NormalizeLeadingZero),
            result: CommandResult::Applied { rows_affected: 3 },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["target_column"], "phone");
        assert_eq!(json["kind"], "normalize_leading_zero");
        assert_eq!(json["status"], "applied");
        assert_eq!(json["rows_affected"], 3);
    }
}
