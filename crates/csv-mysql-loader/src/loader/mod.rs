//! Table loader: replaces the destination table with the dataset contents.
//!
//! Every cell is coerced before anything is written. Rows then go into a
//! staging table which is swapped over the destination only once all rows
//! are in, so a failed load leaves any previous table as it was.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::validate_table_name;
use crate::core::identifier::derived_name;
use crate::core::schema::TableSchema;
use crate::core::traits::TargetWriter;
use crate::core::value::{Batch, SqlValue};
use crate::error::{LoaderError, Result};
use crate::source::Dataset;

/// Suffix of the staging table a load writes into.
pub const STAGING_SUFFIX: &str = "__staging";

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadResult {
    pub table: String,
    pub rows_loaded: u64,
}

/// Replace `schema.table` with the rows of `dataset`.
pub async fn load(
    target: &dyn TargetWriter,
    schema: &TableSchema,
    dataset: &Dataset,
    batch_size: usize,
) -> Result<LoadResult> {
    let table = schema.table.as_str();
    validate_table_name(table).map_err(|e| LoaderError::load(table, e))?;

    let start = Instant::now();
    let rows = coerce_rows(schema, dataset)?;
    let total = rows.len();

    let staging = derived_name(table, STAGING_SUFFIX);
    let staging_schema = schema.renamed(&staging);

    info!(
        "Loading {} rows into {} via {} (batch size {})",
        total, table, staging, batch_size
    );

    match write_staging(target, &staging_schema, rows, batch_size).await {
        Ok(rows_loaded) => {
            if let Err(e) = check_row_count(target, &staging, rows_loaded).await {
                discard_staging(target, &staging).await;
                return Err(e.into_load(table));
            }
            if let Err(e) = target.replace_table(&staging, table).await {
                discard_staging(target, &staging).await;
                return Err(e.into_load(table));
            }
            info!(
                "Loaded {} rows into {} in {:.2}s",
                rows_loaded,
                table,
                start.elapsed().as_secs_f64()
            );
            Ok(LoadResult {
                table: table.to_string(),
                rows_loaded,
            })
        }
        Err(e) => {
            discard_staging(target, &staging).await;
            Err(e.into_load(table))
        }
    }
}

/// Coerce every dataset cell into its column type, in schema order.
fn coerce_rows(schema: &TableSchema, dataset: &Dataset) -> Result<Vec<Vec<SqlValue>>> {
    let table = schema.table.as_str();

    let positions = schema
        .columns
        .iter()
        .map(|col| {
            dataset
                .columns
                .iter()
                .position(|c| c == &col.name)
                .ok_or_else(|| {
                    LoaderError::load(
                        table,
                        format!("column '{}' is not in the dataset", col.name),
                    )
                })
        })
        .collect::<Result<Vec<_>>>()?;

    dataset
        .rows
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            schema
                .columns
                .iter()
                .zip(&positions)
                .map(|(col, &pos)| {
                    let raw = row.get(pos).map(String::as_str).unwrap_or("");
                    SqlValue::coerce(raw, &col.db_type).map_err(|msg| {
                        LoaderError::load(
                            table,
                            format!("row {}, column '{}': {}", row_idx + 1, col.name, msg),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

async fn write_staging(
    target: &dyn TargetWriter,
    schema: &TableSchema,
    rows: Vec<Vec<SqlValue>>,
    batch_size: usize,
) -> Result<u64> {
    let staging = schema.table.as_str();
    if target.table_exists(staging).await? {
        warn!("Dropping leftover staging table {}", staging);
    }
    target.drop_table(staging).await?;
    target.create_table(schema).await?;

    let cols = schema.column_names();
    let batch_size = batch_size.max(1);
    let mut written = 0u64;
    let mut rows = rows.into_iter().peekable();

    while rows.peek().is_some() {
        let chunk: Vec<Vec<SqlValue>> = rows.by_ref().take(batch_size).collect();
        written += target.write_batch(staging, &cols, Batch::new(chunk)).await?;
        debug!("{}: {} rows written", staging, written);
    }

    Ok(written)
}

/// Confirm the staging table holds every written row before it is swapped in.
async fn check_row_count(target: &dyn TargetWriter, staging: &str, expected: u64) -> Result<()> {
    let actual = target.get_row_count(staging).await?;
    if actual != expected as i64 {
        return Err(LoaderError::load(
            staging,
            format!("expected {} rows in staging, found {}", expected, actual),
        ));
    }
    Ok(())
}

async fn discard_staging(target: &dyn TargetWriter, staging: &str) {
    if let Err(e) = target.drop_table(staging).await {
        warn!("Failed to drop staging table {}: {}", staging, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::core::schema::{ConcreteType, ResolvedColumn};
    use crate::core::traits::TargetTransaction;
    use crate::core::value::Sample;
    use crate::drivers::MemoryTarget;

    /// Memory target that reports one more row per batch than it stores.
    struct OvercountingTarget(MemoryTarget);

    #[async_trait]
    impl TargetWriter for OvercountingTarget {
        async fn drop_table(&self, table: &str) -> Result<()> {
            self.0.drop_table(table).await
        }

        async fn create_table(&self, schema: &TableSchema) -> Result<()> {
            self.0.create_table(schema).await
        }

        async fn table_exists(&self, table: &str) -> Result<bool> {
            self.0.table_exists(table).await
        }

        async fn write_batch(&self, table: &str, cols: &[String], batch: Batch) -> Result<u64> {
            Ok(self.0.write_batch(table, cols, batch).await? + 1)
        }

        async fn replace_table(&self, staging: &str, table: &str) -> Result<()> {
            self.0.replace_table(staging, table).await
        }

        async fn get_row_count(&self, table: &str) -> Result<i64> {
            self.0.get_row_count(table).await
        }

        async fn begin(&self) -> Result<Box<dyn TargetTransaction>> {
            self.0.begin().await
        }

        async fn fetch_sample(&self, table: &str, limit: usize) -> Result<Sample> {
            self.0.fetch_sample(table, limit).await
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        fn db_type(&self) -> &str {
            "memory"
        }

        async fn close(&self) {}
    }

    fn schema() -> TableSchema {
        TableSchema {
            table: "customers".to_string(),
            columns: vec![
                ResolvedColumn {
                    name: "id".to_string(),
                    db_type: ConcreteType::Int32,
                },
                ResolvedColumn {
                    name: "name".to_string(),
                    db_type: ConcreteType::BoundedString(10),
                },
            ],
        }
    }

    fn dataset(rows: &[[&str; 2]]) -> Dataset {
        Dataset::new(
            vec!["id".to_string(), "name".to_string()],
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_load_creates_table_in_schema_order() {
        let target = MemoryTarget::new();
        let result = load(&target, &schema(), &dataset(&[["1", "ann"], ["2", ""]]), 1000)
            .await
            .unwrap();
        assert_eq!(result.rows_loaded, 2);
        assert_eq!(target.table_names().await, vec!["customers"]);
        assert_eq!(
            target.rows("customers").await.unwrap()[1],
            vec![SqlValue::I32(2), SqlValue::Null]
        );
    }

    #[tokio::test]
    async fn test_reload_replaces_existing_rows() {
        let target = MemoryTarget::new();
        load(&target, &schema(), &dataset(&[["1", "a"], ["2", "b"], ["3", "c"]]), 2)
            .await
            .unwrap();
        load(&target, &schema(), &dataset(&[["9", "z"]]), 2)
            .await
            .unwrap();

        assert_eq!(
            target.rows("customers").await.unwrap(),
            vec![vec![SqlValue::I32(9), SqlValue::Text("z".to_string())]]
        );
        assert_eq!(target.table_names().await, vec!["customers"]);
    }

    #[tokio::test]
    async fn test_coercion_failure_keeps_previous_table() {
        let target = MemoryTarget::new();
        load(&target, &schema(), &dataset(&[["1", "a"]]), 10)
            .await
            .unwrap();

        let err = load(&target, &schema(), &dataset(&[["2", "b"], ["x", "c"]]), 10)
            .await
            .unwrap_err();
        match err {
            LoaderError::Load { table, message } => {
                assert_eq!(table, "customers");
                assert!(message.contains("row 2"));
                assert!(message.contains("'id'"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(target.rows("customers").await.unwrap().len(), 1);
        assert_eq!(target.table_names().await, vec!["customers"]);
    }

    #[tokio::test]
    async fn test_too_long_value_fails_load() {
        let target = MemoryTarget::new();
        let err = load(&target, &schema(), &dataset(&[["1", "much too long"]]), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::Load { .. }));
        assert!(target.table_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_table_name_is_a_load_error() {
        let target = MemoryTarget::new();
        let bad = schema().renamed("");
        let err = load(&target, &bad, &dataset(&[]), 10).await.unwrap_err();
        assert!(matches!(err, LoaderError::Load { .. }));
    }

    #[tokio::test]
    async fn test_stale_staging_table_is_replaced() {
        let target = MemoryTarget::new();
        target
            .create_table(&schema().renamed("customers__staging"))
            .await
            .unwrap();
        load(&target, &schema(), &dataset(&[["1", "a"]]), 10)
            .await
            .unwrap();
        assert_eq!(target.table_names().await, vec!["customers"]);
    }

    #[tokio::test]
    async fn test_row_count_mismatch_aborts_swap() {
        let memory = MemoryTarget::new();
        load(&memory, &schema(), &dataset(&[["1", "a"]]), 10)
            .await
            .unwrap();

        let target = OvercountingTarget(memory.clone());
        let err = load(&target, &schema(), &dataset(&[["2", "b"], ["3", "c"]]), 10)
            .await
            .unwrap_err();

        match err {
            LoaderError::Load { table, message } => {
                assert_eq!(table, "customers__staging");
                assert!(message.contains("expected 3 rows in staging, found 2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(memory.table_names().await, vec!["customers"]);
        assert_eq!(
            memory.rows("customers").await.unwrap(),
            vec![vec![SqlValue::I32(1), SqlValue::Text("a".to_string())]]
        );
    }
}
