//! In-process target used for dry runs and tests.
//!
//! Mirrors the MySQL behavior the loader depends on: strict string lengths,
//! creating an existing table fails, `UPDATE` reports only rows whose value
//! changed, and a transaction sees its own writes until commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::identifier::validate_identifier;
use crate::core::schema::{ConcreteType, TableSchema, UpdateCommand, UpdateKind};
use crate::core::traits::{TargetTransaction, TargetWriter};
use crate::core::value::{Batch, Sample, SqlValue};
use crate::error::{LoaderError, Result};

#[derive(Debug, Clone)]
struct MemTable {
    schema: TableSchema,
    rows: Vec<Vec<SqlValue>>,
}

type Tables = HashMap<String, MemTable>;

/// Target that keeps tables in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows currently stored in `table`.
    pub async fn rows(&self, table: &str) -> Option<Vec<Vec<SqlValue>>> {
        self.tables.lock().await.get(table).map(|t| t.rows.clone())
    }

    /// Schema of `table`.
    pub async fn schema(&self, table: &str) -> Option<TableSchema> {
        self.tables.lock().await.get(table).map(|t| t.schema.clone())
    }

    /// Names of all stored tables, sorted.
    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl TargetWriter for MemoryTarget {
    async fn drop_table(&self, table: &str) -> Result<()> {
        validate_identifier(table)?;
        self.tables.lock().await.remove(table);
        Ok(())
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        validate_identifier(&schema.table)?;
        for col in &schema.columns {
            validate_identifier(&col.name)?;
        }

        let mut tables = self.tables.lock().await;
        if tables.contains_key(&schema.table) {
            return Err(LoaderError::load(&schema.table, "table already exists"));
        }
        tables.insert(
            schema.table.clone(),
            MemTable {
                schema: schema.clone(),
                rows: Vec::new(),
            },
        );
        debug!("Memory: created table {}", schema.table);
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.tables.lock().await.contains_key(table))
    }

    async fn write_batch(&self, table: &str, cols: &[String], batch: Batch) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| LoaderError::load(table, "table does not exist"))?;

        let positions = cols
            .iter()
            .map(|name| {
                target
                    .schema
                    .columns
                    .iter()
                    .position(|c| &c.name == name)
                    .ok_or_else(|| LoaderError::load(table, format!("unknown column '{}'", name)))
            })
            .collect::<Result<Vec<_>>>()?;

        let width = target.schema.columns.len();
        let mut staged = Vec::with_capacity(batch.len());
        for row in batch.rows {
            if row.len() != cols.len() {
                return Err(LoaderError::load(
                    table,
                    format!("row has {} values for {} columns", row.len(), cols.len()),
                ));
            }
            let mut stored = vec![SqlValue::Null; width];
            for (value, &pos) in row.into_iter().zip(&positions) {
                let column = &target.schema.columns[pos];
                check_fits(&value, &column.db_type).map_err(|msg| {
                    LoaderError::load(table, format!("column '{}': {}", column.name, msg))
                })?;
                stored[pos] = value;
            }
            staged.push(stored);
        }

        let count = staged.len() as u64;
        target.rows.extend(staged);
        Ok(count)
    }

    async fn replace_table(&self, staging: &str, table: &str) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let mut loaded = tables.remove(staging).ok_or_else(|| {
            LoaderError::load(table, format!("staging table {} is missing", staging))
        })?;
        loaded.schema = loaded.schema.renamed(table);
        tables.insert(table.to_string(), loaded);
        debug!("Memory: replaced {} with {}", table, staging);
        Ok(())
    }

    async fn get_row_count(&self, table: &str) -> Result<i64> {
        let tables = self.tables.lock().await;
        let target = tables
            .get(table)
            .ok_or_else(|| LoaderError::load(table, "table does not exist"))?;
        Ok(target.rows.len() as i64)
    }

    async fn begin(&self) -> Result<Box<dyn TargetTransaction>> {
        Ok(Box::new(MemoryTransaction {
            tables: Arc::clone(&self.tables),
            working: HashMap::new(),
        }))
    }

    async fn fetch_sample(&self, table: &str, limit: usize) -> Result<Sample> {
        let tables = self.tables.lock().await;
        let target = tables
            .get(table)
            .ok_or_else(|| LoaderError::load(table, "table does not exist"))?;
        Ok(Sample {
            columns: target.schema.column_names(),
            rows: target.rows.iter().take(limit).cloned().collect(),
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}

/// Transaction over copies of the tables it touches.
struct MemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    working: Tables,
}

#[async_trait]
impl TargetTransaction for MemoryTransaction {
    async fn execute_update(&mut self, table: &str, command: &UpdateCommand) -> Result<u64> {
        let column = &command.target_column;

        if !self.working.contains_key(table) {
            let committed = self
                .tables
                .lock()
                .await
                .get(table)
                .cloned()
                .ok_or_else(|| {
                    LoaderError::command(column, format!("table {} does not exist", table))
                })?;
            self.working.insert(table.to_string(), committed);
        }
        let target = self
            .working
            .get_mut(table)
            .ok_or_else(|| {
                LoaderError::command(column, format!("table {} does not exist", table))
            })?;

        let pos = target
            .schema
            .columns
            .iter()
            .position(|c| &c.name == column)
            .ok_or_else(|| LoaderError::command(column, format!("unknown column '{}'", column)))?;
        let db_type = target.schema.columns[pos].db_type;

        // Compute every new value first so a failing row leaves the table unchanged.
        let mut changes = Vec::new();
        for (idx, row) in target.rows.iter().enumerate() {
            let Some(text) = row[pos].as_text() else {
                continue;
            };
            let Some(updated) = apply_kind(command.kind, &text) else {
                continue;
            };
            let value = SqlValue::coerce(&updated, &db_type)
                .map_err(|msg| LoaderError::command(column, msg))?;
            if value != row[pos] {
                changes.push((idx, value));
            }
        }

        let changed = changes.len() as u64;
        for (idx, value) in changes {
            target.rows[idx][pos] = value;
        }
        Ok(changed)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut tables = self.tables.lock().await;
        for (name, table) in self.working {
            tables.insert(name, table);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// New text for a matching value, or `None` when the row is not updated.
fn apply_kind(kind: UpdateKind, text: &str) -> Option<String> {
    match kind {
        UpdateKind::NormalizeLeadingZero => {
            let trimmed = text.trim_matches(' ');
            (!trimmed.starts_with('0')).then(|| format!("0{}", trimmed))
        }
        UpdateKind::ZeroPadFixedWidth => {
            let len = text.chars().count();
            (len < UpdateKind::PAD_WIDTH)
                .then(|| format!("{}{}", "0".repeat(UpdateKind::PAD_WIDTH - len), text))
        }
    }
}

fn check_fits(value: &SqlValue, ty: &ConcreteType) -> std::result::Result<(), String> {
    match (value, ty) {
        (SqlValue::Text(s), ConcreteType::BoundedString(len))
            if s.chars().count() > *len as usize =>
        {
            Err(format!("data too long for {}", ty))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ResolvedColumn;

    fn schema(table: &str) -> TableSchema {
        TableSchema {
            table: table.to_string(),
            columns: vec![
                ResolvedColumn {
                    name: "id".to_string(),
                    db_type: ConcreteType::Int32,
                },
                ResolvedColumn {
                    name: "code".to_string(),
                    db_type: ConcreteType::BoundedString(8),
                },
            ],
        }
    }

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    async fn seeded(values: &[&str]) -> MemoryTarget {
        let target = MemoryTarget::new();
        target.create_table(&schema("t")).await.unwrap();
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let code = if v.is_empty() { SqlValue::Null } else { text(v) };
                vec![SqlValue::I32(i as i32), code]
            })
            .collect();
        target
            .write_batch("t", &schema("t").column_names(), Batch::new(rows))
            .await
            .unwrap();
        target
    }

    async fn codes(target: &MemoryTarget) -> Vec<SqlValue> {
        target
            .rows("t")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r[1].clone())
            .collect()
    }

    #[tokio::test]
    async fn test_create_existing_table_fails() {
        let target = MemoryTarget::new();
        target.create_table(&schema("t")).await.unwrap();
        assert!(target.create_table(&schema("t")).await.is_err());
    }

    #[tokio::test]
    async fn test_write_rejects_too_long_values() {
        let target = MemoryTarget::new();
        target.create_table(&schema("t")).await.unwrap();
        let batch = Batch::new(vec![vec![SqlValue::I32(1), text("123456789")]]);
        let err = target
            .write_batch("t", &schema("t").column_names(), batch)
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::Load { .. }));
    }

    #[tokio::test]
    async fn test_replace_table_moves_staging() {
        let target = seeded(&["a"]).await;
        target.create_table(&schema("t__staging")).await.unwrap();
        target.replace_table("t__staging", "t").await.unwrap();
        assert_eq!(target.table_names().await, vec!["t"]);
        assert_eq!(target.get_row_count("t").await.unwrap(), 0);
        assert_eq!(target.schema("t").await.unwrap().table, "t");
    }

    #[tokio::test]
    async fn test_normalize_counts_changed_rows_only() {
        let target = seeded(&["5551234", "0555", " 77 ", ""]).await;
        let mut tx = target.begin().await.unwrap();
        let cmd = UpdateCommand::new("code", UpdateKind::NormalizeLeadingZero);
        assert_eq!(tx.execute_update("t", &cmd).await.unwrap(), 2);
        tx.commit().await.unwrap();
        assert_eq!(
            codes(&target).await,
            vec![text("05551234"), text("0555"), text("077"), SqlValue::Null]
        );
    }

    #[tokio::test]
    async fn test_zero_pad() {
        let target = seeded(&["1234", "12345678"]).await;
        let mut tx = target.begin().await.unwrap();
        let cmd = UpdateCommand::new("code", UpdateKind::ZeroPadFixedWidth);
        assert_eq!(tx.execute_update("t", &cmd).await.unwrap(), 1);
        tx.commit().await.unwrap();
        assert_eq!(codes(&target).await, vec![text("00001234"), text("12345678")]);
    }

    #[tokio::test]
    async fn test_failed_update_changes_nothing() {
        let target = seeded(&["1", "12345678"]).await;
        let mut tx = target.begin().await.unwrap();
        let cmd = UpdateCommand::new("code", UpdateKind::NormalizeLeadingZero);
        let err = tx.execute_update("t", &cmd).await.unwrap_err();
        assert!(matches!(err, LoaderError::Command { .. }));
        tx.commit().await.unwrap();
        assert_eq!(codes(&target).await, vec![text("1"), text("12345678")]);
    }

    #[tokio::test]
    async fn test_rollback_discards_changes() {
        let target = seeded(&["1"]).await;
        let mut tx = target.begin().await.unwrap();
        let cmd = UpdateCommand::new("code", UpdateKind::ZeroPadFixedWidth);
        tx.execute_update("t", &cmd).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(codes(&target).await, vec![text("1")]);
    }

    #[tokio::test]
    async fn test_update_on_integer_column_recasts() {
        let target = seeded(&["x", "y"]).await;
        let mut tx = target.begin().await.unwrap();
        let cmd = UpdateCommand::new("id", UpdateKind::NormalizeLeadingZero);
        // 1 becomes "01", which is still 1 once stored as INT.
        assert_eq!(tx.execute_update("t", &cmd).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_column_is_a_command_error() {
        let target = seeded(&["x"]).await;
        let mut tx = target.begin().await.unwrap();
        let cmd = UpdateCommand::new("missing", UpdateKind::ZeroPadFixedWidth);
        assert!(matches!(
            tx.execute_update("t", &cmd).await,
            Err(LoaderError::Command { .. })
        ));
    }
}
