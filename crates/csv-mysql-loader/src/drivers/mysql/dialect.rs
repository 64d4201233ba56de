//! MySQL SQL text generation.
//!
//! Every statement the MySQL writer sends is built here so the SQL can be
//! shown by `plan` and unit tested without a server.

use crate::core::identifier::quote_mysql;
use crate::core::schema::{TableSchema, UpdateCommand, UpdateKind};
use crate::error::Result;

/// MySQL max placeholders per prepared statement.
pub const MYSQL_MAX_PLACEHOLDERS: usize = 65535;

/// MySQL/MariaDB dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    pub fn new() -> Self {
        Self
    }

    /// CREATE TABLE statement with columns in schema order, all nullable.
    pub fn create_table(&self, schema: &TableSchema) -> Result<String> {
        let col_defs = schema
            .columns
            .iter()
            .map(|c| Ok(format!("{} {}", quote_mysql(&c.name)?, c.db_type)))
            .collect::<Result<Vec<_>>>()?;

        Ok(format!(
            "CREATE TABLE {} (\n    {}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci",
            quote_mysql(&schema.table)?,
            col_defs.join(",\n    ")
        ))
    }

    pub fn drop_table(&self, table: &str) -> Result<String> {
        Ok(format!("DROP TABLE IF EXISTS {}", quote_mysql(table)?))
    }

    /// Multi-row INSERT with `rows` placeholder groups.
    pub fn insert(&self, table: &str, cols: &[String], rows: usize) -> Result<String> {
        let col_list = cols
            .iter()
            .map(|c| quote_mysql(c))
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let placeholders_per_row = format!("({})", vec!["?"; cols.len()].join(", "));
        let all_placeholders = vec![placeholders_per_row; rows].join(", ");

        Ok(format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_mysql(table)?,
            col_list,
            all_placeholders
        ))
    }

    /// Rows per INSERT so that placeholders stay under the server limit.
    pub fn max_rows_per_insert(&self, num_cols: usize, batch_size: usize) -> usize {
        if num_cols == 0 {
            return batch_size.max(1);
        }
        (MYSQL_MAX_PLACEHOLDERS / num_cols).clamp(1, batch_size.max(1))
    }

    /// Atomic swap of `staging` into `table`, moving an existing table to `old`.
    pub fn swap_tables(&self, staging: &str, table: &str, old: &str) -> Result<String> {
        Ok(format!(
            "RENAME TABLE {table} TO {old}, {staging} TO {table}",
            table = quote_mysql(table)?,
            old = quote_mysql(old)?,
            staging = quote_mysql(staging)?,
        ))
    }

    pub fn rename_table(&self, from: &str, to: &str) -> Result<String> {
        Ok(format!(
            "RENAME TABLE {} TO {}",
            quote_mysql(from)?,
            quote_mysql(to)?
        ))
    }

    pub fn row_count(&self, table: &str) -> Result<String> {
        Ok(format!("SELECT COUNT(*) AS cnt FROM {}", quote_mysql(table)?))
    }

    pub fn select_sample(&self, table: &str, limit: usize) -> Result<String> {
        Ok(format!("SELECT * FROM {} LIMIT {}", quote_mysql(table)?, limit))
    }

    /// UPDATE statement implementing an update command.
    pub fn update(&self, table: &str, command: &UpdateCommand) -> Result<String> {
        let table = quote_mysql(table)?;
        let col = quote_mysql(&command.target_column)?;

        Ok(match command.kind {
            UpdateKind::NormalizeLeadingZero => format!(
                "UPDATE {table} SET {col} = CONCAT('0', TRIM({col})) WHERE TRIM({col}) NOT LIKE '0%'"
            ),
            // The length guard stops LPAD from truncating longer values.
            UpdateKind::ZeroPadFixedWidth => format!(
                "UPDATE {table} SET {col} = LPAD({col}, {width}, '0') \
                 WHERE {col} IS NOT NULL AND CHAR_LENGTH({col}) < {width}",
                width = UpdateKind::PAD_WIDTH
            ),
        })
    }
}
