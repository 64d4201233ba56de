//! MySQL/MariaDB target writer implementation.
//!
//! Implements [`TargetWriter`] on top of a mysql_async pool. Inserts use
//! batched multi-row INSERT statements; the update pipeline runs on a
//! pool-owned transaction.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{
    Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, Row, SslOpts, Transaction, TxOpts,
};
use tracing::{debug, info, warn};

use crate::config::TargetConfig;
use crate::core::identifier::derived_name;
use crate::core::schema::{TableSchema, UpdateCommand};
use crate::core::traits::{TargetTransaction, TargetWriter};
use crate::core::value::{Batch, Sample, SqlValue};
use crate::error::{LoaderError, Result};

use super::dialect::MysqlDialect;

/// Connections kept by the pool: one for loading, one spare for reads.
const MAX_CONNECTIONS: usize = 2;

/// MySQL target writer using mysql_async.
pub struct MysqlWriter {
    pool: Pool,
    dialect: MysqlDialect,
    batch_size: usize,
}

impl MysqlWriter {
    /// Create a new MySQL writer and test the connection.
    pub async fn new(config: &TargetConfig, batch_size: usize) -> Result<Self> {
        config.validate()?;

        let ssl_opts = match config.ssl_mode.to_lowercase().as_str() {
            "disable" => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                None
            }
            "prefer" | "require" => {
                Some(SslOpts::default().with_danger_accept_invalid_certs(true))
            }
            "verify-ca" | "verify_ca" | "verify-full" | "verify_identity" => {
                Some(SslOpts::default())
            }
            _ => {
                warn!(
                    "Unknown ssl_mode '{}', defaulting to prefer",
                    config.ssl_mode
                );
                Some(SslOpts::default().with_danger_accept_invalid_certs(true))
            }
        };

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .db_name(Some(config.database_name.clone()))
            .user(Some(config.username.clone()))
            .pass(Some(config.password.clone()))
            .init(vec!["SET NAMES utf8mb4"]);

        if let Some(ssl) = ssl_opts {
            builder = builder.ssl_opts(ssl);
        }

        let constraints = PoolConstraints::new(1, MAX_CONNECTIONS).ok_or_else(|| {
            LoaderError::Config("invalid MySQL pool constraints".to_string())
        })?;
        let opts: Opts = builder
            .pool_opts(PoolOpts::new().with_constraints(constraints))
            .into();
        let pool = Pool::new(opts);

        let mut conn = pool
            .get_conn()
            .await
            .map_err(|e| LoaderError::connection(e, "connecting to MySQL"))?;
        conn.query_drop("SELECT 1")
            .await
            .map_err(|e| LoaderError::connection(e, "testing MySQL connection"))?;
        drop(conn);

        info!("Connected to {}", config.redacted_url());

        Ok(Self {
            pool,
            dialect: MysqlDialect::new(),
            batch_size,
        })
    }

    async fn conn(&self, context: &str) -> Result<Conn> {
        self.pool
            .get_conn()
            .await
            .map_err(|e| LoaderError::connection(e, context))
    }
}

#[async_trait]
impl TargetWriter for MysqlWriter {
    async fn drop_table(&self, table: &str) -> Result<()> {
        let sql = self.dialect.drop_table(table)?;
        let mut conn = self.conn("getting MySQL connection").await?;
        conn.query_drop(&sql).await?;
        debug!("Dropped table {}", table);
        Ok(())
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        let ddl = self.dialect.create_table(schema)?;
        let mut conn = self.conn("getting MySQL connection").await?;
        debug!("DDL: {}", ddl);
        conn.query_drop(&ddl).await?;
        debug!("Created table {}", schema.table);
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let mut conn = self.conn("getting MySQL connection").await?;

        let sql = r#"
            SELECT COUNT(*) AS cnt FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
        "#;

        let count: Option<i64> = conn.exec_first(sql, (table,)).await?;
        Ok(count.unwrap_or(0) > 0)
    }

    async fn write_batch(&self, table: &str, cols: &[String], batch: Batch) -> Result<u64> {
        let rows = batch.rows;
        if rows.is_empty() || cols.is_empty() {
            return Ok(0);
        }

        let row_count = rows.len() as u64;
        let mut conn = self.conn("getting MySQL connection").await?;
        let max_rows = self.dialect.max_rows_per_insert(cols.len(), self.batch_size);

        for chunk in rows.chunks(max_rows) {
            let sql = self.dialect.insert(table, cols, chunk.len())?;
            let params: Vec<mysql_async::Value> = chunk
                .iter()
                .flat_map(|row| row.iter().map(sql_value_to_mysql))
                .collect();

            conn.exec_drop(&sql, params)
                .await
                .map_err(|e| LoaderError::load(table, format!("INSERT batch: {}", e)))?;
        }

        debug!("MySQL: wrote {} rows to {}", row_count, table);
        Ok(row_count)
    }

    async fn replace_table(&self, staging: &str, table: &str) -> Result<()> {
        let exists = self.table_exists(table).await?;
        let mut conn = self.conn("getting MySQL connection").await?;

        if exists {
            let old = derived_name(table, "__old");
            conn.query_drop(self.dialect.drop_table(&old)?).await?;
            conn.query_drop(self.dialect.swap_tables(staging, table, &old)?)
                .await?;
            conn.query_drop(self.dialect.drop_table(&old)?).await?;
            debug!("Replaced existing table {} with {}", table, staging);
        } else {
            conn.query_drop(self.dialect.rename_table(staging, table)?)
                .await?;
            debug!("Renamed {} to {}", staging, table);
        }
        Ok(())
    }

    async fn get_row_count(&self, table: &str) -> Result<i64> {
        let sql = self.dialect.row_count(table)?;
        let mut conn = self.conn("getting MySQL connection").await?;
        let count: Option<i64> = conn.query_first(&sql).await?;
        Ok(count.unwrap_or(0))
    }

    async fn begin(&self) -> Result<Box<dyn TargetTransaction>> {
        let tx = self
            .pool
            .start_transaction(TxOpts::default())
            .await
            .map_err(|e| LoaderError::Transaction(format!("starting transaction: {}", e)))?;
        Ok(Box::new(MysqlTransaction {
            tx,
            dialect: self.dialect,
        }))
    }

    async fn fetch_sample(&self, table: &str, limit: usize) -> Result<Sample> {
        let sql = self.dialect.select_sample(table, limit)?;
        let mut conn = self.conn("getting MySQL connection").await?;

        let mut result = conn.query_iter(sql).await?;
        let columns: Vec<String> = result
            .columns_ref()
            .iter()
            .map(|c| c.name_str().into_owned())
            .collect();
        let rows: Vec<Row> = result.collect().await?;
        drop(result);

        let rows = rows
            .into_iter()
            .map(|row| Row::unwrap(row).into_iter().map(mysql_to_sql_value).collect())
            .collect();

        Ok(Sample { columns, rows })
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn("testing MySQL connection").await?;
        conn.query_drop("SELECT 1")
            .await
            .map_err(|e| LoaderError::connection(e, "testing MySQL connection"))?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "mysql"
    }

    async fn close(&self) {
        self.pool.clone().disconnect().await.ok();
    }
}

/// Transform transaction on a pooled MySQL connection.
struct MysqlTransaction {
    tx: Transaction<'static>,
    dialect: MysqlDialect,
}

#[async_trait]
impl TargetTransaction for MysqlTransaction {
    async fn execute_update(&mut self, table: &str, command: &UpdateCommand) -> Result<u64> {
        let sql = self.dialect.update(table, command)?;
        debug!("Executing: {}", sql);
        self.tx
            .query_drop(&sql)
            .await
            .map_err(|e| LoaderError::command(&command.target_column, e))?;
        Ok(self.tx.affected_rows())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| LoaderError::Transaction(format!("commit: {}", e)))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| LoaderError::Transaction(format!("rollback: {}", e)))
    }
}

/// Convert SqlValue to mysql_async::Value.
fn sql_value_to_mysql(value: &SqlValue) -> mysql_async::Value {
    match value {
        SqlValue::Null => mysql_async::Value::NULL,
        SqlValue::Bool(b) => mysql_async::Value::from(*b),
        SqlValue::I32(i) => mysql_async::Value::from(*i),
        SqlValue::I64(i) => mysql_async::Value::from(*i),
        SqlValue::F64(f) => mysql_async::Value::from(*f),
        SqlValue::Text(s) => mysql_async::Value::from(s.as_str()),
        // Decimal and temporal values travel as canonical text
        other => mysql_async::Value::from(other.to_string()),
    }
}

/// Convert a value read back from MySQL.
fn mysql_to_sql_value(value: mysql_async::Value) -> SqlValue {
    use mysql_async::Value;

    match value {
        Value::NULL => SqlValue::Null,
        Value::Bytes(bytes) => SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Int(i) => SqlValue::I64(i),
        Value::UInt(u) => i64::try_from(u)
            .map(SqlValue::I64)
            .unwrap_or_else(|_| SqlValue::Text(u.to_string())),
        Value::Float(f) => SqlValue::F64(f64::from(f)),
        Value::Double(d) => SqlValue::F64(d),
        Value::Date(y, m, d, h, mi, s, us) => SqlValue::Text(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
            y, m, d, h, mi, s, us
        )),
        Value::Time(neg, days, h, m, s, us) => SqlValue::Text(format!(
            "{}{}:{:02}:{:02}.{:06}",
            if neg { "-" } else { "" },
            u32::from(h) + days * 24,
            m,
            s,
            us
        )),
    }
}
