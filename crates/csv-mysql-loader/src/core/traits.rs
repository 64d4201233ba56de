//! Core traits for destination-agnostic loading.
//!
//! - [`TargetWriter`]: creates, fills, replaces and reads destination tables
//! - [`TargetTransaction`]: runs update commands inside one transaction
//!
//! The loader, pipeline and verification reader only talk to these traits,
//! so the same control flow drives a MySQL server or the in-memory target.

use async_trait::async_trait;

use crate::error::Result;

use super::schema::{TableSchema, UpdateCommand};
use super::value::{Batch, Sample};

/// Write schema and data to a destination store.
#[async_trait]
pub trait TargetWriter: Send + Sync {
    /// Drop a table if it exists.
    async fn drop_table(&self, table: &str) -> Result<()>;

    /// Create `schema.table` with the schema's columns, in order.
    ///
    /// Fails if the table already exists.
    async fn create_table(&self, schema: &TableSchema) -> Result<()>;

    /// Check if a table exists.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Insert a batch of rows aligned with `cols`.
    async fn write_batch(&self, table: &str, cols: &[String], batch: Batch) -> Result<u64>;

    /// Replace `table` with `staging` so that readers see either the old
    /// table or the fully loaded new one. `staging` no longer exists afterwards.
    async fn replace_table(&self, staging: &str, table: &str) -> Result<()>;

    /// Get the row count for a table.
    async fn get_row_count(&self, table: &str) -> Result<i64>;

    /// Open a transaction on a single connection.
    async fn begin(&self) -> Result<Box<dyn TargetTransaction>>;

    /// Read up to `limit` rows of a table.
    async fn fetch_sample(&self, table: &str, limit: usize) -> Result<Sample>;

    /// Round-trip a trivial query to check the destination is reachable.
    async fn ping(&self) -> Result<()>;

    /// Get the database type identifier (e.g., "mysql", "memory").
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}

/// An open transaction.
///
/// Dropping a transaction without committing discards its changes.
#[async_trait]
pub trait TargetTransaction: Send {
    /// Run one update command and return the number of rows it changed.
    async fn execute_update(&mut self, table: &str, command: &UpdateCommand) -> Result<u64>;

    /// Commit all changes made in this transaction.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard all changes made in this transaction.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
