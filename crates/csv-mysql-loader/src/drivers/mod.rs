//! Target driver implementations.
//!
//! - [`mysql`]: MySQL/MariaDB server through mysql_async
//! - [`memory`]: in-process tables for dry runs and tests
//!
//! Both implement [`TargetWriter`](crate::core::traits::TargetWriter), so the
//! loader, pipeline and verification reader run unchanged against either.

pub mod memory;
pub mod mysql;

pub use memory::MemoryTarget;
pub use mysql::{MysqlDialect, MysqlWriter};
