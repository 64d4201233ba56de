//! Core abstractions shared by the loader components.
//!
//! - [`schema`]: column configuration, concrete types and update commands
//! - [`value`]: typed cell values and text coercion
//! - [`identifier`]: identifier validation and quoting
//! - [`traits`]: destination writer and transaction traits

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{
    ColumnSpec, ConcreteType, LogicalType, ResolvedColumn, TableSchema, UpdateCommand,
    UpdateDirective, UpdateKind,
};
pub use traits::{TargetTransaction, TargetWriter};
pub use value::{Batch, Sample, SqlValue};
