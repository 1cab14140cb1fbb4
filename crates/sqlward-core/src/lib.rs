//! Shared data model for the Sqlward gateway.
//!
//! Every type in this crate is a per-request read-model snapshot: built
//! fresh from the live catalog, immutable once constructed, and discarded
//! when the response has been produced. There is no cache.

pub mod error;
pub mod query;
pub mod schema;

pub use error::GatewayError;
pub use query::{ExecutionStats, PlanRow, QueryResult, QueryVerdict};
pub use schema::{
    ColumnDescriptor, ForeignKeyDescriptor, IndexDescriptor, TableKind, TableRef, TableSchema,
};
