//! Execution engine for the Sqlward gateway.
//!
//! Three pieces live here:
//!
//! - [`accessor::CatalogAccessor`] - the narrow seam to the component that
//!   performs the actual SQL round-trips.
//! - [`executor::QueryExecutor`] - applies the gatekeeper's verdict,
//!   dispatches approved text, and packages results with timing.
//! - [`resolver::SchemaResolver`] - assembles normalized schema snapshots
//!   from catalog primitives.
//!
//! The engine owns no threads and performs no background work; every public
//! operation is a single unit of work with no shared mutable state between
//! calls.

pub mod accessor;
pub mod executor;
pub mod resolver;

pub use accessor::{CatalogAccessor, RawResultSet};
pub use executor::QueryExecutor;
pub use resolver::SchemaResolver;

#[cfg(test)]
pub(crate) mod test_support;
