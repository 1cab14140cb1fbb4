//! Error taxonomy for the gateway.
//!
//! The gateway never substitutes a partial or guessed value for a failure;
//! every error propagates with enough structure for the presentation layer
//! to render a precise message. The two documented exceptions (the optional
//! table row count and best-effort execution statistics) degrade to
//! "unavailable" instead of producing an error at all.

use thiserror::Error;

/// Errors produced by the executor, the schema resolver, and the accessor.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Query rejected by the read-only gatekeeper. Caller-correctable,
    /// never retried.
    #[error("query rejected: {reason}")]
    PolicyViolation { reason: String },

    /// The requested (schema, table) pair does not exist.
    #[error("no table or view named {schema}.{table}")]
    NotFound { schema: String, table: String },

    /// Connectivity, authentication, or engine-side failure reported by the
    /// catalog accessor. Surfaced verbatim with elapsed time attached.
    #[error("database error after {elapsed_ms}ms: {message}")]
    Database { message: String, elapsed_ms: u64 },

    /// A catalog round-trip exceeded its bound. Reported like a database
    /// failure but distinguishable so callers can retry with a larger bound.
    #[error("query timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The catalog returned contradictory metadata (an index or foreign key
    /// references a column absent from the column list). Always fatal to the
    /// request, never silently repaired.
    #[error("inconsistent catalog metadata for {schema}.{table}: {detail}")]
    SchemaInconsistency {
        schema: String,
        table: String,
        detail: String,
    },
}

impl GatewayError {
    /// Create a database error with no timing attached yet.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            elapsed_ms: 0,
        }
    }

    /// Attach measured elapsed time to a database or timeout error.
    /// Other kinds pass through unchanged.
    pub fn with_elapsed(self, elapsed_ms: u64) -> Self {
        match self {
            Self::Database { message, .. } => Self::Database {
                message,
                elapsed_ms,
            },
            Self::Timeout { .. } => Self::Timeout { elapsed_ms },
            other => other,
        }
    }

    /// Short machine-readable label for the error kind, used by the
    /// presentation layer.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PolicyViolation { .. } => "policy_violation",
            Self::NotFound { .. } => "not_found",
            Self::Database { .. } => "database_error",
            Self::Timeout { .. } => "timeout",
            Self::SchemaInconsistency { .. } => "schema_inconsistency",
        }
    }
}
