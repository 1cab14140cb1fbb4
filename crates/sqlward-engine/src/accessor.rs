//! The catalog accessor seam.
//!
//! The engine is handed an already-configured accessor and never assumes
//! connectivity: every operation calls [`CatalogAccessor::ensure_connected`]
//! first and treats "not connected" as an ordinary database error from the
//! accessor. Pooling, sequencing, and retry policy are the accessor's
//! concern, not the engine's.

use async_trait::async_trait;
use sqlward_core::GatewayError;

/// One raw result set: ordered column names plus positional rows.
#[derive(Debug, Clone, Default)]
pub struct RawResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Performs SQL round-trips against the live engine.
#[async_trait]
pub trait CatalogAccessor: Send + Sync {
    /// Run a statement and return its first result set.
    async fn run_query(&self, text: &str) -> Result<RawResultSet, GatewayError>;

    /// Run `query` between two session-level SET statements on a single
    /// session, in that exact order. Implementations must guarantee the
    /// `off_sql` step on every exit path - success, error, or timeout - or
    /// discard the session entirely so the flag cannot leak into later
    /// queries. Returns every result set the inner query produced.
    async fn run_scoped(
        &self,
        on_sql: &str,
        query: &str,
        off_sql: &str,
    ) -> Result<Vec<RawResultSet>, GatewayError>;

    async fn is_connected(&self) -> bool;

    async fn connect(&self) -> Result<(), GatewayError>;

    async fn disconnect(&self) -> Result<(), GatewayError>;

    /// Connect lazily on first use.
    async fn ensure_connected(&self) -> Result<(), GatewayError> {
        if !self.is_connected().await {
            self.connect().await?;
        }
        Ok(())
    }
}
