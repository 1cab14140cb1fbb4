//! Shared mock accessor for engine tests.

use crate::accessor::{CatalogAccessor, RawResultSet};
use async_trait::async_trait;
use sqlward_core::GatewayError;
use std::sync::Mutex;

/// Build a result set from column names and positional rows.
pub fn result_set(columns: &[&str], rows: Vec<Vec<serde_json::Value>>) -> RawResultSet {
    RawResultSet {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

/// Scripted accessor: responses are matched by substring against the
/// incoming statement text, first match wins. Every statement is recorded
/// so tests can assert on ordering and short-circuits.
pub struct MockAccessor {
    responses: Vec<(String, Result<RawResultSet, GatewayError>)>,
    queries: Mutex<Vec<String>>,
    connected: Mutex<bool>,
}

impl MockAccessor {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            queries: Mutex::new(Vec::new()),
            connected: Mutex::new(false),
        }
    }

    /// Script a response for statements containing `marker`.
    pub fn on(mut self, marker: &str, result: Result<RawResultSet, GatewayError>) -> Self {
        self.responses.push((marker.to_string(), result));
        self
    }

    /// Every statement text seen so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("queries lock").clone()
    }

    fn record(&self, text: &str) {
        self.queries.lock().expect("queries lock").push(text.to_string());
    }

    fn lookup(&self, text: &str) -> Result<RawResultSet, GatewayError> {
        for (marker, result) in &self.responses {
            if text.contains(marker.as_str()) {
                return result.clone();
            }
        }
        Err(GatewayError::database(format!("unscripted query: {}", text)))
    }
}

#[async_trait]
impl CatalogAccessor for MockAccessor {
    async fn run_query(&self, text: &str) -> Result<RawResultSet, GatewayError> {
        self.record(text);
        self.lookup(text)
    }

    async fn run_scoped(
        &self,
        on_sql: &str,
        query: &str,
        off_sql: &str,
    ) -> Result<Vec<RawResultSet>, GatewayError> {
        self.record(on_sql);
        self.record(query);
        let result = self.lookup(query);
        self.record(off_sql);
        result.map(|set| vec![set])
    }

    async fn is_connected(&self) -> bool {
        *self.connected.lock().expect("connected lock")
    }

    async fn connect(&self) -> Result<(), GatewayError> {
        *self.connected.lock().expect("connected lock") = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), GatewayError> {
        *self.connected.lock().expect("connected lock") = false;
        Ok(())
    }
}
