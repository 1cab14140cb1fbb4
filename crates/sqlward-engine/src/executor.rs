//! The query executor.
//!
//! Turns an approved query into a result set or a reported failure, with
//! timing. The gatekeeper runs first on every path; a rejected query never
//! reaches the database.

use crate::accessor::{CatalogAccessor, RawResultSet};
use sqlward_core::{ExecutionStats, GatewayError, PlanRow, QueryResult};
use sqlward_policy::{ReadOnlyGatekeeper, MAX_ROW_CAP};
use std::sync::Arc;
use std::time::Instant;

const SHOWPLAN_ON: &str = "SET SHOWPLAN_ALL ON";
const SHOWPLAN_OFF: &str = "SET SHOWPLAN_ALL OFF";
const STATISTICS_ON: &str = "SET STATISTICS IO ON; SET STATISTICS TIME ON";
const STATISTICS_OFF: &str = "SET STATISTICS IO OFF; SET STATISTICS TIME OFF";

pub struct QueryExecutor {
    accessor: Arc<dyn CatalogAccessor>,
    gatekeeper: ReadOnlyGatekeeper,
}

impl QueryExecutor {
    pub fn new(accessor: Arc<dyn CatalogAccessor>) -> Self {
        Self {
            accessor,
            gatekeeper: ReadOnlyGatekeeper::new(),
        }
    }

    /// Execute a bounded read query.
    ///
    /// `execution_time_ms` is populated on both success and failure paths so
    /// that slow rejected-after-partial-execution cases stay diagnosable.
    pub async fn execute(
        &self,
        query_text: &str,
        max_rows: u32,
    ) -> Result<QueryResult, GatewayError> {
        let text = self.approve(query_text, max_rows)?;
        self.accessor.ensure_connected().await?;

        let started = Instant::now();
        match self.accessor.run_query(&text).await {
            Ok(raw) => {
                let execution_time_ms = elapsed_ms(started);
                tracing::debug!(
                    rows = raw.rows.len(),
                    elapsed_ms = execution_time_ms,
                    "query executed"
                );
                Ok(into_query_result(raw, execution_time_ms))
            }
            Err(err) => Err(err.with_elapsed(elapsed_ms(started))),
        }
    }

    /// Produce the estimated execution plan for a query.
    ///
    /// Explain requests go through the same read-only gate as execution;
    /// the plan-capture session flag is scoped by the accessor so it is
    /// cleared on every exit path.
    pub async fn explain(&self, query_text: &str) -> Result<Vec<PlanRow>, GatewayError> {
        let text = self.approve(query_text, MAX_ROW_CAP)?;
        self.accessor.ensure_connected().await?;

        let started = Instant::now();
        match self
            .accessor
            .run_scoped(SHOWPLAN_ON, &text, SHOWPLAN_OFF)
            .await
        {
            Ok(sets) => Ok(sets
                .into_iter()
                .find(|set| !set.rows.is_empty())
                .map(|set| into_query_result(set, 0).rows)
                .unwrap_or_default()),
            Err(err) => Err(err.with_elapsed(elapsed_ms(started))),
        }
    }

    /// Run a query with engine statistics enabled.
    ///
    /// Only `elapsed_time_ms` is measured directly. The engine reports IO
    /// and CPU statistics on its informational message channel, which the
    /// accessor cannot capture, so those fields read zero ("not available").
    pub async fn statistics(&self, query_text: &str) -> Result<ExecutionStats, GatewayError> {
        let text = self.approve(query_text, MAX_ROW_CAP)?;
        self.accessor.ensure_connected().await?;

        let started = Instant::now();
        match self
            .accessor
            .run_scoped(STATISTICS_ON, &text, STATISTICS_OFF)
            .await
        {
            Ok(_) => Ok(ExecutionStats {
                elapsed_time_ms: elapsed_ms(started),
                ..ExecutionStats::default()
            }),
            Err(err) => Err(err.with_elapsed(elapsed_ms(started))),
        }
    }

    fn approve(&self, query_text: &str, max_rows: u32) -> Result<String, GatewayError> {
        let verdict = self.gatekeeper.evaluate(query_text, max_rows);
        if !verdict.allowed {
            return Err(GatewayError::PolicyViolation {
                reason: verdict
                    .reason
                    .unwrap_or_else(|| "query rejected by policy".to_string()),
            });
        }
        if verdict.contains_comments {
            tracing::debug!("approved query contains comments");
        }
        Ok(verdict.rewritten_text)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn into_query_result(raw: RawResultSet, execution_time_ms: u64) -> QueryResult {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = raw
        .rows
        .into_iter()
        .map(|row| raw.columns.iter().cloned().zip(row).collect())
        .collect();
    QueryResult {
        row_count: rows.len(),
        columns: raw.columns,
        rows,
        execution_time_ms,
    }
}
