//! SQL Server catalog accessor.
//!
//! Implements [`CatalogAccessor`] over a single TDS session. Connection is
//! lazy (opened on first use), every round-trip is bounded by the configured
//! timeout, and a session that times out mid-flight is discarded rather than
//! reused, so no session-level flag can leak into later queries.

use async_trait::async_trait;
use sqlward_core::GatewayError;
use sqlward_engine::accessor::{CatalogAccessor, RawResultSet};
use std::time::{Duration, Instant};
use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

mod convert;

use convert::convert_results;

type TdsClient = Client<Compat<TcpStream>>;

/// Connection settings for one target database.
#[derive(Debug, Clone)]
pub struct MssqlConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub trust_cert: bool,
    /// Bound applied to every catalog round-trip.
    pub query_timeout: Duration,
}

impl Default for MssqlConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1433,
            database: "master".to_string(),
            user: "sa".to_string(),
            password: String::new(),
            trust_cert: false,
            query_timeout: Duration::from_secs(30),
        }
    }
}

/// Catalog accessor backed by one pooled-less TDS session. Calls are
/// serialized on the session; concurrent callers queue on the lock.
pub struct MssqlAccessor {
    config: MssqlConfig,
    client: Mutex<Option<TdsClient>>,
}

impl MssqlAccessor {
    pub fn new(config: MssqlConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    async fn open_client(&self) -> Result<TdsClient, GatewayError> {
        let mut tds = Config::new();
        tds.host(&self.config.host);
        tds.port(self.config.port);
        tds.database(&self.config.database);
        tds.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));
        if self.config.trust_cert {
            tds.trust_cert();
        }

        let tcp = TcpStream::connect(tds.get_addr())
            .await
            .map_err(|e| GatewayError::database(format!("tcp connect failed: {}", e)))?;
        tcp.set_nodelay(true)
            .map_err(|e| GatewayError::database(format!("tcp setup failed: {}", e)))?;

        let client = Client::connect(tds, tcp.compat_write())
            .await
            .map_err(tds_err)?;
        tracing::info!(
            host = %self.config.host,
            database = %self.config.database,
            "connected to SQL Server"
        );
        Ok(client)
    }
}

fn tds_err(err: tiberius::error::Error) -> GatewayError {
    GatewayError::database(err.to_string())
}

/// Run one statement with the round-trip bound applied. On timeout the
/// caller must discard the session: an abandoned TDS round-trip leaves the
/// connection in an unknown state.
async fn run_statement(
    client: &mut TdsClient,
    sql: &str,
    bound: Duration,
) -> Result<Vec<RawResultSet>, GatewayError> {
    let started = Instant::now();
    let work = async {
        let stream = client.simple_query(sql).await.map_err(tds_err)?;
        let sets = stream.into_results().await.map_err(tds_err)?;
        convert_results(sets)
    };
    match tokio::time::timeout(bound, work).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout {
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[async_trait]
impl CatalogAccessor for MssqlAccessor {
    async fn run_query(&self, text: &str) -> Result<RawResultSet, GatewayError> {
        let mut guard = self.client.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_client().await?);
        }
        let client = guard
            .as_mut()
            .ok_or_else(|| GatewayError::database("no active connection"))?;

        let result = run_statement(client, text, self.config.query_timeout).await;
        if matches!(result, Err(GatewayError::Timeout { .. })) {
            *guard = None;
        }
        result.map(|sets| sets.into_iter().next().unwrap_or_default())
    }

    async fn run_scoped(
        &self,
        on_sql: &str,
        query: &str,
        off_sql: &str,
    ) -> Result<Vec<RawResultSet>, GatewayError> {
        let mut guard = self.client.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_client().await?);
        }
        let client = guard
            .as_mut()
            .ok_or_else(|| GatewayError::database("no active connection"))?;
        let bound = self.config.query_timeout;

        if let Err(err) = run_statement(client, on_sql, bound).await {
            if matches!(err, GatewayError::Timeout { .. }) {
                *guard = None;
            }
            return Err(err);
        }

        let result = run_statement(client, query, bound).await;

        // Release the session flag on every exit path. A timed-out session
        // is discarded outright, which clears its flags with it.
        let mut poisoned = matches!(result, Err(GatewayError::Timeout { .. }));
        if !poisoned {
            if let Err(err) = run_statement(client, off_sql, bound).await {
                tracing::warn!(error = %err, "failed to clear session flag, discarding session");
                poisoned = true;
            }
        }
        if poisoned {
            *guard = None;
        }
        result
    }

    async fn is_connected(&self) -> bool {
        self.client.lock().await.is_some()
    }

    async fn connect(&self) -> Result<(), GatewayError> {
        let mut guard = self.client.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_client().await?);
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), GatewayError> {
        let mut guard = self.client.lock().await;
        if let Some(client) = guard.take() {
            if let Err(err) = client.close().await {
                tracing::warn!(error = %err, "error while closing connection");
            }
        }
        Ok(())
    }
}
