use clap::{Args, Parser, Subcommand};
use sqlward_adapter_mssql::{MssqlAccessor, MssqlConfig};
use sqlward_engine::executor::QueryExecutor;
use sqlward_engine::resolver::SchemaResolver;
use sqlward_mcp::McpServer;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "sqlward", version, about = "Read-only SQL Server gateway")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// SQL Server host
    #[arg(long, env = "SQLWARD_HOST", default_value = "localhost")]
    host: String,

    /// SQL Server port
    #[arg(long, env = "SQLWARD_PORT", default_value_t = 1433)]
    port: u16,

    /// Target database
    #[arg(long, env = "SQLWARD_DATABASE", default_value = "master")]
    database: String,

    /// Login user
    #[arg(long, env = "SQLWARD_USER", default_value = "sa")]
    user: String,

    /// Login password
    #[arg(long, env = "SQLWARD_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Trust the server certificate (development only)
    #[arg(long, env = "SQLWARD_TRUST_CERT", default_value_t = false)]
    trust_cert: bool,

    /// Per-query timeout in seconds
    #[arg(long, env = "SQLWARD_QUERY_TIMEOUT_SECS", default_value_t = 30)]
    query_timeout_secs: u64,
}

impl ConnectionArgs {
    fn into_config(self) -> MssqlConfig {
        MssqlConfig {
            host: self.host,
            port: self.port,
            database: self.database,
            user: self.user,
            password: self.password,
            trust_cert: self.trust_cert,
            query_timeout: Duration::from_secs(self.query_timeout_secs),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server on stdio
    Serve,

    /// List user tables and views
    Tables {
        /// Case-insensitive substring filter on schema.name
        #[arg(long)]
        search: Option<String>,
    },

    /// Describe one table or view
    Describe {
        /// Schema name, e.g. dbo
        schema: String,
        /// Table or view name
        table: String,
    },

    /// Run a read-only query and print the rows as JSON
    Query {
        sql: String,
        /// Maximum rows to return (1-1000)
        #[arg(long, default_value_t = 100)]
        row_cap: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr: in serve mode stdout is the MCP transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let accessor: Arc<MssqlAccessor> =
        Arc::new(MssqlAccessor::new(cli.connection.into_config()));

    match cli.cmd {
        Command::Serve => {
            let server = McpServer::new(accessor);
            server.run_stdio().await?;
        }
        Command::Tables { search } => {
            let resolver = SchemaResolver::new(accessor);
            let mut tables = resolver.list_tables().await?;
            if let Some(needle) = search {
                let needle = needle.to_lowercase();
                tables.retain(|t| {
                    format!("{}.{}", t.schema_name, t.table_name)
                        .to_lowercase()
                        .contains(&needle)
                });
            }
            println!("{}", serde_json::to_string_pretty(&tables)?);
        }
        Command::Describe { schema, table } => {
            let resolver = SchemaResolver::new(accessor);
            let table_schema = resolver.get_table_schema(&schema, &table).await?;
            println!("{}", serde_json::to_string_pretty(&table_schema)?);
        }
        Command::Query { sql, row_cap } => {
            let executor = QueryExecutor::new(accessor);
            let result = executor.execute(&sql, row_cap).await?;
            tracing::info!(
                rows = result.row_count,
                elapsed_ms = result.execution_time_ms,
                "query completed"
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
