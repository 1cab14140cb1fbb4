//! MCP server implementation.
//!
//! Dispatches JSON-RPC requests from stdio to the gateway's four tools.
//! Gateway failures (policy rejections, database errors, timeouts) are
//! reported as tool results with `isError: true`; only malformed requests
//! produce JSON-RPC level errors.

use crate::error::McpError;
use crate::protocol::*;
use crate::tools;
use serde_json::{Value, json};
use sqlward_core::GatewayError;
use sqlward_engine::accessor::CatalogAccessor;
use sqlward_engine::executor::QueryExecutor;
use sqlward_engine::resolver::SchemaResolver;
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Row cap applied to `read_data` calls that do not request one.
const DEFAULT_ROW_CAP: u32 = 100;

/// The MCP server.
pub struct McpServer {
    executor: QueryExecutor,
    resolver: SchemaResolver,
    default_row_cap: u32,
}

impl McpServer {
    /// Create a server on top of one catalog accessor. The executor and
    /// resolver share the accessor's single session.
    pub fn new(accessor: Arc<dyn CatalogAccessor>) -> Self {
        Self {
            executor: QueryExecutor::new(accessor.clone()),
            resolver: SchemaResolver::new(accessor),
            default_row_cap: DEFAULT_ROW_CAP,
        }
    }

    /// Run the server on stdio until stdin closes.
    pub async fn run_stdio(&self) -> Result<(), McpError> {
        tracing::info!("starting MCP server on stdio");

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut stdout_lock = stdout.lock();

        for line in stdin.lock().lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = serde_json::from_str(&line)?;
            let response = self.handle_request(request).await;
            let response_json = serde_json::to_string(&response)?;

            writeln!(stdout_lock, "{}", response_json)?;
            stdout_lock.flush()?;
        }

        Ok(())
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "shutdown" => {
                tracing::info!("MCP server shutdown requested");
                JsonRpcResponse::success(id, json!(null))
            }
            _ => JsonRpcResponse::error(
                id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {
                "name": "sqlward-mcp",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {}
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": tools::builtin_tools() }))
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {}", e));
                }
            },
            None => return JsonRpcResponse::error(id, -32602, "Missing params"),
        };

        let args = &params.arguments;
        let result = match params.name.as_str() {
            tools::READ_DATA => {
                let Some(query) = str_arg(args, "query") else {
                    return missing_arg(id, "query");
                };
                let row_cap = u32_arg(args, "row_cap").unwrap_or(self.default_row_cap);
                let include_plan = bool_arg(args, "include_plan");
                self.read_data(query, row_cap, include_plan).await
            }
            tools::DESCRIBE_TABLE => {
                let Some(schema) = str_arg(args, "schema") else {
                    return missing_arg(id, "schema");
                };
                let Some(table) = str_arg(args, "table") else {
                    return missing_arg(id, "table");
                };
                self.describe_table(schema, table).await
            }
            tools::LIST_TABLES => self.list_tables(str_arg(args, "search")).await,
            tools::ANALYZE_QUERY => {
                let Some(query) = str_arg(args, "query") else {
                    return missing_arg(id, "query");
                };
                self.analyze_query(query).await
            }
            other => {
                return JsonRpcResponse::error(id, -32602, format!("Tool not found: {}", other));
            }
        };

        tool_result_to_response(id, result)
    }

    async fn read_data(
        &self,
        query: &str,
        row_cap: u32,
        include_plan: bool,
    ) -> Result<Value, GatewayError> {
        let result = self.executor.execute(query, row_cap).await?;
        let mut out = to_json(&result)?;
        if include_plan {
            let plan = self.executor.explain(query).await?;
            if let Some(obj) = out.as_object_mut() {
                obj.insert("plan".to_string(), json!(plan));
            }
        }
        Ok(out)
    }

    async fn describe_table(&self, schema: &str, table: &str) -> Result<Value, GatewayError> {
        let table_schema = self.resolver.get_table_schema(schema, table).await?;
        to_json(&table_schema)
    }

    async fn list_tables(&self, search: Option<&str>) -> Result<Value, GatewayError> {
        let mut tables = self.resolver.list_tables().await?;
        if let Some(needle) = search {
            let needle = needle.to_lowercase();
            tables.retain(|t| {
                format!("{}.{}", t.schema_name, t.table_name)
                    .to_lowercase()
                    .contains(&needle)
            });
        }
        Ok(json!({ "count": tables.len(), "tables": tables }))
    }

    async fn analyze_query(&self, query: &str) -> Result<Value, GatewayError> {
        let stats = self.executor.statistics(query).await?;
        let plan = self.executor.explain(query).await?;
        let recommendations = sqlward_policy::analyze::recommendations(query);
        Ok(json!({
            "statistics": stats,
            "plan": plan,
            "recommendations": recommendations,
        }))
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(value).map_err(|e| GatewayError::database(e.to_string()))
}

fn missing_arg(id: Option<Value>, name: &str) -> JsonRpcResponse {
    JsonRpcResponse::error(id, -32602, format!("Missing required argument: {}", name))
}

fn str_arg<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

fn u32_arg(args: &Value, name: &str) -> Option<u32> {
    args.get(name)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn bool_arg(args: &Value, name: &str) -> bool {
    args.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn tool_result_to_response(
    id: Option<Value>,
    result: Result<Value, GatewayError>,
) -> JsonRpcResponse {
    let (content, is_error) = match result {
        Ok(value) => (vec![ToolContent::Json { json: value }], false),
        Err(err) => {
            tracing::debug!(kind = err.kind(), error = %err, "tool call failed");
            let content = vec![
                ToolContent::Text {
                    text: err.to_string(),
                },
                ToolContent::Json {
                    json: json!({ "error": err.kind(), "message": err.to_string() }),
                },
            ];
            (content, true)
        }
    };
    JsonRpcResponse::success(
        id,
        json!({
            "content": content,
            "isError": is_error
        }),
    )
}
