//! Static tool definitions exposed by the gateway.

use crate::protocol::ToolDefinition;
use serde_json::json;

/// Names of the four gateway tools.
pub const READ_DATA: &str = "read_data";
pub const DESCRIBE_TABLE: &str = "describe_table";
pub const LIST_TABLES: &str = "list_tables";
pub const ANALYZE_QUERY: &str = "analyze_query";

/// The fixed tool set. The gateway is read-only, so the surface never
/// changes per connection or per role.
pub fn builtin_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: READ_DATA.to_string(),
            description: Some(
                "Execute a read-only SELECT query. Queries without an explicit TOP \
                 clause are capped at the requested row limit."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "SELECT statement to execute"
                    },
                    "row_cap": {
                        "type": "integer",
                        "description": "Maximum rows to return (1-1000, default 100)"
                    },
                    "include_plan": {
                        "type": "boolean",
                        "description": "Attach the estimated execution plan to the result"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: DESCRIBE_TABLE.to_string(),
            description: Some(
                "Describe a table or view: columns, primary and foreign keys, \
                 indexes, and an approximate row count."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "schema": {
                        "type": "string",
                        "description": "Schema name, e.g. dbo"
                    },
                    "table": {
                        "type": "string",
                        "description": "Table or view name"
                    }
                },
                "required": ["schema", "table"]
            }),
        },
        ToolDefinition {
            name: LIST_TABLES.to_string(),
            description: Some(
                "List user tables and views, excluding system schemas.".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "search": {
                        "type": "string",
                        "description": "Case-insensitive substring filter on schema.name"
                    }
                }
            }),
        },
        ToolDefinition {
            name: ANALYZE_QUERY.to_string(),
            description: Some(
                "Analyze a SELECT query: execution statistics, estimated plan, \
                 and textual recommendations."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "SELECT statement to analyze"
                    }
                },
                "required": ["query"]
            }),
        },
    ]
}
