//! The schema metadata resolver.
//!
//! Assembles a normalized [`TableSchema`] for one table, or a flat inventory
//! of all tables and views, from catalog primitives. Every request re-queries
//! the live catalog; there is no cache.

use crate::accessor::CatalogAccessor;
use sqlward_core::{
    ColumnDescriptor, ForeignKeyDescriptor, GatewayError, IndexDescriptor, TableKind, TableRef,
    TableSchema,
};
use std::sync::Arc;

/// Schemas excluded from discovery. Policy constant, not caller-configurable.
pub const SYSTEM_SCHEMAS: [&str; 12] = [
    "sys",
    "INFORMATION_SCHEMA",
    "guest",
    "db_owner",
    "db_accessadmin",
    "db_securityadmin",
    "db_ddladmin",
    "db_backupoperator",
    "db_datareader",
    "db_datawriter",
    "db_denydatareader",
    "db_denydatawriter",
];

pub struct SchemaResolver {
    accessor: Arc<dyn CatalogAccessor>,
}

impl SchemaResolver {
    pub fn new(accessor: Arc<dyn CatalogAccessor>) -> Self {
        Self { accessor }
    }

    /// List all base tables and views outside the system schemas, stably
    /// sorted by (schema, table).
    pub async fn list_tables(&self) -> Result<Vec<TableRef>, GatewayError> {
        self.accessor.ensure_connected().await?;

        let excluded = SYSTEM_SCHEMAS
            .iter()
            .map(|s| quote_literal(s))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT TABLE_SCHEMA, TABLE_NAME, TABLE_TYPE \
             FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_TYPE IN ('BASE TABLE', 'VIEW') \
             AND TABLE_SCHEMA NOT IN ({}) \
             ORDER BY TABLE_SCHEMA, TABLE_NAME",
            excluded
        );

        let raw = self.accessor.run_query(&sql).await?;
        let mut tables = Vec::with_capacity(raw.rows.len());
        for row in &raw.rows {
            tables.push(TableRef {
                schema_name: cell_str(row, 0)?,
                table_name: cell_str(row, 1)?,
                kind: parse_kind(&cell_str(row, 2)?),
                row_count: None,
            });
        }
        // The catalog already orders the result; re-sorting here keeps the
        // ordering guarantee independent of server collation quirks.
        tables.sort_by(|a, b| {
            (a.schema_name.as_str(), a.table_name.as_str())
                .cmp(&(b.schema_name.as_str(), b.table_name.as_str()))
        });
        Ok(tables)
    }

    /// Resolve the full schema of one table or view.
    ///
    /// Fails with `NotFound` before any facet query when the (schema, table)
    /// pair does not exist. Columns, indexes, and foreign keys are integral:
    /// any of their queries failing fails the whole call. The row count is
    /// supplementary and degrades to `None` on failure.
    pub async fn get_table_schema(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> Result<TableSchema, GatewayError> {
        self.accessor.ensure_connected().await?;

        let kind = self.resolve_kind(schema_name, table_name).await?;
        let mut columns = self.fetch_columns(schema_name, table_name).await?;
        let indexes = self.fetch_indexes(schema_name, table_name).await?;
        let foreign_keys = self.fetch_foreign_keys(schema_name, table_name).await?;

        for column in &mut columns {
            column.is_primary_key = indexes
                .iter()
                .any(|ix| ix.is_primary_key && ix.columns.contains(&column.name));
            column.is_foreign_key = foreign_keys.iter().any(|fk| fk.column == column.name);
        }

        let row_count = if kind == TableKind::Table {
            self.fetch_row_count(schema_name, table_name).await
        } else {
            None
        };

        let table_schema = TableSchema {
            table: TableRef {
                schema_name: schema_name.to_string(),
                table_name: table_name.to_string(),
                kind,
                row_count,
            },
            columns,
            indexes,
            foreign_keys,
        };
        table_schema.verify_consistent()?;
        Ok(table_schema)
    }

    async fn resolve_kind(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> Result<TableKind, GatewayError> {
        let sql = format!(
            "SELECT TABLE_TYPE FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {}",
            quote_literal(schema_name),
            quote_literal(table_name)
        );
        let raw = self.accessor.run_query(&sql).await?;
        match raw.rows.first() {
            Some(row) => Ok(parse_kind(&cell_str(row, 0)?)),
            None => Err(GatewayError::NotFound {
                schema: schema_name.to_string(),
                table: table_name.to_string(),
            }),
        }
    }

    async fn fetch_columns(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> Result<Vec<ColumnDescriptor>, GatewayError> {
        let sql = format!(
            "SELECT c.COLUMN_NAME, c.DATA_TYPE, c.CHARACTER_MAXIMUM_LENGTH, \
                    c.IS_NULLABLE, c.COLUMN_DEFAULT, \
                    CAST(ep.value AS NVARCHAR(4000)) AS COLUMN_DESCRIPTION \
             FROM INFORMATION_SCHEMA.COLUMNS c \
             LEFT JOIN sys.extended_properties ep \
               ON ep.major_id = OBJECT_ID({object}) \
              AND ep.minor_id = c.ORDINAL_POSITION \
              AND ep.class = 1 AND ep.name = 'MS_Description' \
             WHERE c.TABLE_SCHEMA = {schema} AND c.TABLE_NAME = {table} \
             ORDER BY c.ORDINAL_POSITION",
            object = object_literal(schema_name, table_name),
            schema = quote_literal(schema_name),
            table = quote_literal(table_name),
        );
        let raw = self.accessor.run_query(&sql).await?;

        let mut columns = Vec::with_capacity(raw.rows.len());
        for row in &raw.rows {
            columns.push(ColumnDescriptor {
                name: cell_str(row, 0)?,
                data_type: cell_str(row, 1)?,
                max_length: cell_i64(row, 2),
                nullable: cell_str(row, 3)?.eq_ignore_ascii_case("YES"),
                // Flags are derived from the index and foreign key facets.
                is_primary_key: false,
                is_foreign_key: false,
                default_value: cell_opt_str(row, 4),
                description: cell_opt_str(row, 5),
            });
        }
        Ok(columns)
    }

    async fn fetch_indexes(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> Result<Vec<IndexDescriptor>, GatewayError> {
        // Key columns arrive as one comma-delimited aggregate per index,
        // concatenated in key ordinal order; the split below must preserve
        // that order exactly.
        let sql = format!(
            "SELECT i.name AS index_name, \
                    STRING_AGG(c.name, ',') WITHIN GROUP (ORDER BY ic.key_ordinal) AS key_columns, \
                    i.is_unique, i.is_primary_key \
             FROM sys.indexes i \
             JOIN sys.index_columns ic \
               ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
             JOIN sys.columns c \
               ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
             WHERE i.object_id = OBJECT_ID({object}) \
               AND i.name IS NOT NULL AND ic.is_included_column = 0 \
             GROUP BY i.name, i.index_id, i.is_unique, i.is_primary_key \
             ORDER BY i.index_id",
            object = object_literal(schema_name, table_name),
        );
        let raw = self.accessor.run_query(&sql).await?;

        let mut indexes = Vec::with_capacity(raw.rows.len());
        for row in &raw.rows {
            indexes.push(IndexDescriptor {
                name: cell_str(row, 0)?,
                // An empty aggregate must not become a single "" column;
                // that would later read as a reference to an unknown column.
                columns: cell_str(row, 1)?
                    .split(',')
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
                    .collect(),
                is_unique: cell_bool(row, 2),
                is_primary_key: cell_bool(row, 3),
            });
        }
        Ok(indexes)
    }

    async fn fetch_foreign_keys(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> Result<Vec<ForeignKeyDescriptor>, GatewayError> {
        let sql = format!(
            "SELECT fk.name AS fk_name, pc.name AS column_name, \
                    rs.name AS referenced_schema, rt.name AS referenced_table, \
                    rc.name AS referenced_column \
             FROM sys.foreign_keys fk \
             JOIN sys.foreign_key_columns fkc \
               ON fkc.constraint_object_id = fk.object_id \
             JOIN sys.columns pc \
               ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id \
             JOIN sys.tables rt ON rt.object_id = fkc.referenced_object_id \
             JOIN sys.schemas rs ON rs.schema_id = rt.schema_id \
             JOIN sys.columns rc \
               ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id \
             WHERE fk.parent_object_id = OBJECT_ID({object}) \
             ORDER BY fk.name, fkc.constraint_column_id",
            object = object_literal(schema_name, table_name),
        );
        let raw = self.accessor.run_query(&sql).await?;

        let mut foreign_keys = Vec::with_capacity(raw.rows.len());
        for row in &raw.rows {
            foreign_keys.push(ForeignKeyDescriptor {
                name: cell_str(row, 0)?,
                column: cell_str(row, 1)?,
                referenced_schema: cell_str(row, 2)?,
                referenced_table: cell_str(row, 3)?,
                referenced_column: cell_str(row, 4)?,
            });
        }
        Ok(foreign_keys)
    }

    /// Supplementary row count for base tables. Failure here (for example a
    /// permission denial on the table while catalog metadata stays visible)
    /// must not fail discovery as a whole.
    async fn fetch_row_count(&self, schema_name: &str, table_name: &str) -> Option<i64> {
        let sql = format!(
            "SELECT COUNT_BIG(*) AS row_count FROM {}.{}",
            quote_ident(schema_name),
            quote_ident(table_name)
        );
        match self.accessor.run_query(&sql).await {
            Ok(raw) => raw.rows.first().and_then(|row| cell_i64(row, 0)),
            Err(err) => {
                tracing::debug!(
                    schema = schema_name,
                    table = table_name,
                    error = %err,
                    "row count unavailable"
                );
                None
            }
        }
    }
}

fn parse_kind(table_type: &str) -> TableKind {
    if table_type.eq_ignore_ascii_case("VIEW") {
        TableKind::View
    } else {
        TableKind::Table
    }
}

fn quote_literal(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

fn quote_ident(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

fn object_literal(schema_name: &str, table_name: &str) -> String {
    quote_literal(&format!(
        "{}.{}",
        quote_ident(schema_name),
        quote_ident(table_name)
    ))
}

fn cell(row: &[serde_json::Value], idx: usize) -> &serde_json::Value {
    row.get(idx).unwrap_or(&serde_json::Value::Null)
}

fn cell_str(row: &[serde_json::Value], idx: usize) -> Result<String, GatewayError> {
    cell(row, idx)
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| GatewayError::database(format!("unexpected catalog value in column {}", idx)))
}

fn cell_opt_str(row: &[serde_json::Value], idx: usize) -> Option<String> {
    cell(row, idx).as_str().map(str::to_string)
}

fn cell_i64(row: &[serde_json::Value], idx: usize) -> Option<i64> {
    cell(row, idx).as_i64()
}

fn cell_bool(row: &[serde_json::Value], idx: usize) -> bool {
    match cell(row, idx) {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::RawResultSet;
    use crate::test_support::{result_set, MockAccessor};
    use serde_json::json;

    fn existence_row(kind: &str) -> RawResultSet {
        result_set(&["TABLE_TYPE"], vec![vec![json!(kind)]])
    }

    #[tokio::test]
    async fn list_tables_is_sorted_and_tagged() {
        let accessor = Arc::new(MockAccessor::new().on(
            "INFORMATION_SCHEMA.TABLES",
            Ok(result_set(
                &["TABLE_SCHEMA", "TABLE_NAME", "TABLE_TYPE"],
                vec![
                    vec![json!("sales"), json!("orders"), json!("BASE TABLE")],
                    vec![json!("dbo"), json!("recent_orders"), json!("VIEW")],
                    vec![json!("dbo"), json!("customers"), json!("BASE TABLE")],
                ],
            )),
        ));
        let resolver = SchemaResolver::new(accessor);

        let tables = resolver.list_tables().await.unwrap();
        let pairs: Vec<(&str, &str)> = tables
            .iter()
            .map(|t| (t.schema_name.as_str(), t.table_name.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("dbo", "customers"),
                ("dbo", "recent_orders"),
                ("sales", "orders"),
            ]
        );
        assert_eq!(tables[1].kind, TableKind::View);
        assert_eq!(tables[0].kind, TableKind::Table);

        let mut deduped = pairs.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), pairs.len());
    }

    #[tokio::test]
    async fn missing_table_short_circuits_to_not_found() {
        let accessor = Arc::new(
            MockAccessor::new().on("INFORMATION_SCHEMA.TABLES", Ok(RawResultSet::default())),
        );
        let resolver = SchemaResolver::new(accessor.clone());

        let err = resolver.get_table_schema("dbo", "ghost").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { .. }));
        // Only the existence check ran; no facet queries were issued.
        assert_eq!(accessor.queries().len(), 1);
    }

    fn scripted_schema(accessor: MockAccessor) -> MockAccessor {
        accessor
            .on("INFORMATION_SCHEMA.TABLES", Ok(existence_row("BASE TABLE")))
            .on(
                "INFORMATION_SCHEMA.COLUMNS",
                Ok(result_set(
                    &[
                        "COLUMN_NAME",
                        "DATA_TYPE",
                        "CHARACTER_MAXIMUM_LENGTH",
                        "IS_NULLABLE",
                        "COLUMN_DEFAULT",
                        "COLUMN_DESCRIPTION",
                    ],
                    vec![
                        vec![
                            json!("id"),
                            json!("int"),
                            json!(null),
                            json!("NO"),
                            json!(null),
                            json!("surrogate key"),
                        ],
                        vec![
                            json!("customer_id"),
                            json!("int"),
                            json!(null),
                            json!("NO"),
                            json!(null),
                            json!(null),
                        ],
                        vec![
                            json!("note"),
                            json!("nvarchar"),
                            json!(400),
                            json!("YES"),
                            json!("(N'')"),
                            json!(null),
                        ],
                    ],
                )),
            )
            .on(
                "sys.indexes",
                Ok(result_set(
                    &["index_name", "key_columns", "is_unique", "is_primary_key"],
                    vec![
                        vec![json!("pk_orders"), json!("id"), json!(true), json!(true)],
                        // Key order deliberately not alphabetical.
                        vec![
                            json!("ix_customer_note"),
                            json!("note,customer_id"),
                            json!(false),
                            json!(false),
                        ],
                    ],
                )),
            )
            .on(
                "sys.foreign_keys",
                Ok(result_set(
                    &[
                        "fk_name",
                        "column_name",
                        "referenced_schema",
                        "referenced_table",
                        "referenced_column",
                    ],
                    vec![vec![
                        json!("fk_orders_customer"),
                        json!("customer_id"),
                        json!("dbo"),
                        json!("customers"),
                        json!("id"),
                    ]],
                )),
            )
    }

    #[tokio::test]
    async fn assembles_full_schema_with_derived_flags() {
        let accessor = Arc::new(scripted_schema(MockAccessor::new()).on(
            "COUNT_BIG",
            Ok(result_set(&["row_count"], vec![vec![json!(42)]])),
        ));
        let resolver = SchemaResolver::new(accessor);

        let schema = resolver.get_table_schema("dbo", "orders").await.unwrap();
        assert_eq!(schema.table.kind, TableKind::Table);
        assert_eq!(schema.table.row_count, Some(42));

        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "customer_id", "note"]);
        assert!(schema.columns[0].is_primary_key);
        assert!(!schema.columns[0].is_foreign_key);
        assert!(schema.columns[1].is_foreign_key);
        assert_eq!(schema.columns[2].max_length, Some(400));
        assert!(schema.columns[2].nullable);
        assert_eq!(schema.columns[2].default_value.as_deref(), Some("(N'')"));
        assert_eq!(schema.columns[0].description.as_deref(), Some("surrogate key"));

        // Aggregated key order is preserved, never re-sorted.
        assert_eq!(schema.indexes[1].columns, vec!["note", "customer_id"]);
        assert!(schema.indexes[0].is_primary_key);

        assert_eq!(schema.foreign_keys.len(), 1);
        assert_eq!(schema.foreign_keys[0].referenced_table, "customers");
    }

    #[tokio::test]
    async fn failed_row_count_is_swallowed() {
        let accessor = Arc::new(
            scripted_schema(MockAccessor::new())
                .on("COUNT_BIG", Err(GatewayError::database("permission denied"))),
        );
        let resolver = SchemaResolver::new(accessor);

        let schema = resolver.get_table_schema("dbo", "orders").await.unwrap();
        assert_eq!(schema.table.row_count, None);
    }

    #[tokio::test]
    async fn views_never_attempt_a_row_count() {
        let accessor = Arc::new(
            MockAccessor::new()
                .on("INFORMATION_SCHEMA.TABLES", Ok(existence_row("VIEW")))
                .on(
                    "INFORMATION_SCHEMA.COLUMNS",
                    Ok(result_set(
                        &[
                            "COLUMN_NAME",
                            "DATA_TYPE",
                            "CHARACTER_MAXIMUM_LENGTH",
                            "IS_NULLABLE",
                            "COLUMN_DEFAULT",
                            "COLUMN_DESCRIPTION",
                        ],
                        vec![vec![
                            json!("id"),
                            json!("int"),
                            json!(null),
                            json!("NO"),
                            json!(null),
                            json!(null),
                        ]],
                    )),
                )
                .on("sys.indexes", Ok(RawResultSet::default()))
                .on("sys.foreign_keys", Ok(RawResultSet::default()))
                .on("COUNT_BIG", Err(GatewayError::database("must not run"))),
        );
        let resolver = SchemaResolver::new(accessor.clone());

        let schema = resolver.get_table_schema("dbo", "recent").await.unwrap();
        assert_eq!(schema.table.kind, TableKind::View);
        assert_eq!(schema.table.row_count, None);
        assert!(accessor
            .queries()
            .iter()
            .all(|q| !q.contains("COUNT_BIG")));
    }

    #[tokio::test]
    async fn integral_facet_failure_fails_the_call() {
        let accessor = Arc::new(
            MockAccessor::new()
                .on("INFORMATION_SCHEMA.TABLES", Ok(existence_row("BASE TABLE")))
                .on(
                    "INFORMATION_SCHEMA.COLUMNS",
                    Ok(result_set(
                        &[
                            "COLUMN_NAME",
                            "DATA_TYPE",
                            "CHARACTER_MAXIMUM_LENGTH",
                            "IS_NULLABLE",
                            "COLUMN_DEFAULT",
                            "COLUMN_DESCRIPTION",
                        ],
                        vec![vec![
                            json!("id"),
                            json!("int"),
                            json!(null),
                            json!("NO"),
                            json!(null),
                            json!(null),
                        ]],
                    )),
                )
                .on("sys.indexes", Err(GatewayError::database("index scan failed"))),
        );
        let resolver = SchemaResolver::new(accessor);

        let err = resolver.get_table_schema("dbo", "orders").await.unwrap_err();
        assert!(matches!(err, GatewayError::Database { .. }));
    }

    #[tokio::test]
    async fn inconsistent_index_column_raises_schema_inconsistency() {
        let accessor = Arc::new(
            MockAccessor::new()
                .on("INFORMATION_SCHEMA.TABLES", Ok(existence_row("BASE TABLE")))
                .on(
                    "INFORMATION_SCHEMA.COLUMNS",
                    Ok(result_set(
                        &[
                            "COLUMN_NAME",
                            "DATA_TYPE",
                            "CHARACTER_MAXIMUM_LENGTH",
                            "IS_NULLABLE",
                            "COLUMN_DEFAULT",
                            "COLUMN_DESCRIPTION",
                        ],
                        vec![vec![
                            json!("id"),
                            json!("int"),
                            json!(null),
                            json!("NO"),
                            json!(null),
                            json!(null),
                        ]],
                    )),
                )
                .on(
                    "sys.indexes",
                    Ok(result_set(
                        &["index_name", "key_columns", "is_unique", "is_primary_key"],
                        vec![vec![
                            json!("ix_ghost"),
                            json!("ghost_column"),
                            json!(false),
                            json!(false),
                        ]],
                    )),
                )
                .on("sys.foreign_keys", Ok(RawResultSet::default()))
                .on("COUNT_BIG", Ok(result_set(&["row_count"], vec![vec![json!(1)]]))),
        );
        let resolver = SchemaResolver::new(accessor);

        let err = resolver.get_table_schema("dbo", "orders").await.unwrap_err();
        assert!(matches!(err, GatewayError::SchemaInconsistency { .. }));
    }

    #[tokio::test]
    async fn empty_key_column_aggregate_yields_no_columns() {
        let accessor = Arc::new(
            MockAccessor::new()
                .on("INFORMATION_SCHEMA.TABLES", Ok(existence_row("BASE TABLE")))
                .on(
                    "INFORMATION_SCHEMA.COLUMNS",
                    Ok(result_set(
                        &[
                            "COLUMN_NAME",
                            "DATA_TYPE",
                            "CHARACTER_MAXIMUM_LENGTH",
                            "IS_NULLABLE",
                            "COLUMN_DEFAULT",
                            "COLUMN_DESCRIPTION",
                        ],
                        vec![vec![
                            json!("id"),
                            json!("int"),
                            json!(null),
                            json!("NO"),
                            json!(null),
                            json!(null),
                        ]],
                    )),
                )
                .on(
                    "sys.indexes",
                    Ok(result_set(
                        &["index_name", "key_columns", "is_unique", "is_primary_key"],
                        vec![vec![json!("ix_empty"), json!(""), json!(false), json!(false)]],
                    )),
                )
                .on("sys.foreign_keys", Ok(RawResultSet::default()))
                .on("COUNT_BIG", Ok(result_set(&["row_count"], vec![vec![json!(1)]]))),
        );
        let resolver = SchemaResolver::new(accessor);

        let schema = resolver.get_table_schema("dbo", "orders").await.unwrap();
        assert_eq!(schema.indexes.len(), 1);
        assert!(schema.indexes[0].columns.is_empty());
    }

    #[test]
    fn identifier_and_literal_quoting() {
        assert_eq!(quote_literal("o'brien"), "N'o''brien'");
        assert_eq!(quote_ident("odd]name"), "[odd]]name]");
        assert_eq!(object_literal("dbo", "orders"), "N'[dbo].[orders]'");
    }
}
