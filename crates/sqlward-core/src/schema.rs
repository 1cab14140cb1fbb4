//! Schema discovery records.
//!
//! These mirror the catalog's shape, normalized: columns in ordinal
//! position, index key columns in key order, foreign keys in
//! constraint-then-column order.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};

/// Whether a relation is a base table or a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    View,
}

/// Identity of one table or view. Identity is the (schema_name, table_name)
/// pair; a discovery result never contains the same pair twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRef {
    pub schema_name: String,
    pub table_name: String,
    pub kind: TableKind,
    /// Populated best-effort for base tables only; `None` means the count
    /// was not attempted or not available, never zero rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
}

/// One column, in the table's physical declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One index. `columns` is in key ordinal order, not alphabetical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary_key: bool,
}

/// One (constraint, column) pair of a foreign key. A composite foreign key
/// yields multiple descriptors sharing `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    pub name: String,
    pub column: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Full schema of one table or view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: TableRef,
    pub columns: Vec<ColumnDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl TableSchema {
    /// Verify the cross-reference invariant: every column named by an index
    /// or foreign key must exist in `columns`. A violation means the catalog
    /// returned contradictory data and fails the whole request.
    pub fn verify_consistent(&self) -> Result<(), GatewayError> {
        let inconsistency = |detail: String| GatewayError::SchemaInconsistency {
            schema: self.table.schema_name.clone(),
            table: self.table.table_name.clone(),
            detail,
        };

        for index in &self.indexes {
            for col in &index.columns {
                if !self.columns.iter().any(|c| &c.name == col) {
                    return Err(inconsistency(format!(
                        "index '{}' references unknown column '{}'",
                        index.name, col
                    )));
                }
            }
        }

        for fk in &self.foreign_keys {
            if !self.columns.iter().any(|c| c.name == fk.column) {
                return Err(inconsistency(format!(
                    "foreign key '{}' references unknown column '{}'",
                    fk.name, fk.column
                )));
            }
        }

        Ok(())
    }
}
