//! Schema documentation catalog.
//!
//! This module provides:
//! - Data models for documented tables and their columns
//! - The in-memory `Catalog` snapshot that expansion runs against
//! - Reference graph analysis for cycle and health reporting
//! - The DuckDB-backed document store

mod graph;
mod store;

pub use graph::*;
pub use store::*;

use ahash::AHashMap;
use serde::Serialize;
use std::fmt;

/// Unique identifier for a documented table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TableId(pub i64);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a documented column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ColumnId(pub i64);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A documented table
#[derive(Debug, Clone)]
pub struct TableDoc {
    /// Table ID within the catalog
    pub id: TableId,
    /// Table name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Description of the table's calculated fields, if any
    pub calculated_fields_description: String,
    /// Creation timestamp as recorded by the store (may be empty)
    pub created_at: String,
}

/// A documented column
#[derive(Debug, Clone)]
pub struct ColumnDoc {
    /// Column ID within the catalog
    pub id: ColumnId,
    /// Owning table
    pub table_id: TableId,
    /// Field name
    pub field_name: String,
    /// Free-form description
    pub description: String,
    /// Data type as documented (e.g. "String", "Reference (Part)")
    pub data_type: String,
    /// Whether this field is part of the table's key
    pub is_key: bool,
    /// Whether this field is calculated rather than stored
    pub is_calculated: bool,
    /// Target table for reference fields
    pub referenced_table_id: Option<TableId>,
    /// Whether this field is eligible for inclusion when a referencing
    /// field is expanded
    pub display_on_export: bool,
    /// Creation timestamp as recorded by the store (may be empty)
    pub created_at: String,
}

impl ColumnDoc {
    /// Whether the documented data type denotes a reference to another table
    pub fn is_reference(&self) -> bool {
        is_reference_type(&self.data_type)
    }

    /// Whether this column should be recursively expanded on export.
    /// Calculated references are documented but not chased.
    pub fn is_expandable_reference(&self) -> bool {
        self.is_reference() && !self.is_calculated
    }
}

/// Check if a data type string denotes a reference (e.g. "Reference (Part)")
pub fn is_reference_type(data_type: &str) -> bool {
    data_type
        .trim_start()
        .get(..9)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("reference"))
}

/// Parse a store flag value into a boolean.
///
/// The store keeps `is_key` as free-form text ("Yes", "True", "1", ...).
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "y" | "t" | "1"
    )
}

/// In-memory snapshot of the documented schema.
///
/// Materialized once per export run (preload phase), so the traversal itself
/// performs no I/O. Column order per table is the store order and defines
/// child ordering during expansion.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Tables indexed by id
    tables: AHashMap<TableId, TableDoc>,
    /// Columns per table, in store order
    columns: AHashMap<TableId, Vec<ColumnDoc>>,
    /// Lowercased table name -> id
    names: AHashMap<String, TableId>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the catalog
    pub fn add_table(&mut self, table: TableDoc) {
        self.names.insert(table.name.to_lowercase(), table.id);
        self.tables.insert(table.id, table);
    }

    /// Append a column to its owning table, preserving insertion order
    pub fn add_column(&mut self, column: ColumnDoc) {
        self.columns.entry(column.table_id).or_default().push(column);
    }

    /// Get a table by id
    pub fn table(&self, id: TableId) -> Option<&TableDoc> {
        self.tables.get(&id)
    }

    /// Get a table's name by id
    pub fn table_name(&self, id: TableId) -> Option<&str> {
        self.tables.get(&id).map(|t| t.name.as_str())
    }

    /// Get a table by name (case-insensitive)
    pub fn table_by_name(&self, name: &str) -> Option<&TableDoc> {
        self.names
            .get(&name.to_lowercase())
            .and_then(|id| self.tables.get(id))
    }

    /// Columns of a table in store order (empty for unknown tables)
    pub fn columns(&self, id: TableId) -> &[ColumnDoc] {
        self.columns.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All tables sorted by name
    pub fn tables_by_name(&self) -> Vec<&TableDoc> {
        let mut tables: Vec<_> = self.tables.values().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        tables
    }

    /// Number of tables in the catalog
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of columns across all tables
    pub fn column_count(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    /// Total number of reference columns across all tables
    pub fn reference_count(&self) -> usize {
        self.columns
            .values()
            .flat_map(|cols| cols.iter())
            .filter(|c| c.is_reference())
            .count()
    }
}
