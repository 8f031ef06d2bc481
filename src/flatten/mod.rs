//! Flattening expansion trees into export rows.
//!
//! A pre-order walk over an [`Expansion`] emits one row per terminal node,
//! with dotted field paths, per-depth indentation and origin annotations.
//! Row construction is a pure function of the tree: the same expansion
//! always yields the same rows.

use crate::catalog::{Catalog, ColumnDoc, TableId};
use crate::expand::{Expansion, ExpansionNode};
use serde::Serialize;

/// Default spaces of indentation per depth level in exported field names
pub const DEFAULT_INDENT_WIDTH: usize = 4;

/// One row of the flattened export.
///
/// Base rows mirror a documented column as-is; extended rows are the
/// terminal fields an expandable reference unrolled into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    /// Store id for base rows, `"{root_column_id}.{seq:06}"` for extended rows
    pub id: String,
    /// Table owning the row's root column
    pub table_id: TableId,
    /// Name of that table
    pub table_name: String,
    /// Field name, or the indented dotted path for extended rows
    pub field_name: String,
    /// Description, with origin and terminal annotations on extended rows
    pub description: String,
    /// Data type of the field at the end of the path
    pub data_type: String,
    /// Key flag (extended rows inherit the root reference column's)
    pub is_key: bool,
    /// Calculated flag (extended rows inherit the root reference column's)
    pub is_calculated: bool,
    /// Target table name for reference fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_table: Option<String>,
    /// Target table id for reference fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_table_id: Option<TableId>,
    /// Export flag (extended rows inherit the root reference column's)
    pub display_on_export: bool,
    /// Whether this row came out of reference expansion
    pub is_extended: bool,
    /// Store timestamp carried through for reference
    pub created_at: String,
}

/// A column of the export layout
#[derive(Debug, Clone, Copy)]
pub struct ExportColumn {
    pub name: &'static str,
    /// Identity columns are carried for joins and debugging but suppressed
    /// from display
    pub hidden: bool,
}

/// Fixed column layout of the flattened export
pub const EXPORT_COLUMNS: &[ExportColumn] = &[
    ExportColumn { name: "table_name", hidden: false },
    ExportColumn { name: "is_key", hidden: false },
    ExportColumn { name: "field_name", hidden: false },
    ExportColumn { name: "is_calculated", hidden: false },
    ExportColumn { name: "description", hidden: false },
    ExportColumn { name: "data_type", hidden: false },
    ExportColumn { name: "referenced_table", hidden: false },
    ExportColumn { name: "is_extended", hidden: false },
    ExportColumn { name: "created_at", hidden: false },
    ExportColumn { name: "id", hidden: true },
    ExportColumn { name: "table_id", hidden: true },
    ExportColumn { name: "referenced_table_id", hidden: true },
    ExportColumn { name: "display_on_export", hidden: true },
];

/// Header names in layout order
pub fn headers(include_hidden: bool) -> Vec<&'static str> {
    EXPORT_COLUMNS
        .iter()
        .filter(|c| include_hidden || !c.hidden)
        .map(|c| c.name)
        .collect()
}

impl ExportRow {
    /// Cell values in layout order
    pub fn cells(&self, include_hidden: bool) -> Vec<String> {
        EXPORT_COLUMNS
            .iter()
            .filter(|c| include_hidden || !c.hidden)
            .map(|c| self.cell(c.name))
            .collect()
    }

    fn cell(&self, name: &str) -> String {
        match name {
            "table_name" => self.table_name.clone(),
            "is_key" => self.is_key.to_string(),
            "field_name" => self.field_name.clone(),
            "is_calculated" => self.is_calculated.to_string(),
            "description" => self.description.clone(),
            "data_type" => self.data_type.clone(),
            "referenced_table" => self.referenced_table.clone().unwrap_or_default(),
            "is_extended" => self.is_extended.to_string(),
            "created_at" => self.created_at.clone(),
            "id" => self.id.clone(),
            "table_id" => self.table_id.to_string(),
            "referenced_table_id" => self
                .referenced_table_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            "display_on_export" => self.display_on_export.to_string(),
            _ => String::new(),
        }
    }
}

/// Flattens expansion trees into ordered export rows
pub struct PathFormatter {
    indent_width: usize,
}

impl Default for PathFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl PathFormatter {
    /// Create a formatter with the default indent width
    pub fn new() -> Self {
        Self {
            indent_width: DEFAULT_INDENT_WIDTH,
        }
    }

    /// Set the spaces of indentation per depth level
    pub fn with_indent_width(mut self, indent_width: usize) -> Self {
        self.indent_width = indent_width;
        self
    }

    /// Build the unexpanded row for a documented column
    pub fn base_row(&self, catalog: &Catalog, column: &ColumnDoc) -> ExportRow {
        ExportRow {
            id: column.id.to_string(),
            table_id: column.table_id,
            table_name: catalog
                .table_name(column.table_id)
                .unwrap_or("")
                .to_string(),
            field_name: column.field_name.clone(),
            description: column.description.clone(),
            data_type: column.data_type.clone(),
            is_key: column.is_key,
            is_calculated: column.is_calculated,
            referenced_table: column
                .referenced_table_id
                .and_then(|id| catalog.table_name(id))
                .map(str::to_string),
            referenced_table_id: column.referenced_table_id,
            display_on_export: column.display_on_export,
            is_extended: false,
            created_at: column.created_at.clone(),
        }
    }

    /// Flatten an expansion tree into rows, one per terminal node, in
    /// pre-order. Expanded reference nodes contribute no row of their own.
    pub fn flatten(&self, expansion: &Expansion) -> Vec<ExportRow> {
        let mut rows = Vec::new();
        let mut sequence = 0usize;
        self.walk(expansion, &expansion.root, &mut sequence, &mut rows);
        rows
    }

    fn walk(
        &self,
        expansion: &Expansion,
        node: &ExpansionNode,
        sequence: &mut usize,
        rows: &mut Vec<ExportRow>,
    ) {
        if !node.kind.is_terminal() {
            for child in &node.children {
                self.walk(expansion, child, sequence, rows);
            }
            return;
        }

        *sequence += 1;
        rows.push(ExportRow {
            id: format!("{}.{:06}", expansion.root_column_id, sequence),
            table_id: expansion.table_id,
            table_name: expansion.table_name.clone(),
            field_name: format!(
                "{}{}",
                " ".repeat(self.indent_width * node.depth),
                node.field_path.join(".")
            ),
            description: self.describe(expansion, node),
            data_type: node.data_type.clone(),
            is_key: node.is_key,
            is_calculated: node.is_calculated,
            referenced_table: node.referenced_table.clone(),
            referenced_table_id: node.referenced_table_id,
            display_on_export: expansion.root_display_on_export,
            is_extended: true,
            created_at: expansion.root_created_at.clone(),
        });
    }

    /// Assemble a terminal row's description: the root column's own text,
    /// the `[From <Table>]` origin context for fields pulled in from other
    /// tables, and the terminal marker when the branch did not end at a
    /// plain leaf.
    fn describe(&self, expansion: &Expansion, node: &ExpansionNode) -> String {
        let mut parts: Vec<String> = Vec::new();

        if node.depth == 0 {
            let own = node.description.trim();
            if !own.is_empty() {
                parts.push(own.to_string());
            }
        } else {
            if !expansion.root_description.is_empty() {
                parts.push(expansion.root_description.clone());
            }
            let own = node.description.trim();
            if own.is_empty() {
                parts.push(format!("[From {}]", node.origin_table));
            } else {
                parts.push(format!("[From {}] {}", node.origin_table, own));
            }
        }

        if let Some(marker) = node.kind.annotation() {
            parts.push(format!("[{}]", marker));
        }

        parts.join("\n\n")
    }
}
