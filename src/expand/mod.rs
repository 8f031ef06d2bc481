//! Recursive reference-field expansion.
//!
//! Resolves a reference column into a tree of the fields it ultimately
//! points to, bounded by a depth limit and branch-local cycle detection.
//! The traversal is a pure in-memory computation over a preloaded
//! `Catalog`; malformed schema data degrades to annotated terminal nodes
//! and diagnostic counters instead of failing the export.

mod guard;

pub use guard::CycleGuard;

use crate::catalog::{Catalog, ColumnDoc, ColumnId, TableId};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Default maximum number of reference hops per expansion path
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// How a node in the expansion tree terminated (or didn't)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An expanded reference with children
    Reference,
    /// A non-reference field ending the path
    Leaf,
    /// A reference whose target table is already on the current path
    Cycle,
    /// A reference left unexpanded because the depth limit was reached
    DepthLimit,
    /// A reference column without a resolvable target table
    Unresolved,
}

impl NodeKind {
    /// Marker text appended to the exported description, if any
    pub fn annotation(self) -> Option<&'static str> {
        match self {
            NodeKind::Reference | NodeKind::Leaf => None,
            NodeKind::Cycle => Some("cycle"),
            NodeKind::DepthLimit => Some("depth limit reached"),
            NodeKind::Unresolved => Some("unresolved reference"),
        }
    }

    /// Whether recursion stopped at this node (a flattened row is emitted
    /// for every terminal node, and only for terminal nodes)
    pub fn is_terminal(self) -> bool {
        !matches!(self, NodeKind::Reference)
    }
}

/// One node in an expansion tree
#[derive(Debug, Clone)]
pub struct ExpansionNode {
    /// Field names from the root reference to this node
    pub field_path: Vec<String>,
    /// Data type of the field at this node
    pub data_type: String,
    /// Name of the table that directly owns this field
    pub origin_table: String,
    /// The field's own description
    pub description: String,
    /// Key flag inherited from the root reference column
    pub is_key: bool,
    /// Calculated flag inherited from the root reference column
    pub is_calculated: bool,
    /// Reference hops from the root (root = 0)
    pub depth: usize,
    /// Terminal classification
    pub kind: NodeKind,
    /// Target table for reference fields
    pub referenced_table_id: Option<TableId>,
    /// Target table name, when resolvable
    pub referenced_table: Option<String>,
    /// Children in repository column order (empty unless kind is Reference)
    pub children: Vec<ExpansionNode>,
}

/// Diagnostic counters returned from expansion.
///
/// Explicit return value rather than shared state, so the engine stays a
/// pure function of its inputs and configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionStats {
    /// Leaf fields emitted
    pub leaves: usize,
    /// Branches stopped by cycle detection
    pub cycles: usize,
    /// Branches truncated at the depth limit
    pub depth_limited: usize,
    /// References without a resolvable target table
    pub unresolved: usize,
}

impl ExpansionStats {
    /// Fold another set of counters into this one
    pub fn merge(&mut self, other: &ExpansionStats) {
        self.leaves += other.leaves;
        self.cycles += other.cycles;
        self.depth_limited += other.depth_limited;
        self.unresolved += other.unresolved;
    }

    /// Total terminal nodes counted
    pub fn terminals(&self) -> usize {
        self.leaves + self.cycles + self.depth_limited + self.unresolved
    }
}

impl fmt::Display for ExpansionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} leaves, {} cycles, {} depth-limited, {} unresolved",
            self.leaves, self.cycles, self.depth_limited, self.unresolved
        )
    }
}

/// A completed expansion: the tree plus everything the formatter needs to
/// know about the root reference column.
#[derive(Debug, Clone)]
pub struct Expansion {
    /// The expansion tree
    pub root: ExpansionNode,
    /// Id of the root reference column
    pub root_column_id: ColumnId,
    /// Table owning the root reference column
    pub table_id: TableId,
    /// Name of that table
    pub table_name: String,
    /// The root column's own description
    pub root_description: String,
    /// The root column's export flag, carried onto every flattened row
    pub root_display_on_export: bool,
    /// The root column's store timestamp, carried onto every flattened row
    pub root_created_at: String,
    /// Diagnostic counters for this tree
    pub stats: ExpansionStats,
}

/// Named expansion predicates selectable from the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldFilter {
    /// Key fields plus fields marked for export (default)
    #[default]
    KeysOrDisplay,
    /// Key fields only
    Keys,
    /// Export-marked fields only
    Display,
    /// Every column of the referenced table
    All,
}

impl FieldFilter {
    /// Whether a referenced-table column qualifies for expansion
    pub fn matches(self, column: &ColumnDoc) -> bool {
        match self {
            FieldFilter::KeysOrDisplay => column.is_key || column.display_on_export,
            FieldFilter::Keys => column.is_key,
            FieldFilter::Display => column.display_on_export,
            FieldFilter::All => true,
        }
    }
}

impl FromStr for FieldFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keys-or-display" | "default" => Ok(FieldFilter::KeysOrDisplay),
            "keys" => Ok(FieldFilter::Keys),
            "display" => Ok(FieldFilter::Display),
            "all" => Ok(FieldFilter::All),
            _ => Err(format!(
                "Unknown field filter: {}. Valid options: keys-or-display, keys, display, all",
                s
            )),
        }
    }
}

impl fmt::Display for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldFilter::KeysOrDisplay => write!(f, "keys-or-display"),
            FieldFilter::Keys => write!(f, "keys"),
            FieldFilter::Display => write!(f, "display"),
            FieldFilter::All => write!(f, "all"),
        }
    }
}

/// Recursive reference expander over a catalog snapshot.
///
/// Holds no mutable state between calls; independent expansions against the
/// same catalog can run in parallel.
pub struct Expander<'a> {
    catalog: &'a Catalog,
    max_depth: usize,
    predicate: Box<dyn Fn(&ColumnDoc) -> bool + 'a>,
}

impl<'a> Expander<'a> {
    /// Create an expander with the default depth limit and field filter
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            max_depth: DEFAULT_MAX_DEPTH,
            predicate: Box::new(|c| FieldFilter::KeysOrDisplay.matches(c)),
        }
    }

    /// Set the maximum number of reference hops per path
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Use a named field filter as the expansion predicate
    pub fn with_filter(self, filter: FieldFilter) -> Self {
        self.with_predicate(move |c| filter.matches(c))
    }

    /// Use an arbitrary expansion predicate
    pub fn with_predicate(mut self, predicate: impl Fn(&ColumnDoc) -> bool + 'a) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    /// Expand a reference column into its tree of descendant fields.
    ///
    /// Never fails: malformed input produces annotated terminal nodes and
    /// counters. A non-reference column yields a single leaf.
    pub fn expand(&self, root: &ColumnDoc) -> Expansion {
        let table_name = self
            .catalog
            .table_name(root.table_id)
            .unwrap_or("")
            .to_string();

        let mut guard = CycleGuard::new(root.table_id);
        let mut stats = ExpansionStats::default();
        let node = self.expand_column(
            root,
            &table_name,
            vec![root.field_name.clone()],
            0,
            root.is_key,
            root.is_calculated,
            &mut guard,
            &mut stats,
        );

        Expansion {
            root: node,
            root_column_id: root.id,
            table_id: root.table_id,
            table_name,
            root_description: root.description.trim().to_string(),
            root_display_on_export: root.display_on_export,
            root_created_at: root.created_at.clone(),
            stats,
        }
    }

    /// One step of the depth-first traversal.
    ///
    /// `is_key`/`is_calculated` are the root column's display attributes,
    /// threaded through explicitly so no branch can leak them to a sibling.
    #[allow(clippy::too_many_arguments)]
    fn expand_column(
        &self,
        column: &ColumnDoc,
        origin_table: &str,
        field_path: Vec<String>,
        depth: usize,
        is_key: bool,
        is_calculated: bool,
        guard: &mut CycleGuard,
        stats: &mut ExpansionStats,
    ) -> ExpansionNode {
        let mut node = ExpansionNode {
            field_path,
            data_type: column.data_type.clone(),
            origin_table: origin_table.to_string(),
            description: column.description.clone(),
            is_key,
            is_calculated,
            depth,
            kind: NodeKind::Leaf,
            referenced_table_id: column.referenced_table_id,
            referenced_table: column
                .referenced_table_id
                .and_then(|id| self.catalog.table_name(id))
                .map(str::to_string),
            children: Vec::new(),
        };

        if !column.is_reference() || column.is_calculated {
            // Plain fields and calculated references end the path here
            stats.leaves += 1;
            return node;
        }

        let target = match column.referenced_table_id {
            Some(target) => target,
            None => {
                stats.unresolved += 1;
                node.kind = NodeKind::Unresolved;
                return node;
            }
        };

        if guard.contains(target) {
            stats.cycles += 1;
            node.kind = NodeKind::Cycle;
            return node;
        }

        if depth >= self.max_depth {
            stats.depth_limited += 1;
            node.kind = NodeKind::DepthLimit;
            return node;
        }

        let target_table = match self.catalog.table(target) {
            Some(table) => table,
            None => {
                // Target id points outside the catalog
                stats.unresolved += 1;
                node.kind = NodeKind::Unresolved;
                return node;
            }
        };

        node.kind = NodeKind::Reference;
        guard.enter(target);
        for child in self.catalog.columns(target) {
            if !(self.predicate)(child) {
                continue;
            }
            let mut path = node.field_path.clone();
            path.push(child.field_name.clone());
            node.children.push(self.expand_column(
                child,
                &target_table.name,
                path,
                depth + 1,
                is_key,
                is_calculated,
                guard,
                stats,
            ));
        }
        guard.leave();

        node
    }
}
