//! Reference graph analysis: cycle detection and schema health checks.

use super::{Catalog, TableId};
use ahash::{AHashMap, AHashSet};
use serde::Serialize;

/// A cycle among tables connected by reference columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub tables: Vec<String>,
}

impl Cycle {
    /// Check if this is a self-referencing cycle (single table)
    pub fn is_self_reference(&self) -> bool {
        self.tables.len() == 1
    }

    /// Format the cycle for display
    pub fn display(&self) -> String {
        if self.is_self_reference() {
            format!("{} -> {} (self-reference)", self.tables[0], self.tables[0])
        } else {
            let mut parts = self.tables.clone();
            parts.push(self.tables[0].clone()); // Complete the cycle
            parts.join(" -> ")
        }
    }
}

/// A defect found by the schema health scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIssue {
    /// Owning table name
    pub table: String,
    /// Field name
    pub field: String,
    /// Human-readable description of the defect
    pub issue: String,
}

/// Reference adjacency between documented tables.
///
/// Edges run from the referencing table to the referenced table, one per
/// distinct target. Built once from a catalog snapshot.
#[derive(Debug)]
pub struct RefGraph {
    /// Distinct reference targets per table, in column order
    adjacency: AHashMap<TableId, Vec<TableId>>,
    /// Table names for display
    names: AHashMap<TableId, String>,
    /// Node visit order (by table name) so cycle output is stable
    order: Vec<TableId>,
}

impl RefGraph {
    /// Build the reference graph from a catalog
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut adjacency: AHashMap<TableId, Vec<TableId>> = AHashMap::new();
        let mut names = AHashMap::new();
        let mut order = Vec::with_capacity(catalog.len());

        for table in catalog.tables_by_name() {
            order.push(table.id);
            names.insert(table.id, table.name.clone());

            let targets = adjacency.entry(table.id).or_default();
            for column in catalog.columns(table.id) {
                if let Some(target) = column.referenced_table_id {
                    if column.is_reference() && !targets.contains(&target) {
                        targets.push(target);
                    }
                }
            }
        }

        Self {
            adjacency,
            names,
            order,
        }
    }

    /// Number of tables in the graph
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check if a table references itself directly
    pub fn has_self_reference(&self, id: TableId) -> bool {
        self.adjacency
            .get(&id)
            .map(|targets| targets.contains(&id))
            .unwrap_or(false)
    }

    /// Find all reference cycles using Tarjan's SCC algorithm.
    ///
    /// Multi-table components are cycles by definition; single-table
    /// components count only when the table references itself.
    pub fn find_cycles(&self) -> Vec<Cycle> {
        let mut finder = TarjanScc::new(self);
        finder.find_sccs();

        let mut cycles = Vec::new();
        for scc in &finder.sccs {
            if scc.len() > 1 || (scc.len() == 1 && self.has_self_reference(scc[0])) {
                cycles.push(Cycle {
                    tables: scc
                        .iter()
                        .map(|id| self.name(*id))
                        .collect(),
                });
            }
        }
        cycles
    }

    fn name(&self, id: TableId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("table#{}", id))
    }
}

/// Scan a catalog for reference defects the expansion engine would have to
/// degrade around: unresolved targets, dangling targets, and columns whose
/// type and target disagree.
pub fn scan_issues(catalog: &Catalog) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();

    for table in catalog.tables_by_name() {
        for column in catalog.columns(table.id) {
            let issue = match (column.is_reference(), column.referenced_table_id) {
                (true, None) => Some("unresolved reference (no target table id)".to_string()),
                (true, Some(target)) if catalog.table(target).is_none() => {
                    Some(format!("dangling reference (target table {} not in catalog)", target))
                }
                (false, Some(target)) => Some(format!(
                    "referenced_table_id {} set but data type '{}' is not a reference",
                    target, column.data_type
                )),
                _ => None,
            };

            if let Some(issue) = issue {
                issues.push(SchemaIssue {
                    table: table.name.clone(),
                    field: column.field_name.clone(),
                    issue,
                });
            }
        }
    }

    issues
}

/// Tarjan's Strongly Connected Components algorithm over table ids
struct TarjanScc<'a> {
    graph: &'a RefGraph,
    index_counter: usize,
    stack: Vec<TableId>,
    on_stack: AHashSet<TableId>,
    indices: AHashMap<TableId, usize>,
    lowlinks: AHashMap<TableId, usize>,
    sccs: Vec<Vec<TableId>>,
}

impl<'a> TarjanScc<'a> {
    fn new(graph: &'a RefGraph) -> Self {
        Self {
            graph,
            index_counter: 0,
            stack: Vec::new(),
            on_stack: AHashSet::new(),
            indices: AHashMap::new(),
            lowlinks: AHashMap::new(),
            sccs: Vec::new(),
        }
    }

    fn find_sccs(&mut self) {
        for node in self.graph.order.clone() {
            if !self.indices.contains_key(&node) {
                self.strongconnect(node);
            }
        }
    }

    fn strongconnect(&mut self, v: TableId) {
        self.indices.insert(v, self.index_counter);
        self.lowlinks.insert(v, self.index_counter);
        self.index_counter += 1;
        self.stack.push(v);
        self.on_stack.insert(v);

        if let Some(neighbors) = self.graph.adjacency.get(&v).cloned() {
            for w in neighbors {
                // Edges to tables missing from the catalog are dangling, not cyclic
                if !self.graph.names.contains_key(&w) {
                    continue;
                }
                if !self.indices.contains_key(&w) {
                    self.strongconnect(w);
                    let w_lowlink = self.lowlinks[&w];
                    let v_lowlink = self.lowlinks[&v];
                    self.lowlinks.insert(v, v_lowlink.min(w_lowlink));
                } else if self.on_stack.contains(&w) {
                    let w_index = self.indices[&w];
                    let v_lowlink = self.lowlinks[&v];
                    self.lowlinks.insert(v, v_lowlink.min(w_index));
                }
            }
        }

        if self.lowlinks[&v] == self.indices[&v] {
            let mut scc = Vec::new();
            loop {
                let w = self.stack.pop().expect("SCC stack cannot be empty here");
                self.on_stack.remove(&w);
                scc.push(w);
                if w == v {
                    break;
                }
            }
            self.sccs.push(scc);
        }
    }
}
