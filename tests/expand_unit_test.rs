//! Property tests for the reference expansion engine.

use schema_flatten::catalog::{Catalog, ColumnDoc, ColumnId, TableDoc, TableId};
use schema_flatten::expand::{Expander, ExpansionNode, ExpansionStats, NodeKind};
use schema_flatten::export::{OutputFormat, RowFormatter};
use schema_flatten::flatten::PathFormatter;

fn table(id: i64, name: &str) -> TableDoc {
    TableDoc {
        id: TableId(id),
        name: name.to_string(),
        description: String::new(),
        calculated_fields_description: String::new(),
        created_at: String::new(),
    }
}

fn field(id: i64, table_id: i64, name: &str) -> ColumnDoc {
    ColumnDoc {
        id: ColumnId(id),
        table_id: TableId(table_id),
        field_name: name.to_string(),
        description: format!("{} field", name),
        data_type: "String".to_string(),
        is_key: true,
        is_calculated: false,
        referenced_table_id: None,
        display_on_export: false,
        created_at: String::new(),
    }
}

fn reference(id: i64, table_id: i64, name: &str, target: i64) -> ColumnDoc {
    ColumnDoc {
        id: ColumnId(id),
        table_id: TableId(table_id),
        field_name: name.to_string(),
        description: format!("{} reference", name),
        data_type: "Reference".to_string(),
        is_key: true,
        is_calculated: false,
        referenced_table_id: Some(TableId(target)),
        display_on_export: false,
        created_at: String::new(),
    }
}

fn terminal_nodes<'a>(node: &'a ExpansionNode, out: &mut Vec<&'a ExpansionNode>) {
    if node.kind.is_terminal() {
        out.push(node);
        return;
    }
    for child in &node.children {
        terminal_nodes(child, out);
    }
}

fn node_count(node: &ExpansionNode) -> usize {
    1 + node.children.iter().map(node_count).sum::<usize>()
}

// =============================================================================
// Termination
// =============================================================================

#[test]
fn test_terminates_on_complete_reference_digraph() {
    // Three tables, each referencing all three (including itself). Every
    // branch must close through a cycle marker or the depth limit.
    let mut catalog = Catalog::new();
    for id in 1..=3 {
        catalog.add_table(table(id, &format!("T{}", id)));
    }
    let mut next_id = 100;
    for owner in 1..=3 {
        for target in 1..=3 {
            catalog.add_column(reference(
                next_id,
                owner,
                &format!("To{}", target),
                target,
            ));
            next_id += 1;
        }
    }

    let expander = Expander::new(&catalog).with_max_depth(10);
    for root in catalog.columns(TableId(1)) {
        let expansion = expander.expand(root);
        let mut terminals = Vec::new();
        terminal_nodes(&expansion.root, &mut terminals);

        assert!(!terminals.is_empty());
        assert_eq!(expansion.stats.terminals(), terminals.len());
        assert_eq!(expansion.stats.leaves, 0);
        // Finite tree on a fully connected graph
        assert!(node_count(&expansion.root) < 100);
    }
}

#[test]
fn test_depth_bound_holds_under_branching() {
    // Each table carries two references to the next, doubling the branch
    // count per level.
    let mut catalog = Catalog::new();
    catalog.add_table(table(0, "Root"));
    for id in 1..=6 {
        catalog.add_table(table(id, &format!("Level{}", id)));
    }
    catalog.add_column(reference(100, 0, "Entry", 1));
    let mut next_id = 101;
    for id in 1..=5 {
        catalog.add_column(reference(next_id, id, "Left", id + 1));
        catalog.add_column(reference(next_id + 1, id, "Right", id + 1));
        next_id += 2;
    }
    catalog.add_column(field(200, 6, "Value"));

    let max_depth = 3;
    let root = catalog.columns(TableId(0))[0].clone();
    let expansion = Expander::new(&catalog).with_max_depth(max_depth).expand(&root);

    let mut terminals = Vec::new();
    terminal_nodes(&expansion.root, &mut terminals);
    assert!(terminals.iter().all(|n| n.depth <= max_depth));
    assert!(terminals
        .iter()
        .all(|n| n.kind == NodeKind::DepthLimit));
    // Branches double per level: 2 at depth 1, 4 at depth 2, 8 truncated at 3
    assert_eq!(terminals.len(), 8);
}

// =============================================================================
// Cycle handling
// =============================================================================

#[test]
fn test_cycle_closes_once_between_two_tables() {
    // A references B, B references A. Expanding from A must visit B exactly
    // once and close with a cycle marker, not by exhausting the depth limit.
    let mut catalog = Catalog::new();
    catalog.add_table(table(1, "A"));
    catalog.add_table(table(2, "B"));
    catalog.add_column(reference(10, 1, "BRef", 2));
    catalog.add_column(reference(20, 2, "ARef", 1));

    let root = catalog.columns(TableId(1))[0].clone();
    let expansion = Expander::new(&catalog).with_max_depth(5).expand(&root);

    let mut terminals = Vec::new();
    terminal_nodes(&expansion.root, &mut terminals);

    assert_eq!(terminals.len(), 1);
    assert_eq!(terminals[0].field_path.join("."), "BRef.ARef");
    assert_eq!(terminals[0].kind, NodeKind::Cycle);
    assert_eq!(expansion.stats.cycles, 1);
    assert_eq!(expansion.stats.depth_limited, 0);
}

#[test]
fn test_same_table_expands_in_parallel_branches() {
    // Two sibling references to the same table are both expanded; cycle
    // state never leaks between branches.
    let mut catalog = Catalog::new();
    catalog.add_table(table(1, "Root"));
    catalog.add_table(table(2, "Middle"));
    catalog.add_table(table(3, "Shared"));
    catalog.add_column(reference(10, 1, "Middle", 2));
    catalog.add_column(reference(20, 2, "First", 3));
    catalog.add_column(reference(21, 2, "Second", 3));
    catalog.add_column(field(30, 3, "Value"));

    let root = catalog.columns(TableId(1))[0].clone();
    let expansion = Expander::new(&catalog).expand(&root);

    let mut terminals = Vec::new();
    terminal_nodes(&expansion.root, &mut terminals);

    let paths: Vec<String> = terminals.iter().map(|n| n.field_path.join(".")).collect();
    assert_eq!(paths, vec!["Middle.First.Value", "Middle.Second.Value"]);
    assert_eq!(expansion.stats.leaves, 2);
    assert_eq!(expansion.stats.cycles, 0);
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_repeated_expansion_is_byte_identical() {
    let mut catalog = Catalog::new();
    catalog.add_table(table(1, "Order"));
    catalog.add_table(table(2, "Part"));
    catalog.add_table(table(3, "Site"));
    catalog.add_column(reference(10, 1, "Part", 2));
    catalog.add_column(field(20, 2, "Name"));
    catalog.add_column(reference(21, 2, "Site", 3));
    catalog.add_column(reference(30, 3, "Parent", 3));
    catalog.add_column(field(31, 3, "Value"));

    let render = || {
        let expander = Expander::new(&catalog);
        let formatter = PathFormatter::new();
        let mut rows = Vec::new();
        let mut stats = ExpansionStats::default();
        for column in catalog.columns(TableId(1)) {
            let expansion = expander.expand(column);
            stats.merge(&expansion.stats);
            rows.extend(formatter.flatten(&expansion));
        }
        RowFormatter::format(&rows, &stats, OutputFormat::Csv, true)
    };

    let first = render();
    let second = render();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
