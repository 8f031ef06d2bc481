//! Check command implementation: schema health report.

use crate::catalog::{scan_issues, DocStore, RefGraph, SchemaIssue};
use anyhow::{bail, Result};
use serde::Serialize;
use std::path::PathBuf;

/// JSON document for the check report
#[derive(Serialize)]
struct CheckReport {
    tables: usize,
    columns: usize,
    references: usize,
    cycles: Vec<Vec<String>>,
    issues: Vec<SchemaIssue>,
}

/// Run the check command
pub fn run(db: PathBuf, json: bool, strict: bool) -> Result<()> {
    if !db.exists() {
        bail!("documentation database does not exist: {}", db.display());
    }

    let store = DocStore::open(&db)?;
    let catalog = store.load_catalog()?;

    let graph = RefGraph::from_catalog(&catalog);
    let cycles = graph.find_cycles();
    let issues = scan_issues(&catalog);

    if json {
        let report = CheckReport {
            tables: catalog.len(),
            columns: catalog.column_count(),
            references: catalog.reference_count(),
            cycles: cycles.iter().map(|c| c.tables.clone()).collect(),
            issues: issues.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!(
            "Checked {} tables, {} columns, {} references",
            catalog.len(),
            catalog.column_count(),
            catalog.reference_count()
        );

        // Cycles are legal schema (expansion closes them); report for
        // visibility, not as defects.
        if cycles.is_empty() {
            eprintln!("No reference cycles.");
        } else {
            eprintln!("\nReference cycles ({}):", cycles.len());
            for (i, cycle) in cycles.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, cycle.display());
            }
        }

        if issues.is_empty() {
            eprintln!("No schema issues.");
        } else {
            eprintln!("\nSchema issues ({}):", issues.len());
            for issue in &issues {
                eprintln!("  {}.{}: {}", issue.table, issue.field, issue.issue);
            }
        }
    }

    if strict && !issues.is_empty() {
        bail!(
            "{} schema issue{} found",
            issues.len(),
            if issues.len() == 1 { "" } else { "s" }
        );
    }

    Ok(())
}
