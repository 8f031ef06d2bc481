//! Tables command implementation: list the documented catalog.

use crate::catalog::DocStore;
use anyhow::{bail, Result};
use serde::Serialize;
use std::path::PathBuf;

/// One table in the listing
#[derive(Serialize)]
struct TableListing {
    name: String,
    columns: usize,
    references: usize,
    description: String,
}

/// Run the tables command
pub fn run(db: PathBuf, json: bool) -> Result<()> {
    if !db.exists() {
        bail!("documentation database does not exist: {}", db.display());
    }

    let store = DocStore::open(&db)?;
    let catalog = store.load_catalog()?;

    let listings: Vec<TableListing> = catalog
        .tables_by_name()
        .iter()
        .map(|table| {
            let columns = catalog.columns(table.id);
            TableListing {
                name: table.name.clone(),
                columns: columns.len(),
                references: columns.iter().filter(|c| c.is_reference()).count(),
                description: table.description.clone(),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    if listings.is_empty() {
        eprintln!("No documented tables found in the store.");
        return Ok(());
    }

    let name_width = listings
        .iter()
        .map(|l| l.name.len())
        .max()
        .unwrap_or(0)
        .max("Table".len());

    println!(
        "{:<width$}  {:>7}  {:>10}  Description",
        "Table",
        "Columns",
        "References",
        width = name_width
    );
    for listing in &listings {
        println!(
            "{:<width$}  {:>7}  {:>10}  {}",
            listing.name,
            listing.columns,
            listing.references,
            truncate(&listing.description, 60),
            width = name_width
        );
    }

    eprintln!(
        "\n{} tables, {} columns, {} references",
        catalog.len(),
        catalog.column_count(),
        catalog.reference_count()
    );

    Ok(())
}

/// Truncate a description to a maximum length for the listing
fn truncate(s: &str, max_len: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= max_len {
        flat
    } else {
        let cut: String = flat.chars().take(max_len - 1).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("multi\nline", 10), "multi line");
        let long = "x".repeat(80);
        let cut = truncate(&long, 60);
        assert_eq!(cut.chars().count(), 60);
        assert!(cut.ends_with('…'));
    }
}
