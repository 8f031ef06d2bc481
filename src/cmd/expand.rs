//! Expand command implementation: flatten the documented schema.

use crate::catalog::{DocStore, TableDoc};
use crate::expand::{Expander, ExpansionStats, FieldFilter};
use crate::export::{OutputFormat, RowFormatter};
use crate::flatten::{ExportRow, PathFormatter};
use anyhow::{bail, Result};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// Run the expand command
#[allow(clippy::too_many_arguments)]
pub fn run(
    db: PathBuf,
    output: Option<PathBuf>,
    format: Option<String>,
    max_depth: usize,
    indent_width: usize,
    fields: String,
    tables: Option<String>,
    exclude: Option<String>,
    include_hidden: bool,
    to_store: bool,
    progress: bool,
) -> Result<()> {
    // Parse format
    let format = if let Some(ref f) = format {
        f.parse().map_err(|e| anyhow::anyhow!("{}", e))?
    } else if let Some(ref out) = output {
        // Detect from output extension
        out.extension()
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_extension)
            .unwrap_or(OutputFormat::Table)
    } else {
        OutputFormat::Table
    };

    let filter: FieldFilter = fields.parse().map_err(|e| anyhow::anyhow!("{}", e))?;

    // Parse table filters
    let tables_filter = parse_patterns(tables);
    let exclude_filter = parse_patterns(exclude);

    if !db.exists() {
        bail!("documentation database does not exist: {}", db.display());
    }

    let store = DocStore::open(&db)?;
    let catalog = store.load_catalog()?;

    let quiet = matches!(format, OutputFormat::Json | OutputFormat::JsonLines);

    if catalog.is_empty() {
        if !quiet {
            eprintln!("No documented tables found in the store.");
        }
        return Ok(());
    }

    if !quiet {
        eprintln!(
            "Expanding references: {} [{} tables, fields: {}, max depth: {}]",
            db.display(),
            catalog.len(),
            filter,
            max_depth
        );
    }

    let selected: Vec<&TableDoc> = catalog
        .tables_by_name()
        .into_iter()
        .filter(|t| keep_table(&t.name, &tables_filter, &exclude_filter))
        .collect();

    let expander = Expander::new(&catalog)
        .with_max_depth(max_depth)
        .with_filter(filter);
    let formatter = PathFormatter::new().with_indent_width(indent_width);

    let pb = if progress && !quiet {
        let pb = ProgressBar::new(selected.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} tables {msg}",
            )
            .unwrap()
            .progress_chars("█▓▒░  "),
        );
        Some(pb)
    } else {
        None
    };

    // Base rows in table/store order, expanded rows injected directly below
    // their reference column's row
    let mut rows: Vec<ExportRow> = Vec::new();
    let mut stats = ExpansionStats::default();
    let mut expanded_refs = 0usize;

    for table in &selected {
        if let Some(ref pb) = pb {
            pb.set_message(table.name.clone());
        }
        for column in catalog.columns(table.id) {
            rows.push(formatter.base_row(&catalog, column));
            if column.is_expandable_reference() {
                let expansion = expander.expand(column);
                stats.merge(&expansion.stats);
                expanded_refs += 1;
                rows.extend(formatter.flatten(&expansion));
            }
        }
        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    if to_store {
        let written = store.write_expanded(&rows)?;
        if !quiet {
            eprintln!("Wrote {} rows to doc_expanded", written);
        }
    }

    let output_content = RowFormatter::format(&rows, &stats, format, include_hidden);

    // Write output
    if let Some(ref out_path) = output {
        let mut file = File::create(out_path)?;
        file.write_all(output_content.as_bytes())?;
        if !quiet {
            eprintln!("Export written to: {}", out_path.display());
        }
    } else {
        println!("{}", output_content);
    }

    if !quiet {
        eprintln!(
            "\nFlattened {} tables into {} rows ({} references expanded: {})",
            selected.len(),
            rows.len(),
            expanded_refs,
            stats
        );
    }

    Ok(())
}

/// Parse a comma-separated list of glob patterns
fn parse_patterns(arg: Option<String>) -> Vec<Pattern> {
    arg.map(|list| {
        list.split(',')
            .filter_map(|s| Pattern::new(s.trim()).ok())
            .collect()
    })
    .unwrap_or_default()
}

/// Apply include/exclude table filters
fn keep_table(name: &str, tables: &[Pattern], exclude: &[Pattern]) -> bool {
    if !tables.is_empty() && !tables.iter().any(|p| p.matches(name)) {
        return false;
    }
    !exclude.iter().any(|p| p.matches(name))
}
