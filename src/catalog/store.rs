//! DuckDB-backed document store.
//!
//! The documented schema lives in a DuckDB database file: `doc_tables` and
//! `doc_columns` hold the upstream ingestion's output, `doc_expanded` holds
//! the flattened write-back. Reads happen in one preload pass that
//! materializes a `Catalog`, so expansion never touches the connection.

use super::{parse_flag, Catalog, ColumnDoc, ColumnId, TableDoc, TableId};
use crate::flatten::ExportRow;
use anyhow::{Context, Result};
use duckdb::types::ValueRef;
use duckdb::{params, Connection};
use std::path::Path;

/// Handle to a documentation database
pub struct DocStore {
    conn: Connection,
}

impl DocStore {
    /// Open a documentation database file, creating the schema if needed
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| {
            format!("Failed to open documentation database: {}", path.display())
        })?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .context("Failed to create in-memory DuckDB database")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS doc_tables (
                    id INTEGER PRIMARY KEY,
                    name VARCHAR,
                    description TEXT,
                    calculated_fields_description TEXT,
                    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                );
                CREATE TABLE IF NOT EXISTS doc_columns (
                    id INTEGER PRIMARY KEY,
                    table_id INTEGER,
                    field_name VARCHAR,
                    description TEXT,
                    data_type VARCHAR,
                    is_key VARCHAR,
                    is_calculated BOOLEAN,
                    referenced_table_id INTEGER,
                    display_on_export BOOLEAN DEFAULT FALSE,
                    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                );
                CREATE TABLE IF NOT EXISTS doc_expanded (
                    id VARCHAR PRIMARY KEY,
                    table_id INTEGER,
                    table_name VARCHAR,
                    field_name VARCHAR,
                    description TEXT,
                    data_type VARCHAR,
                    is_key VARCHAR,
                    is_calculated BOOLEAN,
                    referenced_table VARCHAR,
                    is_extended BOOLEAN,
                    display_on_export BOOLEAN,
                    created_at VARCHAR,
                    referenced_table_id INTEGER,
                    display_order INTEGER
                );",
            )
            .context("Failed to initialize document store schema")?;
        Ok(())
    }

    /// Materialize the full catalog snapshot.
    ///
    /// Tables load by name, columns by id; the column order here is the
    /// repository order that expansion preserves downstream.
    pub fn load_catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::new();

        {
            let mut stmt = self
                .conn
                .prepare(
                    "SELECT id, name, description, calculated_fields_description, created_at
                     FROM doc_tables ORDER BY name",
                )
                .context("Failed to query doc_tables")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                catalog.add_table(TableDoc {
                    id: TableId(row.get(0)?),
                    name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    calculated_fields_description: row
                        .get::<_, Option<String>>(3)?
                        .unwrap_or_default(),
                    created_at: timestamp_to_string(row.get_ref(4)?),
                });
            }
        }

        {
            let mut stmt = self
                .conn
                .prepare(
                    "SELECT id, table_id, field_name, description, data_type, is_key,
                            is_calculated, referenced_table_id, display_on_export, created_at
                     FROM doc_columns ORDER BY id",
                )
                .context("Failed to query doc_columns")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                catalog.add_column(ColumnDoc {
                    id: ColumnId(row.get(0)?),
                    table_id: TableId(row.get(1)?),
                    field_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    data_type: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    is_key: row
                        .get::<_, Option<String>>(5)?
                        .map(|v| parse_flag(&v))
                        .unwrap_or(false),
                    is_calculated: row.get::<_, Option<bool>>(6)?.unwrap_or(false),
                    referenced_table_id: row.get::<_, Option<i64>>(7)?.map(TableId),
                    display_on_export: row.get::<_, Option<bool>>(8)?.unwrap_or(false),
                    created_at: timestamp_to_string(row.get_ref(9)?),
                });
            }
        }

        Ok(catalog)
    }

    /// Replace the contents of `doc_expanded` with the given rows.
    ///
    /// Rows are numbered by `display_order` in the order given, which is the
    /// export order.
    pub fn write_expanded(&self, rows: &[ExportRow]) -> Result<usize> {
        self.conn
            .execute("DELETE FROM doc_expanded", [])
            .context("Failed to clear doc_expanded")?;

        let mut stmt = self
            .conn
            .prepare(
                "INSERT INTO doc_expanded (
                    id, table_id, table_name, field_name, description, data_type,
                    is_key, is_calculated, referenced_table, is_extended,
                    display_on_export, created_at, referenced_table_id, display_order
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .context("Failed to prepare doc_expanded insert")?;

        for (order, row) in rows.iter().enumerate() {
            stmt.execute(params![
                row.id,
                row.table_id.0,
                row.table_name,
                row.field_name,
                row.description,
                row.data_type,
                if row.is_key { "Yes" } else { "No" },
                row.is_calculated,
                row.referenced_table,
                row.is_extended,
                row.display_on_export,
                row.created_at,
                row.referenced_table_id.map(|id| id.0),
                (order + 1) as i64,
            ])
            .with_context(|| format!("Failed to insert expanded row '{}'", row.id))?;
        }

        Ok(rows.len())
    }

    /// Insert a table row. Upstream ingestion owns merge semantics; this is
    /// a plain insert for fixtures and one-shot loads.
    pub fn add_table(&self, table: &TableDoc) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO doc_tables (id, name, description, calculated_fields_description)
                 VALUES (?, ?, ?, ?)",
                params![
                    table.id.0,
                    table.name,
                    table.description,
                    table.calculated_fields_description
                ],
            )
            .with_context(|| format!("Failed to insert table '{}'", table.name))?;
        Ok(())
    }

    /// Insert a column row. Same caveat as [`DocStore::add_table`].
    pub fn add_column(&self, column: &ColumnDoc) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO doc_columns (
                    id, table_id, field_name, description, data_type,
                    is_key, is_calculated, referenced_table_id, display_on_export
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    column.id.0,
                    column.table_id.0,
                    column.field_name,
                    column.description,
                    column.data_type,
                    if column.is_key { "Yes" } else { "No" },
                    column.is_calculated,
                    column.referenced_table_id.map(|id| id.0),
                    column.display_on_export,
                ],
            )
            .with_context(|| format!("Failed to insert column '{}'", column.field_name))?;
        Ok(())
    }

    /// Number of rows currently in `doc_expanded`
    pub fn expanded_row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM doc_expanded", [], |row| row.get(0))
            .context("Failed to count doc_expanded rows")?;
        Ok(count as usize)
    }

    /// Get the underlying DuckDB connection (for advanced use)
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Render a DuckDB value holding a timestamp for display.
///
/// DuckDB timestamps are microseconds since epoch.
fn timestamp_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Timestamp(_, micros) => {
            let secs = micros / 1_000_000;
            let nanos = ((micros % 1_000_000) * 1000) as u32;
            if let Some(dt) = chrono::DateTime::from_timestamp(secs, nanos) {
                dt.format("%Y-%m-%d %H:%M:%S").to_string()
            } else {
                micros.to_string()
            }
        }
        ValueRef::Text(s) => String::from_utf8_lossy(s).to_string(),
        ValueRef::Null => String::new(),
        other => format!("{:?}", other),
    }
}
