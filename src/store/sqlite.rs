use std::fs;
use std::path::Path;

use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use super::{CellUpdate, SheetStore, StoreError, Table, HEADER_ROW};

/// Local stand-in for the spreadsheet. Each row keeps its sheet row number so
/// the header sits in row 1 and data rows follow, exactly like the remote
/// worksheet.
pub struct SqliteStore {
    conn: Connection,
    location: String,
}

impl SqliteStore {
    /// Open (or create) the database at `path`. A brand-new database is seeded
    /// with `headers` as its first row.
    pub fn open(path: &Path, headers: &[String]) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, headers, path.display().to_string())
    }

    /// Database that lives only as long as the store.
    pub fn in_memory(headers: &[String]) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, headers, ":memory:".to_string())
    }

    fn with_connection(
        conn: Connection,
        headers: &[String],
        location: String,
    ) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sheet_rows (
                row_number INTEGER PRIMARY KEY,
                cells TEXT NOT NULL
            )",
            [],
        )?;

        let existing: i64 = conn.query_row("SELECT COUNT(*) FROM sheet_rows", [], |row| row.get(0))?;
        if existing == 0 {
            conn.execute(
                "INSERT INTO sheet_rows (row_number, cells) VALUES (?1, ?2)",
                params![HEADER_ROW as i64, serde_json::to_string(headers)?],
            )?;
            info!("Seeded local store {location} with headers {headers:?}");
        }

        Ok(Self { conn, location })
    }
}

impl SheetStore for SqliteStore {
    fn describe(&self) -> String {
        format!("local store {}", self.location)
    }

    fn fetch_table(&self) -> Result<Table, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT row_number, cells FROM sheet_rows ORDER BY row_number")?;

        let stored = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        // Gaps in the numbering read back as blank rows so positions line up.
        let mut rows: Vec<Vec<String>> = Vec::with_capacity(stored.len());
        for (row_number, cells) in stored {
            let index = (row_number as usize).saturating_sub(HEADER_ROW);
            while rows.len() < index {
                rows.push(Vec::new());
            }
            rows.push(serde_json::from_str(&cells)?);
        }

        debug!("Read {} rows from {}", rows.len(), self.location);
        Ok(Table::from_rows(rows))
    }

    fn append_row(&self, values: &[String]) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO sheet_rows (row_number, cells)
             VALUES ((SELECT COALESCE(MAX(row_number), 0) + 1 FROM sheet_rows), ?1)",
            params![serde_json::to_string(values)?],
        )?;
        Ok(())
    }

    fn update_cells(&self, row: usize, cells: &[CellUpdate]) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;

        let stored: Option<String> = tx
            .query_row(
                "SELECT cells FROM sheet_rows WHERE row_number = ?1",
                params![row as i64],
                |r| r.get(0),
            )
            .optional()?;
        let stored = stored.ok_or(StoreError::MissingRow(row))?;

        let mut values: Vec<String> = serde_json::from_str(&stored)?;
        for update in cells {
            if values.len() <= update.column {
                values.resize(update.column + 1, String::new());
            }
            values[update.column] = update.value.clone();
        }

        tx.execute(
            "UPDATE sheet_rows SET cells = ?1 WHERE row_number = ?2",
            params![serde_json::to_string(&values)?, row as i64],
        )?;
        tx.commit()?;
        Ok(())
    }
}
