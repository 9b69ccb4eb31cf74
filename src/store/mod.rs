//! Row-oriented backing stores. The ledger only needs three operations from a
//! store: read every row, append a row, and overwrite a few cells of one row.
//! Google Sheets is the production backend; the SQLite backend keeps the same
//! row numbering so it can stand in offline and under test.

mod auth;
mod google;
mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::config::{Backend, Config};

pub use auth::{ServiceAccountKey, TokenProvider, SCOPES};
pub use google::{column_letter, spreadsheet_id_from, GoogleSheetsStore};
pub use sqlite::SqliteStore;

/// Sheet row holding the headers. Data rows start right below it.
pub const HEADER_ROW: usize = 1;

/// Everything that can go wrong while talking to a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("spreadsheet API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row {0} does not exist")]
    MissingRow(usize),

    #[error("invalid spreadsheet address: {0}")]
    InvalidAddress(String),
}

/// A cell write inside a single row. `column` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub column: usize,
    pub value: String,
}

impl CellUpdate {
    pub fn new(column: usize, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

/// Full contents of a worksheet: header row plus data rows. Data rows may be
/// shorter than the header when trailing cells are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Split raw sheet rows into headers and data.
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let headers = rows.remove(0).into_iter().map(|h| h.trim().to_string()).collect();
        Self { headers, rows }
    }

    /// Zero-based position of the header named `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name.trim())
    }

    /// Cell text, empty when the row is shorter than `column`.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Sheet row number for the data row at `index`.
    pub fn sheet_row(index: usize) -> usize {
        index + HEADER_ROW + 1
    }
}

/// Operations the ledger consumes from a backing store.
pub trait SheetStore {
    /// Human-readable location, used in logs and the UI title.
    fn describe(&self) -> String;

    fn fetch_table(&self) -> std::result::Result<Table, StoreError>;

    fn append_row(&self, values: &[String]) -> std::result::Result<(), StoreError>;

    /// Overwrite several cells of sheet row `row` in one request.
    fn update_cells(&self, row: usize, cells: &[CellUpdate])
        -> std::result::Result<(), StoreError>;

    /// Link for opening the document in a browser, if there is one.
    fn web_url(&self) -> Option<String> {
        None
    }
}

/// Build the store selected by the configuration.
pub fn open_store(config: &Config) -> Result<Box<dyn SheetStore>> {
    match config.backend {
        Backend::GoogleSheets => {
            let key = config
                .service_account()
                .context("failed to load service account credentials")?;
            let spreadsheet = config
                .sheet
                .spreadsheet
                .as_deref()
                .context("no spreadsheet configured (set sheet.spreadsheet or MATERIAUTHEQUE_SPREADSHEET)")?;
            let store = GoogleSheetsStore::new(
                spreadsheet,
                &config.sheet.worksheet,
                TokenProvider::new(key, config.http.timeout())
                    .context("failed to build token provider")?,
                config.http.timeout(),
            )
            .context("failed to build Google Sheets client")?;
            Ok(Box::new(store))
        }
        Backend::Local => {
            let path = config.local_db_path()?;
            let store = SqliteStore::open(&path, &config.columns.header_row())
                .with_context(|| format!("failed to open local store at {}", path.display()))?;
            Ok(Box::new(store))
        }
    }
}
