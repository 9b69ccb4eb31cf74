use std::cell::Cell;
use std::rc::Rc;

use super::{CellUpdate, SheetStore, SqliteStore, StoreError, Table};

/// Wraps the in-memory SQLite store and can be told to fail.
pub(crate) struct TestStore {
    pub(crate) inner: SqliteStore,
    pub(crate) reads: Cell<usize>,
    pub(crate) appends: Cell<usize>,
    pub(crate) fail_reads: Cell<bool>,
    pub(crate) fail_writes: Cell<bool>,
}

impl TestStore {
    pub(crate) fn with_headers(headers: &[&str]) -> Rc<Self> {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        Rc::new(Self {
            inner: SqliteStore::in_memory(&headers).unwrap(),
            reads: Cell::new(0),
            appends: Cell::new(0),
            fail_reads: Cell::new(false),
            fail_writes: Cell::new(false),
        })
    }

    pub(crate) fn seeded(rows: &[[&str; 3]]) -> Rc<Self> {
        let store = Self::with_headers(&["Objet", "Statut", "Emprunteur"]);
        for row in rows {
            let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            store.inner.append_row(&values).unwrap();
        }
        store
    }

    pub(crate) fn rows(&self) -> Vec<Vec<String>> {
        self.inner.fetch_table().unwrap().rows
    }
}

fn backend_error() -> StoreError {
    StoreError::Api {
        status: 500,
        message: "backend error".to_string(),
    }
}

impl SheetStore for Rc<TestStore> {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn fetch_table(&self) -> Result<Table, StoreError> {
        self.reads.set(self.reads.get() + 1);
        if self.fail_reads.get() {
            return Err(StoreError::Api {
                status: 403,
                message: "The caller does not have permission".to_string(),
            });
        }
        self.inner.fetch_table()
    }

    fn append_row(&self, values: &[String]) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(backend_error());
        }
        self.appends.set(self.appends.get() + 1);
        self.inner.append_row(values)
    }

    fn update_cells(&self, row: usize, cells: &[CellUpdate]) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(backend_error());
        }
        self.inner.update_cells(row, cells)
    }
}
