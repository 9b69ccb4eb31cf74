//! The item ledger: reads the worksheet into items and applies the lending
//! transitions. Every mutation re-reads the sheet and resolves the row by item
//! name right before writing, so a stale listing never decides which row gets
//! overwritten.

use std::time::Duration;

use log::{debug, info, warn};

use crate::cache::Snapshot;
use crate::error::{LedgerError, Result};
use crate::models::{Columns, Item, ItemStatus, StatusLabels};
use crate::store::{CellUpdate, SheetStore, Table};

/// What a borrow or return actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The item was already in the target state; nothing was written.
    Unchanged,
}

/// Zero-based positions of the required columns in the current sheet.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    name: usize,
    status: usize,
    borrower: usize,
}

impl ColumnMap {
    fn resolve(table: &Table, columns: &Columns) -> Result<Self> {
        let find = |header: &str| {
            table
                .column(header)
                .ok_or_else(|| LedgerError::DataUnavailable(format!("missing column \"{header}\"")))
        };
        Ok(Self {
            name: find(&columns.name)?,
            status: find(&columns.status)?,
            borrower: find(&columns.borrower)?,
        })
    }

    fn width(&self) -> usize {
        self.name.max(self.status).max(self.borrower) + 1
    }
}

pub struct Ledger {
    store: Box<dyn SheetStore>,
    columns: Columns,
    labels: StatusLabels,
    snapshot: Snapshot<Vec<Item>>,
}

impl Ledger {
    pub fn new(
        store: Box<dyn SheetStore>,
        columns: Columns,
        labels: StatusLabels,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            columns,
            labels,
            snapshot: Snapshot::new(ttl),
        }
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }

    pub fn web_url(&self) -> Option<String> {
        self.store.web_url()
    }

    /// Read every item straight from the store, bypassing the snapshot.
    pub fn load(&self) -> Result<Vec<Item>> {
        let (table, map) = self.fresh_table()?;
        Ok(self.project(&table, map))
    }

    /// Items for display, served from the snapshot while it is fresh.
    pub fn list(&mut self) -> Result<Vec<Item>> {
        if let Some(items) = self.snapshot.get() {
            debug!(
                "Serving {} items from snapshot ({:?} old)",
                items.len(),
                self.snapshot.age().unwrap_or_default()
            );
            return Ok(items.clone());
        }
        let items = self.load()?;
        self.snapshot.store(items.clone());
        Ok(items)
    }

    /// Drop the snapshot so the next `list` reads the store.
    pub fn invalidate(&mut self) {
        self.snapshot.invalidate();
    }

    /// Append a new free item.
    pub fn add(&mut self, name: &str) -> Result<Item> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidInput("Item name is required.".to_string()));
        }

        let (table, map) = self.fresh_table()?;
        if find_row(&table, map, name).is_some() {
            return Err(LedgerError::DuplicateName(name.to_string()));
        }

        let mut row = vec![String::new(); table.headers.len().max(map.width())];
        row[map.name] = name.to_string();
        row[map.status] = ItemStatus::Free.label(&self.labels).to_string();

        self.store
            .append_row(&row)
            .map_err(|e| LedgerError::WriteFailed(e.to_string()))?;

        info!("Added item \"{name}\" to {}", self.store.describe());
        self.invalidate();
        Ok(Item::new(name))
    }

    /// Lend a free item to `borrower`. Borrowing an item that is already on
    /// loan leaves it untouched.
    pub fn borrow(&mut self, item_name: &str, borrower: &str) -> Result<Outcome> {
        let borrower = borrower.trim();
        if borrower.is_empty() {
            return Err(LedgerError::InvalidInput(
                "Borrower name is required.".to_string(),
            ));
        }

        let (table, map) = self.fresh_table()?;
        let (index, item) = self.resolve(&table, map, item_name)?;
        if item.status != ItemStatus::Free {
            debug!("\"{item_name}\" is already on loan to {}", item.borrower);
            return Ok(Outcome::Unchanged);
        }

        self.write_transition(
            index,
            &[
                CellUpdate::new(map.status, ItemStatus::OnLoan.label(&self.labels)),
                CellUpdate::new(map.borrower, borrower),
            ],
        )?;
        info!("\"{item_name}\" lent to {borrower}");
        Ok(Outcome::Applied)
    }

    /// Mark an item on loan as free again. Returning a free item is a no-op.
    pub fn return_item(&mut self, item_name: &str) -> Result<Outcome> {
        let (table, map) = self.fresh_table()?;
        let (index, item) = self.resolve(&table, map, item_name)?;
        if item.status != ItemStatus::OnLoan {
            debug!("\"{item_name}\" is already free");
            return Ok(Outcome::Unchanged);
        }

        self.write_transition(
            index,
            &[
                CellUpdate::new(map.status, ItemStatus::Free.label(&self.labels)),
                CellUpdate::new(map.borrower, ""),
            ],
        )?;
        info!("\"{item_name}\" returned by {}", item.borrower);
        Ok(Outcome::Applied)
    }

    /// Both cells of a transition go out in one batch. The batch is not a
    /// conditional write: two users acting on the same row still race.
    fn write_transition(&mut self, index: usize, cells: &[CellUpdate]) -> Result<()> {
        self.store
            .update_cells(Table::sheet_row(index), cells)
            .map_err(|e| LedgerError::WriteFailed(e.to_string()))?;
        self.invalidate();
        Ok(())
    }

    fn fresh_table(&self) -> Result<(Table, ColumnMap)> {
        let table = self
            .store
            .fetch_table()
            .map_err(|e| LedgerError::DataUnavailable(e.to_string()))?;
        let map = ColumnMap::resolve(&table, &self.columns)?;
        Ok((table, map))
    }

    fn resolve(&self, table: &Table, map: ColumnMap, item_name: &str) -> Result<(usize, Item)> {
        let index = find_row(table, map, item_name)
            .ok_or_else(|| LedgerError::NotFound(item_name.to_string()))?;
        Ok((index, self.item_at(table, map, index)))
    }

    fn project(&self, table: &Table, map: ColumnMap) -> Vec<Item> {
        (0..table.rows.len())
            .filter(|&index| !table.cell(index, map.name).trim().is_empty())
            .map(|index| self.item_at(table, map, index))
            .collect()
    }

    fn item_at(&self, table: &Table, map: ColumnMap, index: usize) -> Item {
        let name = table.cell(index, map.name).to_string();
        let borrower = table.cell(index, map.borrower).trim().to_string();
        let raw_status = table.cell(index, map.status);

        let status = ItemStatus::from_label(raw_status, &self.labels).unwrap_or_else(|| {
            let guessed = if borrower.is_empty() {
                ItemStatus::Free
            } else {
                ItemStatus::OnLoan
            };
            warn!("Unrecognized status \"{raw_status}\" for \"{name}\", treating as {guessed}");
            guessed
        });

        Item {
            name,
            status,
            borrower,
        }
    }
}

/// First data row whose name cell equals `name`, ignoring surrounding
/// whitespace on both sides.
fn find_row(table: &Table, map: ColumnMap, name: &str) -> Option<usize> {
    let name = name.trim();
    let mut matches =
        (0..table.rows.len()).filter(|&index| table.cell(index, map.name).trim() == name);
    let first = matches.next()?;
    if matches.next().is_some() {
        warn!("Several rows are named \"{name}\"; using sheet row {}", Table::sheet_row(first));
    }
    Some(first)
}
