//! Domain models shared by the ledger and the TUI. These types stay plain data
//! holders; the ledger owns the rules for moving an item between states and the
//! store owns the mapping to spreadsheet cells.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Borrowing state of a single item. An item starts `Free` when it is added and
/// moves back and forth between the two states forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Free,
    OnLoan,
}

impl ItemStatus {
    /// Text written to the sheet for this state.
    pub fn label<'a>(&self, labels: &'a StatusLabels) -> &'a str {
        match self {
            ItemStatus::Free => &labels.free,
            ItemStatus::OnLoan => &labels.on_loan,
        }
    }

    /// Classify a raw status cell. Matching ignores case and surrounding
    /// whitespace because the sheet is also edited by hand. Returns `None` when
    /// the text matches neither label.
    pub fn from_label(raw: &str, labels: &StatusLabels) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        if raw == labels.free.trim().to_lowercase() {
            Some(ItemStatus::Free)
        } else if raw == labels.on_loan.trim().to_lowercase() {
            Some(ItemStatus::OnLoan)
        } else {
            None
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Free => write!(f, "Free"),
            ItemStatus::OnLoan => write!(f, "On loan"),
        }
    }
}

/// One loanable object as read from a row of the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Lookup key. Every mutation re-resolves the row by this name against a
    /// fresh read, so it has to stay unique.
    pub name: String,
    pub status: ItemStatus,
    /// Empty whenever the item is free.
    pub borrower: String,
}

impl Item {
    /// A freshly added item: free and without a borrower.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ItemStatus::Free,
            borrower: String::new(),
        }
    }

    pub fn is_free(&self) -> bool {
        self.status == ItemStatus::Free
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Header names of the three columns the ledger relies on. The sheet may carry
/// extra columns; they are preserved untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
    pub name: String,
    pub status: String,
    pub borrower: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            name: "Objet".to_string(),
            status: "Statut".to_string(),
            borrower: "Emprunteur".to_string(),
        }
    }
}

impl Columns {
    /// Header row used when a fresh local store is created.
    pub fn header_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.status.clone(),
            self.borrower.clone(),
        ]
    }
}

/// Locale-specific strings stored in the status column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusLabels {
    pub free: String,
    pub on_loan: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            free: "Disponible".to_string(),
            on_loan: "Emprunté".to_string(),
        }
    }
}
