//! Error types surfaced by the ledger.
//!
//! The UI only distinguishes a handful of outcomes: the sheet could not be
//! read, a write did not go through, or the user's input was refused. The raw
//! store error is kept as a string so the UI can show it in the details panel.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The sheet could not be read, authorized, or lacks a required column.
    #[error("Unable to load the data: {0}")]
    DataUnavailable(String),

    /// An append or cell update was refused or never reached the store.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Empty item or borrower names.
    #[error("{0}")]
    InvalidInput(String),

    /// No row carries this item name.
    #[error("No item named \"{0}\".")]
    NotFound(String),

    #[error("An item named \"{0}\" already exists.")]
    DuplicateName(String),
}

impl LedgerError {
    /// Raw detail for the collapsible error panel.
    pub fn detail(&self) -> &str {
        match self {
            LedgerError::DataUnavailable(detail) | LedgerError::WriteFailed(detail) => detail,
            LedgerError::InvalidInput(detail) => detail,
            LedgerError::NotFound(name) | LedgerError::DuplicateName(name) => name,
        }
    }

    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, LedgerError::DataUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
