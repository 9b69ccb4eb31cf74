//! Core library surface for the Matériauthèque lending tracker.
//!
//! The binary wires these pieces together: configuration picks a backing
//! store, the ledger applies lending transitions against it, and the TUI
//! renders the result.
pub mod cache;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod store;
pub mod ui;

/// Configuration loading and the backend switch.
pub use config::{Backend, Config};

pub use error::LedgerError;
pub use ledger::{Ledger, Outcome};

/// The domain types other layers manipulate.
pub use models::{Columns, Item, ItemStatus, StatusLabels};

pub use store::{open_store, SheetStore};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
