//! Ratatui front-end: one screen with the item table, a borrow dialog, a return
//! confirmation, and an add-item form. Drawing reads only [`state::ViewState`];
//! key handling in [`app`] is the sole place that talks to the ledger.

mod app;
mod forms;
mod helpers;
mod render;
mod state;
mod terminal;

pub use app::App;
pub use terminal::run_app;
