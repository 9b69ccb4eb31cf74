//! Everything the renderer needs to know about the screen lives in
//! [`ViewState`]. The app mutates it in response to keys; `render` only reads it.

use ratatui::style::{Color, Style};

use crate::models::Item;

use super::forms::{ConfirmReturn, TextForm};

/// Which dialog, if any, is open on top of the item table.
pub(crate) enum Mode {
    Normal,
    AddingItem(TextForm),
    Borrowing { item: String, form: TextForm },
    ConfirmReturn(ConfirmReturn),
}

/// Holds the footer message text plus its severity.
pub(crate) struct StatusMessage {
    pub(crate) text: String,
    pub(crate) kind: StatusKind,
}

/// Severity levels shown in the footer.
pub(crate) enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    pub(crate) fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Last failed read, shown as a banner with a collapsible detail panel.
pub(crate) struct LoadFailure {
    pub(crate) detail: String,
}

pub(crate) struct ViewState {
    pub(crate) title: String,
    pub(crate) items: Vec<Item>,
    pub(crate) selected: usize,
    pub(crate) mode: Mode,
    pub(crate) status: Option<StatusMessage>,
    pub(crate) load_failure: Option<LoadFailure>,
    pub(crate) details_open: bool,
    pub(crate) can_open_sheet: bool,
}

impl ViewState {
    pub(crate) fn new(title: String, can_open_sheet: bool) -> Self {
        Self {
            title,
            items: Vec::new(),
            selected: 0,
            mode: Mode::Normal,
            status: None,
            load_failure: None,
            details_open: false,
            can_open_sheet,
        }
    }

    pub(crate) fn current_item(&self) -> Option<&Item> {
        self.items.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, delta: isize) {
        if self.items.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.items.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    /// Replace the listing, keeping the cursor on `focus` when it still exists
    /// and otherwise clamping the old position.
    pub(crate) fn replace_items(&mut self, items: Vec<Item>, focus: Option<&str>) {
        let focus = focus
            .map(str::to_string)
            .or_else(|| self.current_item().map(|item| item.name.clone()));
        self.items = items;

        if let Some(index) = focus.and_then(|name| self.items.iter().position(|i| i.name == name)) {
            self.selected = index;
        } else {
            self.move_selection(0);
        }
    }

    pub(crate) fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    pub(crate) fn clear_status(&mut self) {
        self.status = None;
    }
}
