use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::Item;

/// Single-line text input used by the add-item and borrow dialogs.
#[derive(Default, Clone)]
pub(crate) struct TextForm {
    pub(crate) value: String,
    pub(crate) error: Option<String>,
}

impl TextForm {
    /// Append a character, ignoring control keys.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.value.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.value.pop();
    }

    /// Trimmed value, or an error naming the missing field.
    pub(crate) fn required(&self, field_name: &str) -> Result<String> {
        let value = self.value.trim();
        if value.is_empty() {
            Err(anyhow!("{field_name} is required."))
        } else {
            Ok(value.to_string())
        }
    }

    /// Render the input line with a placeholder when empty.
    pub(crate) fn build_line(&self, field_name: &str) -> Line<'static> {
        let (display, style) = if self.value.is_empty() {
            ("<required>".to_string(), Style::default().fg(Color::DarkGray))
        } else {
            (self.value.clone(), Style::default().fg(Color::Yellow))
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    pub(crate) fn value_len(&self) -> usize {
        self.value.chars().count()
    }
}

/// Pending confirmation before an item is marked as returned.
#[derive(Clone)]
pub(crate) struct ConfirmReturn {
    pub(crate) item: String,
    pub(crate) borrower: String,
    pub(crate) error: Option<String>,
}

impl ConfirmReturn {
    pub(crate) fn from(item: &Item) -> Self {
        Self {
            item: item.name.clone(),
            borrower: item.borrower.clone(),
            error: None,
        }
    }
}
