use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use log::warn;
use open::that as open_link;
use ratatui::Frame;

use crate::error::LedgerError;
use crate::ledger::{Ledger, Outcome};
use crate::models::ItemStatus;

use super::forms::{ConfirmReturn, TextForm};
use super::helpers::surface_error;
use super::render::render;
use super::state::{LoadFailure, Mode, StatusKind, ViewState};

/// Central application state: the ledger plus everything on screen.
pub struct App {
    ledger: Ledger,
    view: ViewState,
}

impl App {
    /// Build the app and show whatever the first read returns.
    pub fn new(ledger: Ledger) -> Self {
        let view = ViewState::new(ledger.describe(), ledger.web_url().is_some());
        let mut app = Self { ledger, view };
        app.sync_items(None);
        app
    }

    /// Handle one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.view.mode, Mode::Normal);

        let mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingItem(form) => self.handle_add_item(code, form)?,
            Mode::Borrowing { item, form } => self.handle_borrow(code, item, form)?,
            Mode::ConfirmReturn(confirm) => self.handle_confirm_return(code, confirm)?,
        };

        // Every interaction re-reads the listing; the snapshot keeps that cheap.
        if matches!(mode, Mode::Normal) && !exit {
            self.sync_items(None);
        }
        self.view.mode = mode;
        Ok(exit)
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        render(frame, &self.view);
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Up => self.view.move_selection(-1),
            KeyCode::Down => self.view.move_selection(1),
            KeyCode::PageUp => self.view.move_selection(-10),
            KeyCode::PageDown => self.view.move_selection(10),
            KeyCode::Home => self.view.selected = 0,
            KeyCode::End => self.view.select_last(),
            KeyCode::Char('+') | KeyCode::Char('a') => {
                self.view.clear_status();
                return Ok(Mode::AddingItem(TextForm::default()));
            }
            KeyCode::Char('b') | KeyCode::Char('B') => return Ok(self.start_borrow()),
            KeyCode::Char('r') | KeyCode::Char('R') => return Ok(self.start_return()),
            KeyCode::Char('g') | KeyCode::F(5) => {
                self.ledger.invalidate();
                self.view.set_status("Reloading from the sheet.", StatusKind::Info);
            }
            KeyCode::Char('d') | KeyCode::Char('D') => {
                if self.view.load_failure.is_some() {
                    self.view.details_open = !self.view.details_open;
                }
            }
            KeyCode::Char('o') | KeyCode::Char('O') => self.open_sheet(),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    /// Open the borrow dialog when the selected item is free.
    fn start_borrow(&mut self) -> Mode {
        let Some(item) = self.view.current_item().cloned() else {
            self.view
                .set_status("No item selected to borrow.", StatusKind::Error);
            return Mode::Normal;
        };
        if item.status != ItemStatus::Free {
            self.view.set_status(
                format!("{} is already on loan to {}.", item.name, item.borrower),
                StatusKind::Error,
            );
            return Mode::Normal;
        }
        self.view.clear_status();
        Mode::Borrowing {
            item: item.name,
            form: TextForm::default(),
        }
    }

    /// Ask for confirmation when the selected item is on loan.
    fn start_return(&mut self) -> Mode {
        let Some(item) = self.view.current_item().cloned() else {
            self.view
                .set_status("No item selected to return.", StatusKind::Error);
            return Mode::Normal;
        };
        if item.status != ItemStatus::OnLoan {
            self.view
                .set_status(format!("{} is not on loan.", item.name), StatusKind::Error);
            return Mode::Normal;
        }
        self.view.clear_status();
        Mode::ConfirmReturn(ConfirmReturn::from(&item))
    }

    fn handle_add_item(&mut self, code: KeyCode, mut form: TextForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.view.set_status("Add item cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => {
                let name = match form.required("Item name") {
                    Ok(name) => name,
                    Err(err) => {
                        form.error = Some(surface_error(&err));
                        return Ok(Mode::AddingItem(form));
                    }
                };
                match self.ledger.add(&name) {
                    Ok(item) => {
                        self.view
                            .set_status(format!("Added {}.", item.name), StatusKind::Info);
                        self.sync_items(Some(&item.name));
                        return Ok(Mode::Normal);
                    }
                    Err(err) => form.error = Some(self.report_failure(&err)),
                }
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::AddingItem(form))
    }

    fn handle_borrow(&mut self, code: KeyCode, item: String, mut form: TextForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.view.set_status("Borrow cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => {
                let borrower = match form.required("Borrower name") {
                    Ok(borrower) => borrower,
                    Err(err) => {
                        form.error = Some(surface_error(&err));
                        return Ok(Mode::Borrowing { item, form });
                    }
                };
                match self.ledger.borrow(&item, &borrower) {
                    Ok(Outcome::Applied) => {
                        self.view.set_status(
                            format!("{item} is now on loan to {borrower}."),
                            StatusKind::Info,
                        );
                        self.sync_items(Some(&item));
                        return Ok(Mode::Normal);
                    }
                    Ok(Outcome::Unchanged) => {
                        self.view.set_status(
                            format!("{item} was already on loan; the list has been refreshed."),
                            StatusKind::Error,
                        );
                        self.ledger.invalidate();
                        self.sync_items(Some(&item));
                        return Ok(Mode::Normal);
                    }
                    Err(err) => form.error = Some(self.report_failure(&err)),
                }
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::Borrowing { item, form })
    }

    fn handle_confirm_return(&mut self, code: KeyCode, mut confirm: ConfirmReturn) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.view.set_status("Return cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.ledger.return_item(&confirm.item) {
                    Ok(Outcome::Applied) => {
                        self.view
                            .set_status(format!("{} is back.", confirm.item), StatusKind::Info);
                        self.sync_items(Some(&confirm.item));
                        Ok(Mode::Normal)
                    }
                    Ok(Outcome::Unchanged) => {
                        self.view.set_status(
                            format!(
                                "{} had already been returned; the list has been refreshed.",
                                confirm.item
                            ),
                            StatusKind::Error,
                        );
                        self.ledger.invalidate();
                        self.sync_items(Some(&confirm.item));
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        confirm.error = Some(self.report_failure(&err));
                        Ok(Mode::ConfirmReturn(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmReturn(confirm)),
        }
    }

    /// Pull the listing (from the snapshot when fresh) into the view. A failed
    /// read empties the table and raises the banner.
    fn sync_items(&mut self, focus: Option<&str>) {
        match self.ledger.list() {
            Ok(items) => {
                self.view.load_failure = None;
                self.view.details_open = false;
                self.view.replace_items(items, focus);
            }
            Err(err) => {
                self.record_load_failure(&err);
                self.view.replace_items(Vec::new(), None);
            }
        }
    }

    /// Show a failed action in the footer and return the message for the
    /// dialog that triggered it. Read failures also raise the banner; a
    /// vanished item means the listing on screen is stale.
    fn report_failure(&mut self, err: &LedgerError) -> String {
        if err.is_data_unavailable() {
            self.record_load_failure(err);
        }
        if let LedgerError::NotFound(_) = err {
            self.ledger.invalidate();
        }
        let message = err.to_string();
        self.view.set_status(message.clone(), StatusKind::Error);
        message
    }

    fn record_load_failure(&mut self, err: &LedgerError) {
        warn!("{err}");
        self.view.load_failure = Some(LoadFailure {
            detail: err.detail().to_string(),
        });
    }

    fn open_sheet(&mut self) {
        match self.ledger.web_url() {
            Some(url) => match open_link(&url) {
                Ok(()) => self.view.set_status("Opened the sheet.", StatusKind::Info),
                Err(err) => self
                    .view
                    .set_status(format!("Failed to open link: {err}"), StatusKind::Error),
            },
            None => self
                .view
                .set_status("This store has no web page.", StatusKind::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::Duration;

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::models::{Columns, StatusLabels};
    use crate::store::testing::TestStore;
    use crate::store::{CellUpdate, SheetStore, SqliteStore};

    fn app_with(rows: &[[&str; 3]]) -> App {
        let store = SqliteStore::in_memory(&Columns::default().header_row()).unwrap();
        for row in rows {
            let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            store.append_row(&values).unwrap();
        }
        let ledger = Ledger::new(
            Box::new(store),
            Columns::default(),
            StatusLabels::default(),
            Duration::from_secs(60),
        );
        App::new(ledger)
    }

    fn app_on(store: &Rc<TestStore>) -> App {
        let ledger = Ledger::new(
            Box::new(Rc::clone(store)),
            Columns::default(),
            StatusLabels::default(),
            Duration::from_secs(60),
        );
        App::new(ledger)
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn assert_error_status(app: &App) {
        let status = app.view.status.as_ref().unwrap();
        assert!(status.text.starts_with("Write failed: "), "{}", status.text);
        assert!(matches!(status.kind, StatusKind::Error));
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_initial_load_fills_table() {
        let app = app_with(&[["Drill", "Disponible", ""], ["Saw", "Emprunté", "Alice"]]);
        assert_eq!(app.view.items.len(), 2);
        assert!(app.view.load_failure.is_none());

        let screen = screen_text(&app);
        assert!(screen.contains("2 items in the library"));
        assert!(screen.contains("Drill"));
        assert!(screen.contains("Alice"));
    }

    #[test]
    fn test_add_item_through_form() {
        let mut app = app_with(&[["Drill", "Disponible", ""]]);

        app.handle_key(KeyCode::Char('+')).unwrap();
        assert!(matches!(app.view.mode, Mode::AddingItem(_)));
        type_text(&mut app, "Saw");
        app.handle_key(KeyCode::Enter).unwrap();

        assert!(matches!(app.view.mode, Mode::Normal));
        assert_eq!(app.view.items.len(), 2);
        assert_eq!(app.view.current_item().unwrap().name, "Saw");
        assert!(app.view.current_item().unwrap().is_free());
    }

    #[test]
    fn test_add_blank_name_keeps_form_open() {
        let mut app = app_with(&[]);

        app.handle_key(KeyCode::Char('a')).unwrap();
        type_text(&mut app, "   ");
        app.handle_key(KeyCode::Enter).unwrap();

        match &app.view.mode {
            Mode::AddingItem(form) => {
                assert_eq!(form.error.as_deref(), Some("Item name is required."))
            }
            _ => panic!("form should stay open"),
        }
        assert!(app.view.items.is_empty());
    }

    #[test]
    fn test_borrow_then_return() {
        let mut app = app_with(&[["Drill", "Disponible", ""]]);

        app.handle_key(KeyCode::Char('b')).unwrap();
        type_text(&mut app, "Alice");
        app.handle_key(KeyCode::Enter).unwrap();

        let item = app.view.current_item().unwrap().clone();
        assert_eq!(item.status, ItemStatus::OnLoan);
        assert_eq!(item.borrower, "Alice");

        app.handle_key(KeyCode::Char('r')).unwrap();
        assert!(matches!(app.view.mode, Mode::ConfirmReturn(_)));
        app.handle_key(KeyCode::Char('y')).unwrap();

        let item = app.view.current_item().unwrap();
        assert!(item.is_free());
        assert!(item.borrower.is_empty());
    }

    #[test]
    fn test_borrow_gated_on_free_items() {
        let mut app = app_with(&[["Drill", "Emprunté", "Alice"]]);

        app.handle_key(KeyCode::Char('b')).unwrap();

        assert!(matches!(app.view.mode, Mode::Normal));
        let status = app.view.status.as_ref().unwrap();
        assert_eq!(status.text, "Drill is already on loan to Alice.");
    }

    #[test]
    fn test_return_gated_on_loaned_items() {
        let mut app = app_with(&[["Drill", "Disponible", ""]]);

        app.handle_key(KeyCode::Char('r')).unwrap();

        assert!(matches!(app.view.mode, Mode::Normal));
        assert_eq!(app.view.status.as_ref().unwrap().text, "Drill is not on loan.");
    }

    #[test]
    fn test_cancel_borrow_dialog() {
        let mut app = app_with(&[["Drill", "Disponible", ""]]);

        app.handle_key(KeyCode::Char('b')).unwrap();
        type_text(&mut app, "Al");
        app.handle_key(KeyCode::Esc).unwrap();

        assert!(matches!(app.view.mode, Mode::Normal));
        assert!(app.view.current_item().unwrap().is_free());
    }

    #[test]
    fn test_missing_column_raises_banner() {
        let headers = vec!["Objet".to_string(), "Statut".to_string()];
        let store = SqliteStore::in_memory(&headers).unwrap();
        let ledger = Ledger::new(
            Box::new(store),
            Columns::default(),
            StatusLabels::default(),
            Duration::from_secs(60),
        );
        let mut app = App::new(ledger);

        assert!(app.view.load_failure.is_some());
        assert!(app.view.items.is_empty());
        assert!(screen_text(&app).contains("Unable to load the data"));

        app.handle_key(KeyCode::Char('d')).unwrap();
        assert!(app.view.details_open);
        assert!(screen_text(&app).contains("missing column"));
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app_with(&[]);
        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn test_local_store_cannot_open_sheet() {
        let mut app = app_with(&[]);
        assert!(!app.view.can_open_sheet);
        app.handle_key(KeyCode::Char('o')).unwrap();
        assert_eq!(
            app.view.status.as_ref().unwrap().text,
            "This store has no web page."
        );
    }

    #[test]
    fn test_failed_add_keeps_form_open() {
        let store = TestStore::seeded(&[["Drill", "Disponible", ""]]);
        let mut app = app_on(&store);
        store.fail_writes.set(true);

        app.handle_key(KeyCode::Char('a')).unwrap();
        type_text(&mut app, "Saw");
        app.handle_key(KeyCode::Enter).unwrap();

        match &app.view.mode {
            Mode::AddingItem(form) => {
                assert_eq!(form.value, "Saw");
                assert!(form.error.as_deref().unwrap().starts_with("Write failed: "));
            }
            _ => panic!("add form should stay open"),
        }
        assert_error_status(&app);
        assert!(screen_text(&app).contains("Write failed"));
        assert_eq!(store.rows(), vec![row(&["Drill", "Disponible", ""])]);
    }

    #[test]
    fn test_failed_borrow_keeps_dialog_open() {
        let store = TestStore::seeded(&[["Drill", "Disponible", ""]]);
        let mut app = app_on(&store);
        store.fail_writes.set(true);

        app.handle_key(KeyCode::Char('b')).unwrap();
        type_text(&mut app, "Alice");
        app.handle_key(KeyCode::Enter).unwrap();

        match &app.view.mode {
            Mode::Borrowing { item, form } => {
                assert_eq!(item, "Drill");
                assert!(form.error.as_deref().unwrap().starts_with("Write failed: "));
            }
            _ => panic!("borrow dialog should stay open"),
        }
        assert_error_status(&app);
        assert_eq!(store.rows(), vec![row(&["Drill", "Disponible", ""])]);
        assert!(app.view.items[0].is_free());
    }

    #[test]
    fn test_failed_return_keeps_confirmation_open() {
        let store = TestStore::seeded(&[["Drill", "Emprunté", "Alice"]]);
        let mut app = app_on(&store);
        store.fail_writes.set(true);

        app.handle_key(KeyCode::Char('r')).unwrap();
        app.handle_key(KeyCode::Char('y')).unwrap();

        match &app.view.mode {
            Mode::ConfirmReturn(confirm) => {
                assert_eq!(confirm.item, "Drill");
                assert!(confirm.error.as_deref().unwrap().starts_with("Write failed: "));
            }
            _ => panic!("confirmation should stay open"),
        }
        assert_error_status(&app);
        assert_eq!(store.rows(), vec![row(&["Drill", "Emprunté", "Alice"])]);
        assert_eq!(app.view.items[0].status, ItemStatus::OnLoan);
    }

    #[test]
    fn test_renamed_item_refreshes_listing() {
        let store = TestStore::seeded(&[["Drill", "Disponible", ""]]);
        let mut app = app_on(&store);

        app.handle_key(KeyCode::Char('b')).unwrap();
        store
            .inner
            .update_cells(2, &[CellUpdate::new(0, "Hammer drill")])
            .unwrap();
        type_text(&mut app, "Alice");
        app.handle_key(KeyCode::Enter).unwrap();

        match &app.view.mode {
            Mode::Borrowing { form, .. } => {
                assert_eq!(form.error.as_deref(), Some("No item named \"Drill\"."))
            }
            _ => panic!("borrow dialog should stay open"),
        }

        app.handle_key(KeyCode::Esc).unwrap();
        assert_eq!(app.view.items[0].name, "Hammer drill");
    }
}
