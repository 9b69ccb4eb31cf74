use std::time::Duration;

use materiautheque::store::SqliteStore;
use materiautheque::{
    Columns, ItemStatus, Ledger, LedgerError, Outcome, SheetStore, StatusLabels,
};

fn open_ledger(path: &std::path::Path) -> Ledger {
    let store = SqliteStore::open(path, &Columns::default().header_row()).unwrap();
    Ledger::new(
        Box::new(store),
        Columns::default(),
        StatusLabels::default(),
        Duration::from_secs(30),
    )
}

#[test]
fn lending_cycle_persists_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite");

    {
        let mut ledger = open_ledger(&path);
        ledger.add("Drill").unwrap();
        ledger.add("Ladder").unwrap();
        assert_eq!(ledger.borrow("Drill", "Alice").unwrap(), Outcome::Applied);
    }

    let mut ledger = open_ledger(&path);
    let items = ledger.list().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "Drill");
    assert_eq!(items[0].status, ItemStatus::OnLoan);
    assert_eq!(items[0].borrower, "Alice");
    assert_eq!(items[1].status, ItemStatus::Free);

    assert_eq!(ledger.return_item("Drill").unwrap(), Outcome::Applied);
    assert_eq!(ledger.return_item("Drill").unwrap(), Outcome::Unchanged);

    let items = ledger.list().unwrap();
    let drill = &items[0];
    assert_eq!(drill.status, ItemStatus::Free);
    assert!(drill.borrower.is_empty());
}

#[test]
fn rows_are_written_with_sheet_labels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite");

    let mut ledger = open_ledger(&path);
    ledger.add("Drill").unwrap();
    ledger.borrow("Drill", "Alice").unwrap();

    let store = SqliteStore::open(&path, &Columns::default().header_row()).unwrap();
    let table = store.fetch_table().unwrap();
    assert_eq!(table.headers, vec!["Objet", "Statut", "Emprunteur"]);
    assert_eq!(table.rows, vec![vec!["Drill", "Emprunté", "Alice"]]);
}

#[test]
fn custom_labels_and_columns() {
    let columns = Columns {
        name: "Tool".to_string(),
        status: "State".to_string(),
        borrower: "Who".to_string(),
    };
    let labels = StatusLabels {
        free: "Free".to_string(),
        on_loan: "Out".to_string(),
    };
    let store = SqliteStore::in_memory(&columns.header_row()).unwrap();
    let mut ledger = Ledger::new(Box::new(store), columns, labels, Duration::from_secs(30));

    ledger.add("Saw").unwrap();
    ledger.borrow("Saw", "Bob").unwrap();

    let items = ledger.load().unwrap();
    assert_eq!(items[0].status, ItemStatus::OnLoan);
}

#[test]
fn default_columns_do_not_match_custom_sheet() {
    let headers = vec!["Tool".to_string(), "State".to_string(), "Who".to_string()];
    let store = SqliteStore::in_memory(&headers).unwrap();
    let ledger = Ledger::new(
        Box::new(store),
        Columns::default(),
        StatusLabels::default(),
        Duration::from_secs(30),
    );

    assert!(matches!(
        ledger.load(),
        Err(LedgerError::DataUnavailable(_))
    ));
}
