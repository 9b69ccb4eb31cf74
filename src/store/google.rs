use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::TokenProvider;
use super::{CellUpdate, SheetStore, StoreError, Table};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
const DOCS_URL: &str = "https://docs.google.com/spreadsheets/d/";
/// Values are written verbatim so names starting with `=` never become formulas.
const VALUE_INPUT_OPTION: &str = "RAW";

/// Worksheet in a Google Sheets document, accessed through the v4 values API.
pub struct GoogleSheetsStore {
    client: Client,
    tokens: TokenProvider,
    spreadsheet_id: String,
    worksheet: String,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GoogleSheetsStore {
    /// `spreadsheet` may be a full document URL or a bare id.
    pub fn new(
        spreadsheet: &str,
        worksheet: &str,
        tokens: TokenProvider,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let spreadsheet_id = spreadsheet_id_from(spreadsheet)
            .ok_or_else(|| StoreError::InvalidAddress(spreadsheet.to_string()))?;
        let base = Url::parse(SHEETS_API)
            .and_then(|url| url.join(&format!("{spreadsheet_id}/")))
            .map_err(|e| StoreError::InvalidAddress(e.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;

        info!(
            "Using spreadsheet {spreadsheet_id}, worksheet '{worksheet}' as {}",
            tokens.client_email()
        );

        Ok(Self {
            client,
            tokens,
            spreadsheet_id,
            worksheet: worksheet.to_string(),
            base,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidAddress(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let token = self.tokens.access_token()?;
        let response = request.bearer_auth(token).send()?;
        check_status(response)
    }
}

impl SheetStore for GoogleSheetsStore {
    fn describe(&self) -> String {
        format!("Google Sheet {} / {}", self.spreadsheet_id, self.worksheet)
    }

    fn fetch_table(&self) -> Result<Table, StoreError> {
        let url = self.endpoint(&["values", &sheet_range(&self.worksheet)])?;
        let response = self.send(
            self.client
                .get(url)
                .query(&[("majorDimension", "ROWS")]),
        )?;

        let range: ValueRange = response.json()?;
        debug!(
            "Read {} rows from worksheet '{}'",
            range.values.len(),
            self.worksheet
        );
        Ok(Table::from_rows(range.values.into_iter().map(row_to_strings).collect()))
    }

    fn append_row(&self, values: &[String]) -> Result<(), StoreError> {
        let range = format!("{}:append", sheet_range(&self.worksheet));
        let url = self.endpoint(&["values", &range])?;
        self.send(
            self.client
                .post(url)
                .query(&[
                    ("valueInputOption", VALUE_INPUT_OPTION),
                    ("insertDataOption", "INSERT_ROWS"),
                ])
                .json(&json!({ "values": [values] })),
        )?;
        Ok(())
    }

    fn update_cells(&self, row: usize, cells: &[CellUpdate]) -> Result<(), StoreError> {
        let data: Vec<Value> = cells
            .iter()
            .map(|cell| {
                json!({
                    "range": cell_range(&self.worksheet, row, cell.column),
                    "values": [[cell.value]],
                })
            })
            .collect();

        let url = self.endpoint(&["values:batchUpdate"])?;
        self.send(self.client.post(url).json(&json!({
            "valueInputOption": VALUE_INPUT_OPTION,
            "data": data,
        })))?;
        Ok(())
    }

    fn web_url(&self) -> Option<String> {
        Some(format!("{DOCS_URL}{}/edit", self.spreadsheet_id))
    }
}

fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|parsed| parsed.error.message)
        .unwrap_or(body);
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Formatted cells arrive as strings; anything else is rendered as text.
fn row_to_strings(row: Vec<Value>) -> Vec<String> {
    row.into_iter()
        .map(|value| match value {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect()
}

/// Extract the document id from a sheet URL, or accept a bare id.
pub fn spreadsheet_id_from(input: &str) -> Option<String> {
    let input = input.trim();
    let id = match input.split_once("/spreadsheets/d/") {
        Some((_, rest)) => rest.split(['/', '?', '#']).next().unwrap_or(""),
        None => input,
    };
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// A1 column letters for a zero-based column index.
pub fn column_letter(column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn sheet_range(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

fn cell_range(worksheet: &str, row: usize, column: usize) -> String {
    format!("{}!{}{}", sheet_range(worksheet), column_letter(column), row)
}
