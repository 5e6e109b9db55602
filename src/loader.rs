use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::CACHE_CONTROL;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::PortalError;
use crate::table::Table;

/// Raw answer of the sheet endpoint before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Transport that can fetch the body of a named sheet.
pub trait SheetSource: Send {
    fn fetch(&self, sheet: &str) -> Result<RawResponse, PortalError>;
}

pub struct HttpSheetSource {
    client: Client,
    endpoint: String,
}

impl HttpSheetSource {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, PortalError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn sheet_url(&self, sheet: &str) -> String {
        sheet_url(&self.endpoint, sheet)
    }
}

pub fn sheet_url(endpoint: &str, sheet: &str) -> String {
    format!("{}?sheet={}", endpoint, urlencoding::encode(sheet))
}

impl SheetSource for HttpSheetSource {
    fn fetch(&self, sheet: &str) -> Result<RawResponse, PortalError> {
        let url = self.sheet_url(sheet);
        debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-store")
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(RawResponse { status, body })
    }
}

/// Turns a raw response into a table, surfacing server side errors.
pub fn parse_response(response: RawResponse) -> Result<Table, PortalError> {
    if !(200..300).contains(&response.status) {
        return Err(PortalError::Remote(format!("HTTP {}", response.status)));
    }
    let payload: Value = serde_json::from_str(&response.body).map_err(PortalError::Parse)?;
    if let Some(message) = remote_error(&payload) {
        return Err(PortalError::Remote(message));
    }
    Table::normalize(&payload)
}

// A truthy `error` field on an object payload.
fn remote_error(payload: &Value) -> Option<String> {
    match payload.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub struct SheetClient {
    source: Box<dyn SheetSource>,
}

impl SheetClient {
    pub fn new(source: Box<dyn SheetSource>) -> Self {
        Self { source }
    }

    pub fn fetch_table(&self, sheet: &str) -> Result<Table, PortalError> {
        let start_time = Instant::now();
        let result = self.source.fetch(sheet).and_then(parse_response);
        let duration = start_time.elapsed().as_millis();
        match &result {
            Ok(table) => info!(
                "Loaded sheet \"{sheet}\": {} columns, {} rows in {duration}ms",
                table.headers.len(),
                table.rows.len()
            ),
            Err(e) => warn!("Loading sheet \"{sheet}\" failed after {duration}ms: {e}"),
        }
        if let Ok(table) = &result
            && table.is_empty()
        {
            debug!("Sheet \"{sheet}\" has no data rows");
        }
        result
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeSheetSource;
    use super::*;

    fn client(status: u16, body: &str) -> SheetClient {
        SheetClient::new(Box::new(FakeSheetSource::default().with("Sheet", status, body)))
    }

    #[test]
    fn sheet_name_is_percent_encoded() {
        assert_eq!(
            sheet_url("https://x.example/exec", "Supplier Contacts"),
            "https://x.example/exec?sheet=Supplier%20Contacts"
        );
    }

    #[test]
    fn non_success_status_is_remote_error() {
        let err = client(500, "[]").fetch_table("Sheet").unwrap_err();
        assert!(matches!(err, PortalError::Remote(ref m) if m == "HTTP 500"));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = client(200, "<html>oops</html>").fetch_table("Sheet").unwrap_err();
        assert!(matches!(err, PortalError::Parse(_)));
        assert_eq!(err.to_string(), "Invalid JSON from API");
    }

    #[test]
    fn error_field_is_remote_error() {
        let err = client(200, include_str!("../tests/fixtures/remote_error.json"))
            .fetch_table("Sheet")
            .unwrap_err();
        assert_eq!(err.to_string(), "Sheet not found: Supplier Contacts");
    }

    #[test]
    fn empty_error_field_is_ignored() {
        let table = client(200, r#"{"error": "", "headers": ["A"], "rows": [["1"]]}"#)
            .fetch_table("Sheet")
            .unwrap();
        assert_eq!(table.rows, vec![vec!["1"]]);
    }

    #[test]
    fn zero_error_field_is_falsy() {
        let table = client(200, r#"{"error": 0, "headers": ["A"], "rows": [["1"]]}"#)
            .fetch_table("Sheet")
            .unwrap();
        assert_eq!(table.rows.len(), 1);
        let err = client(200, r#"{"error": 2}"#).fetch_table("Sheet").unwrap_err();
        assert_eq!(err.to_string(), "2");
    }

    #[test]
    fn unexpected_shape_is_reported() {
        let err = client(200, r#"{"data": 1}"#).fetch_table("Sheet").unwrap_err();
        assert!(matches!(err, PortalError::UnexpectedShape));
    }

    #[test]
    fn unknown_sheet_is_404() {
        let client = SheetClient::new(Box::new(FakeSheetSource::default()));
        assert!(matches!(
            client.fetch_table("Other"),
            Err(PortalError::Remote(m)) if m == "HTTP 404"
        ));
    }
}
