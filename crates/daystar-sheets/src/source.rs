// Where tabs come from: the Google Sheets values API, or CSV files on disk.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::table::Table;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default host for the Sheets v4 API.
pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com";

/// Ask for raw cell values so numbers arrive as JSON numbers, not as
/// locale-formatted strings.
const VALUE_RENDER_OPTION: &str = "UNFORMATTED_VALUE";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("request for tab '{tab}' failed: {source}")]
    Http { tab: String, source: reqwest::Error },

    #[error("sheets API returned {status} for tab '{tab}': {message}")]
    Status {
        tab: String,
        status: u16,
        message: String,
    },

    #[error("unexpected response body for tab '{tab}': {source}")]
    Decode {
        tab: String,
        source: serde_json::Error,
    },

    #[error("invalid sheets API URL: {0}")]
    Url(String),

    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// SheetSource trait
// ---------------------------------------------------------------------------

/// Anything that can produce a tab of rows by name.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch_tab(&self, tab: &str) -> Result<Table, SheetsError>;
}

// ---------------------------------------------------------------------------
// Google Sheets
// ---------------------------------------------------------------------------

/// How requests to the Sheets API are authorised.
#[derive(Clone, PartialEq, Eq)]
pub enum SheetsAuth {
    /// OAuth access token sent as `Authorization: Bearer`.
    BearerToken(String),
    /// API key sent as the `key` query parameter (public sheets only).
    ApiKey(String),
}

impl SheetsAuth {
    pub fn kind(&self) -> &'static str {
        match self {
            SheetsAuth::BearerToken(_) => "bearer token",
            SheetsAuth::ApiKey(_) => "API key",
        }
    }
}

// Secrets never go into logs.
impl fmt::Debug for SheetsAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetsAuth::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
            SheetsAuth::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
        }
    }
}

/// Response shape of `spreadsheets.values.get`. A tab with no data omits
/// `values` entirely.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Reads tabs from one spreadsheet through the Sheets v4 values API.
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    auth: SheetsAuth,
}

impl GoogleSheetsClient {
    pub fn new(spreadsheet_id: String, auth: SheetsAuth) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
            spreadsheet_id,
            auth,
        }
    }

    /// Point the client at a different API host (used for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `{base}/v4/spreadsheets/{id}/values/{tab}` with the tab name
    /// percent-encoded as a single path segment.
    pub(crate) fn values_url(&self, tab: &str) -> Result<reqwest::Url, SheetsError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SheetsError::Url(format!("{}: {e}", self.base_url)))?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SheetsError::Url(format!("{} cannot be a base URL", self.base_url)))?;
            segments.pop_if_empty().extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                tab,
            ]);
        }

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("valueRenderOption", VALUE_RENDER_OPTION);
            if let SheetsAuth::ApiKey(key) = &self.auth {
                query.append_pair("key", key);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsClient {
    async fn fetch_tab(&self, tab: &str) -> Result<Table, SheetsError> {
        let url = self.values_url(tab)?;
        debug!(tab, auth = self.auth.kind(), "requesting sheet values");

        let mut request = self.http.get(url);
        if let SheetsAuth::BearerToken(token) = &self.auth {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| SheetsError::Http {
            tab: tab.to_string(),
            source: e,
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| SheetsError::Http {
            tab: tab.to_string(),
            source: e,
        })?;

        if !status.is_success() {
            let message = parse_api_error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            return Err(SheetsError::Status {
                tab: tab.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let table = parse_values_response(&body).map_err(|e| SheetsError::Decode {
            tab: tab.to_string(),
            source: e,
        })?;
        info!(tab, rows = table.len(), "fetched sheet tab");
        Ok(table)
    }
}

/// Parse a `values.get` body into a [`Table`].
pub(crate) fn parse_values_response(body: &str) -> Result<Table, serde_json::Error> {
    let range: ValueRange = serde_json::from_str(body)?;
    Ok(Table::from_values(range.values))
}

/// Extract `error.message` from a Google API error body.
///
/// Expected shape: `{ "error": { "code": 403, "message": "...", "status": "PERMISSION_DENIED" } }`
pub(crate) fn parse_api_error_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v.get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

// ---------------------------------------------------------------------------
// Local CSV files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum CsvLocation {
    /// `<dir>/<tab>.csv`
    Dir(PathBuf),
    /// One file, whatever tab is asked for.
    File(PathBuf),
}

/// Reads tabs from CSV files, e.g. a previous `fetch` export. Every cell is
/// read as a string.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    location: CsvLocation,
}

impl CsvFileSource {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            location: CsvLocation::Dir(dir.into()),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: CsvLocation::File(path.into()),
        }
    }

    pub fn path_for(&self, tab: &str) -> PathBuf {
        match &self.location {
            CsvLocation::Dir(dir) => dir.join(format!("{tab}.csv")),
            CsvLocation::File(path) => path.clone(),
        }
    }
}

#[async_trait]
impl SheetSource for CsvFileSource {
    async fn fetch_tab(&self, tab: &str) -> Result<Table, SheetsError> {
        let path = self.path_for(tab);
        let bytes = tokio::fs::read(&path).await.map_err(|e| SheetsError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let table = load_table_from_reader(bytes.as_slice()).map_err(|e| SheetsError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
        info!(path = %path.display(), rows = table.len(), "loaded CSV tab");
        Ok(table)
    }
}

fn load_table_from_reader<R: Read>(rdr: R) -> Result<Table, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr);

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        values.push(
            record
                .iter()
                .map(|field| Value::String(field.to_string()))
                .collect(),
        );
    }
    Ok(Table::from_values(values))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn client(auth: SheetsAuth) -> GoogleSheetsClient {
        GoogleSheetsClient::new("sheet-123".to_string(), auth)
    }

    // -- URL building --

    #[test]
    fn values_url_with_bearer_token_has_no_key_param() {
        let url = client(SheetsAuth::BearerToken("tok".into()))
            .values_url("actions")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-123/values/actions?valueRenderOption=UNFORMATTED_VALUE"
        );
    }

    #[test]
    fn values_url_with_api_key_appends_key() {
        let url = client(SheetsAuth::ApiKey("abc".into()))
            .values_url("actions")
            .unwrap();
        assert!(url.as_str().ends_with("valueRenderOption=UNFORMATTED_VALUE&key=abc"));
    }

    #[test]
    fn values_url_encodes_tab_names() {
        let url = client(SheetsAuth::ApiKey("abc".into()))
            .values_url("Daily Log/2024")
            .unwrap();
        assert!(url.path().ends_with("/values/Daily%20Log%2F2024"), "path: {}", url.path());
    }

    #[test]
    fn values_url_respects_custom_base_with_trailing_slash() {
        let url = client(SheetsAuth::BearerToken("tok".into()))
            .with_base_url("http://127.0.0.1:8080/")
            .values_url("t")
            .unwrap();
        assert_eq!(url.path(), "/v4/spreadsheets/sheet-123/values/t");
    }

    #[test]
    fn values_url_rejects_garbage_base() {
        let err = client(SheetsAuth::BearerToken("tok".into()))
            .with_base_url("not a url")
            .values_url("t")
            .unwrap_err();
        assert!(matches!(err, SheetsError::Url(_)));
    }

    #[test]
    fn auth_debug_redacts_secret() {
        let dbg = format!("{:?}", SheetsAuth::BearerToken("super-secret".into()));
        assert!(!dbg.contains("super-secret"));
    }

    // -- Response parsing --

    #[test]
    fn parse_values_response_builds_table() {
        let body = r#"{
            "range": "actions!A1:Z1000",
            "majorDimension": "ROWS",
            "values": [
                ["action", "model", "actual", "target"],
                ["meals", "exact", 3, 3],
                ["drinks", "range", 1]
            ]
        }"#;
        let table = parse_values_response(body).unwrap();
        assert_eq!(table.headers, vec!["action", "model", "actual", "target"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][2], json!(3));
        assert_eq!(table.rows[1][3], json!(""));
    }

    #[test]
    fn parse_values_response_without_values_is_empty() {
        let table = parse_values_response(r#"{"range": "empty!A1:Z1000", "majorDimension": "ROWS"}"#)
            .unwrap();
        assert!(table.is_empty());
        assert!(table.headers.is_empty());
    }

    #[test]
    fn parse_api_error_message_extracts_message() {
        let body = r#"{"error": {"code": 404, "message": "Unable to parse range: nope", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            parse_api_error_message(body).as_deref(),
            Some("Unable to parse range: nope")
        );
        assert!(parse_api_error_message("<html>").is_none());
    }

    // -- CSV source --

    #[test]
    fn csv_reader_keeps_cells_as_strings() {
        let csv_data = "\
action,actual,target,upper_limit
walk,4,4,8
drinks,1,2
";
        let table = load_table_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["action", "actual", "target", "upper_limit"]);
        assert_eq!(table.rows[0], vec![json!("walk"), json!("4"), json!("4"), json!("8")]);
        assert_eq!(table.rows[1][3], json!(""));
    }

    #[tokio::test]
    async fn csv_source_reads_tab_from_dir() {
        let tmp = std::env::temp_dir().join("daystar_csv_source_dir");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        fs::write(tmp.join("actions.csv"), "action,actual\nmeals,3\n").unwrap();

        let source = CsvFileSource::in_dir(&tmp);
        let table = source.fetch_tab("actions").await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][0], json!("meals"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn csv_source_missing_file_is_io_error() {
        let source = CsvFileSource::file("/nonexistent/daystar/actions.csv");
        match source.fetch_tab("actions").await {
            Err(SheetsError::Io { path, .. }) => assert!(path.ends_with("actions.csv")),
            other => panic!("expected Io error, got: {other:?}"),
        }
    }
}
