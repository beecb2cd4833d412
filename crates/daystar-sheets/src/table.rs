// In-memory view of one spreadsheet tab: a header row plus data rows.

use serde_json::{Map, Value};

/// A tab as returned by a [`SheetSource`](crate::SheetSource).
///
/// Every data row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from raw row values where the first row is the header.
    ///
    /// Header cells are stringified and trimmed. Short rows are padded with
    /// empty strings (the Sheets API drops trailing blank cells); cells beyond
    /// the header width are discarded.
    pub fn from_values(values: Vec<Vec<Value>>) -> Self {
        let mut iter = values.into_iter();
        let Some(header_row) = iter.next() else {
            return Table::default();
        };

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell_text(cell).trim().to_string())
            .collect();
        let width = headers.len();

        let rows = iter
            .map(|mut row| {
                row.resize(width, Value::String(String::new()));
                row
            })
            .collect();

        Table { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by header name, ignoring case and surrounding
    /// whitespace.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Data row `index` as a header -> cell mapping.
    pub fn record(&self, index: usize) -> Option<Map<String, Value>> {
        let row = self.rows.get(index)?;
        Some(
            self.headers
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect(),
        )
    }

    pub fn first_record(&self) -> Option<Map<String, Value>> {
        self.record(0)
    }
}

/// Render a cell the way it should appear in CSV: strings verbatim, null as
/// empty, everything else as its JSON text.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// True for null and whitespace-only strings.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
