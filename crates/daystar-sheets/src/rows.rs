// Turn a table of logged actions into scoreable measurements.

use chrono::{Days, NaiveDate};
use daystar_core::{ActionMeasurement, MeasurementModel, StarInput};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::table::{cell_text, is_blank, Table};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Header names for the columns the extractor reads. Matching is
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnNames {
    pub date: String,
    pub action: String,
    pub model: String,
    pub actual: String,
    pub target: String,
    pub upper_limit: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: "date".to_string(),
            action: "action".to_string(),
            model: "model".to_string(),
            actual: "actual".to_string(),
            target: "target".to_string(),
            upper_limit: "upper_limit".to_string(),
        }
    }
}

impl ColumnNames {
    /// `(field, header)` pairs, used for validation messages.
    pub fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("date", self.date.as_str()),
            ("action", self.action.as_str()),
            ("model", self.model.as_str()),
            ("actual", self.actual.as_str()),
            ("target", self.target.as_str()),
            ("upper_limit", self.upper_limit.as_str()),
        ]
    }
}

/// One data row that parsed cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRow {
    /// 1-based row number in the sheet (the header is row 1).
    pub row_number: usize,
    pub date: Option<NaiveDate>,
    pub action: String,
    pub measurement: ActionMeasurement,
}

/// A row that was left out, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub row_number: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub rows: Vec<ActionRow>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("required column '{column}' not found in header row")]
    MissingColumn { column: String },
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Column positions resolved once per table.
struct Layout {
    date: Option<usize>,
    action: Option<usize>,
    model: Option<usize>,
    actual: usize,
    target: usize,
    upper_limit: Option<usize>,
}

/// Read every data row of `table` into an [`ActionRow`].
///
/// Only the `actual` and `target` columns are required. Rows with unusable
/// cells are logged and returned in [`Extraction::skipped`]; they never fail
/// the whole table.
pub fn extract_measurements(table: &Table, columns: &ColumnNames) -> Result<Extraction, RowError> {
    let required = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| RowError::MissingColumn {
                column: name.to_string(),
            })
    };

    let layout = Layout {
        date: table.column_index(&columns.date),
        action: table.column_index(&columns.action),
        model: table.column_index(&columns.model),
        actual: required(&columns.actual)?,
        target: required(&columns.target)?,
        upper_limit: table.column_index(&columns.upper_limit),
    };

    let mut extraction = Extraction::default();
    for (index, row) in table.rows.iter().enumerate() {
        let row_number = index + 2;
        if row.iter().all(is_blank) {
            continue;
        }
        match parse_row(row, row_number, &layout, columns) {
            Ok(action_row) => extraction.rows.push(action_row),
            Err(reason) => {
                warn!("skipping row {row_number}: {reason}");
                extraction.skipped.push(SkippedRow { row_number, reason });
            }
        }
    }
    Ok(extraction)
}

fn parse_row(
    row: &[Value],
    row_number: usize,
    layout: &Layout,
    columns: &ColumnNames,
) -> Result<ActionRow, String> {
    let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).filter(|v| !is_blank(v));

    let actual = integer_cell(row.get(layout.actual), &columns.actual)?;
    let target = integer_cell(row.get(layout.target), &columns.target)?;
    let upper_limit = cell(layout.upper_limit)
        .map(|v| integer_cell(Some(v), &columns.upper_limit))
        .transpose()?;

    let model = match cell(layout.model) {
        Some(v) => cell_text(v)
            .parse::<MeasurementModel>()
            .map_err(|e| format!("column '{}': {e}", columns.model))?,
        None if upper_limit.is_some() => MeasurementModel::Range,
        None => MeasurementModel::Exact,
    };

    let action = cell(layout.action)
        .map(|v| cell_text(v).trim().to_string())
        .unwrap_or_default();

    let date = cell(layout.date).and_then(|v| {
        let parsed = parse_date(v);
        if parsed.is_none() {
            warn!("row {row_number}: ignoring unparseable date {v}");
        }
        parsed
    });

    Ok(ActionRow {
        row_number,
        date,
        action,
        measurement: ActionMeasurement {
            model,
            actual,
            target,
            upper_limit,
        },
    })
}

/// Strict integer parse shared with the star validator: integers and
/// integer strings only. Values outside `i64` are rejected, not saturated.
/// A cell missing from a short row counts as empty.
fn integer_cell(value: Option<&Value>, column: &str) -> Result<i64, String> {
    let Some(value) = value.filter(|v| !is_blank(v)) else {
        return Err(format!("column '{column}' is empty"));
    };
    StarInput::try_from(value)
        .and_then(|input| input.to_exact_integer())
        .map_err(|e| format!("column '{column}': {e}"))
}

/// Dates arrive either as `YYYY-MM-DD` text (CSV) or as spreadsheet serial
/// day numbers (unformatted Sheets values, day 0 = 1899-12-30).
fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        Value::Number(n) => {
            let serial = n.as_f64()?.floor();
            if !(0.0..=2_958_465.0).contains(&serial) {
                return None;
            }
            NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial as u64))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
