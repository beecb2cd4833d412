// Spreadsheet plumbing around the scoring core: fetching tabs, turning rows
// into measurements, and writing CSV exports.

pub mod export;
pub mod rows;
pub mod source;
pub mod table;

pub use export::{export_scored, export_table, ExportError, ScoredAction};
pub use rows::{extract_measurements, ActionRow, ColumnNames, Extraction, RowError, SkippedRow};
pub use source::{CsvFileSource, GoogleSheetsClient, SheetSource, SheetsAuth, SheetsError};
pub use table::Table;
