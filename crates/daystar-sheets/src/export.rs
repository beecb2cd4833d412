// CSV export of raw tabs and scored actions.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::rows::ActionRow;
use crate::table::{cell_text, Table};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// An action row together with the stars it earned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredAction {
    pub row: ActionRow,
    pub stars: u8,
}

const SCORED_HEADERS: [&str; 7] = [
    "date",
    "action",
    "model",
    "actual",
    "target",
    "upper_limit",
    "stars",
];

#[derive(Serialize)]
struct ScoredRecord<'a> {
    date: String,
    action: &'a str,
    model: &'static str,
    actual: i64,
    target: i64,
    upper_limit: Option<i64>,
    stars: u8,
}

impl<'a> From<&'a ScoredAction> for ScoredRecord<'a> {
    fn from(scored: &'a ScoredAction) -> Self {
        let m = &scored.row.measurement;
        ScoredRecord {
            date: scored
                .row
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            action: &scored.row.action,
            model: m.model.as_str(),
            actual: m.actual,
            target: m.target,
            upper_limit: m.upper_limit,
            stars: scored.stars,
        }
    }
}

// ---------------------------------------------------------------------------
// Writer-based exporters
// ---------------------------------------------------------------------------

/// Write the header row and every data row of `table`.
pub fn write_table<W: Write>(table: &Table, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(cell_text))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write scored actions with a fixed header, even when there are none.
pub fn write_scored<W: Write>(scored: &[ScoredAction], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(SCORED_HEADERS)?;
    for action in scored {
        wtr.serialize(ScoredRecord::from(action))?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Path-based exporters
// ---------------------------------------------------------------------------

/// Export a raw tab to `path`, creating parent directories. Returns the
/// absolute path written.
pub fn export_table(table: &Table, path: &Path) -> Result<PathBuf, ExportError> {
    let file = create_file(path)?;
    write_table(table, file).map_err(|e| ExportError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(absolute(path))
}

/// Export scored actions to `path`, creating parent directories. Returns the
/// absolute path written.
pub fn export_scored(scored: &[ScoredAction], path: &Path) -> Result<PathBuf, ExportError> {
    let file = create_file(path)?;
    write_scored(scored, file).map_err(|e| ExportError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(absolute(path))
}

fn create_file(path: &Path) -> Result<std::fs::File, ExportError> {
    let io_err = |e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::File::create(path).map_err(io_err)
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
