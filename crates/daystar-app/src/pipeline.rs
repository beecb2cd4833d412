// Fetch and score pipelines: source tab -> (optional scoring) -> CSV export.

use std::path::{Path, PathBuf};

use anyhow::Context;
use daystar_sheets::export::{export_scored, export_table, ScoredAction};
use daystar_sheets::rows::{extract_measurements, ActionRow, ColumnNames, SkippedRow};
use daystar_sheets::source::SheetSource;
use daystar_sheets::table::Table;
use tracing::{info, warn};

/// Result of exporting a raw tab.
#[derive(Debug)]
pub struct FetchOutcome {
    pub table: Table,
    pub path: PathBuf,
}

/// Result of scoring a tab of action rows.
#[derive(Debug)]
pub struct ScoreOutcome {
    pub scored: Vec<ScoredAction>,
    /// Rows left out, ordered by sheet row number.
    pub skipped: Vec<SkippedRow>,
    pub path: PathBuf,
}

impl ScoreOutcome {
    pub fn total_stars(&self) -> u32 {
        self.scored.iter().map(|s| u32::from(s.stars)).sum()
    }
}

/// Read `tab` and save it unchanged to `<export_dir>/<tab>.csv`.
pub async fn fetch_tab(
    source: &dyn SheetSource,
    tab: &str,
    export_dir: &Path,
) -> anyhow::Result<FetchOutcome> {
    let table = source
        .fetch_tab(tab)
        .await
        .with_context(|| format!("failed to read tab '{tab}'"))?;
    info!(tab, rows = table.len(), "rows read");

    let path = export_table(&table, &export_dir.join(export_file_name(tab, "")))
        .with_context(|| format!("failed to export tab '{tab}'"))?;
    info!(path = %path.display(), "saved raw export");

    Ok(FetchOutcome { table, path })
}

/// Read `tab`, score every action row and save the results to
/// `<export_dir>/<tab>_scored.csv`.
///
/// Rows that cannot be parsed or fail a scoring precondition are logged and
/// reported in [`ScoreOutcome::skipped`]; only a missing required column or
/// an I/O failure aborts the run.
pub async fn score_tab(
    source: &dyn SheetSource,
    tab: &str,
    columns: &ColumnNames,
    export_dir: &Path,
) -> anyhow::Result<ScoreOutcome> {
    let table = source
        .fetch_tab(tab)
        .await
        .with_context(|| format!("failed to read tab '{tab}'"))?;

    let extraction = extract_measurements(&table, columns)
        .with_context(|| format!("tab '{tab}' cannot be scored"))?;

    let (scored, mut skipped) = score_rows(extraction.rows);
    skipped.extend(extraction.skipped);
    skipped.sort_by_key(|s| s.row_number);

    let path = export_scored(&scored, &export_dir.join(export_file_name(tab, "_scored")))
        .with_context(|| format!("failed to export scores for tab '{tab}'"))?;
    info!(
        tab,
        scored = scored.len(),
        skipped = skipped.len(),
        path = %path.display(),
        "scored tab"
    );

    Ok(ScoreOutcome {
        scored,
        skipped,
        path,
    })
}

/// Score each row; rows whose measurement fails a precondition are skipped.
pub fn score_rows(rows: Vec<ActionRow>) -> (Vec<ScoredAction>, Vec<SkippedRow>) {
    let mut scored = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();

    for row in rows {
        match row.measurement.score() {
            Ok(stars) => scored.push(ScoredAction { row, stars }),
            Err(e) => {
                warn!("skipping row {} ({}): {e}", row.row_number, row.action);
                skipped.push(SkippedRow {
                    row_number: row.row_number,
                    reason: e.to_string(),
                });
            }
        }
    }

    (scored, skipped)
}

/// `<tab><suffix>.csv`, with path separators in the tab name replaced.
fn export_file_name(tab: &str, suffix: &str) -> String {
    let stem: String = tab
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{stem}{suffix}.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use daystar_core::ActionMeasurement;

    fn row(row_number: usize, measurement: ActionMeasurement) -> ActionRow {
        ActionRow {
            row_number,
            date: None,
            action: format!("action-{row_number}"),
            measurement,
        }
    }

    #[test]
    fn score_rows_splits_valid_and_invalid() {
        let (scored, skipped) = score_rows(vec![
            row(2, ActionMeasurement::exact(3, 3)),
            row(3, ActionMeasurement::range(3, 0, None)),
            row(4, ActionMeasurement::range(5, 4, Some(3))),
            row(5, ActionMeasurement::range(0, 4, None)),
        ]);

        let stars: Vec<u8> = scored.iter().map(|s| s.stars).collect();
        assert_eq!(stars, vec![10, 20]);

        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].row_number, 3);
        assert!(skipped[0].reason.contains("target must be > 0"));
        assert!(skipped[1].reason.contains("upper_limit must be >= target"));
    }

    #[test]
    fn export_file_names_are_flat() {
        assert_eq!(export_file_name("players", ""), "players.csv");
        assert_eq!(export_file_name("Daily/Log", "_scored"), "Daily_Log_scored.csv");
        assert_eq!(export_file_name(" a\\b ", ""), "a_b.csv");
    }

    #[test]
    fn total_stars_sums_scores() {
        let (scored, _) = score_rows(vec![
            row(2, ActionMeasurement::exact(3, 3)),
            row(3, ActionMeasurement::range(8, 4, Some(8))),
        ]);
        let outcome = ScoreOutcome {
            scored,
            skipped: vec![],
            path: PathBuf::from("x.csv"),
        };
        assert_eq!(outcome.total_stars(), 30);
    }
}
