//! CSV and JSON export of task collections.

use std::fs;
use std::path::{Path, PathBuf};

use airfield_core::date::{format_display_instant, format_iso};
use airfield_core::task::{PpmTask, TrackedTask};
use serde::Serialize;
use thiserror::Error;
use time::Date;
use tracing::info;

/// Column headers of the PPM export.
pub const PPM_COLUMNS: [&str; 10] = [
    "Shift Type",
    "Description",
    "Type",
    "Due Date",
    "Frequency",
    "Status",
    "Day Shift",
    "Night Shift",
    "Photo Count",
    "Last Completed",
];

const NO_DESCRIPTION: &str = "No description";

/// Errors raised while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The export file could not be written.
    #[error("failed to write {path}")]
    Write {
        /// Target file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Records could not be encoded as JSON.
    #[error("failed to encode records: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What an export did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The file was written.
    Written {
        /// Data rows (header excluded).
        rows: usize,
        /// Written file.
        path: PathBuf,
    },
    /// Nothing to export; no file was written.
    NoData,
}

/// Header plus string rows, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Table with the ten PPM columns.
    #[must_use]
    pub fn from_ppm<'a, I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a PpmTask>,
    {
        let rows = tasks
            .into_iter()
            .map(|task| {
                vec![
                    or_na(&task.shift_type),
                    or_else(&task.description, NO_DESCRIPTION),
                    or_na(&task.task_type),
                    format_iso(task.due_date),
                    task.frequency.map_or_else(|| "N/A".to_owned(), |f| f.as_str().to_owned()),
                    task.status.as_str().to_owned(),
                    or_na(&task.day_shift),
                    or_na(&task.night_shift),
                    task.photos.len().to_string(),
                    task.last_completed
                        .map_or_else(|| "N/A".to_owned(), format_display_instant),
                ]
            })
            .collect();
        Self {
            header: PPM_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
            rows,
        }
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as CSV: a bare header line, then data cells that are always
    /// quoted with embedded quotes doubled.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.header.join(",");
        for row in &self.rows {
            out.push('\n');
            let cells: Vec<String> = row.iter().map(|cell| quote(cell)).collect();
            out.push_str(&cells.join(","));
        }
        out.push('\n');
        out
    }
}

/// Default export file name for a given day.
#[must_use]
pub fn csv_file_name(today: Date) -> String {
    format!("AGL_Maintenance_Report_{}.csv", format_iso(today))
}

/// Write `table` to `path`.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn export_csv(table: &CsvTable, path: &Path) -> Result<ExportOutcome, ExportError> {
    if table.is_empty() {
        info!("no rows to export");
        return Ok(ExportOutcome::NoData);
    }
    write(path, table.render())?;
    info!(rows = table.len(), path = %path.display(), "exported CSV");
    Ok(ExportOutcome::Written {
        rows: table.len(),
        path: path.to_path_buf(),
    })
}

/// Write a collection as pretty-printed JSON in its stored shape.
///
/// # Errors
/// Returns an error if encoding or writing fails.
pub fn export_json<T>(tasks: &[T], path: &Path) -> Result<ExportOutcome, ExportError>
where
    T: Serialize + TrackedTask,
{
    if tasks.is_empty() {
        return Ok(ExportOutcome::NoData);
    }
    let body = serde_json::to_string_pretty(tasks)?;
    write(path, body)?;
    info!(kind = %T::KIND, rows = tasks.len(), path = %path.display(), "exported JSON");
    Ok(ExportOutcome::Written {
        rows: tasks.len(),
        path: path.to_path_buf(),
    })
}

fn write(path: &Path, contents: String) -> Result<(), ExportError> {
    fs::write(path, contents).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn or_na(value: &str) -> String {
    or_else(value, "N/A")
}

fn or_else(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_owned()
    } else {
        value.to_owned()
    }
}
