//! Paginated maintenance reports.
//!
//! A report selects tasks through a [`ReportWindow`], lays every task out as
//! a block of lines and flows the blocks onto fixed-height pages. Blocks are
//! never split across pages. Photo thumbnails are decoded before they are
//! listed; a photo whose inline data is unreadable is logged and left out.

use std::fs;
use std::path::{Path, PathBuf};

use airfield_core::dashboard::{CmSummary, PpmSummary};
use airfield_core::date::{format_display, format_display_instant, format_iso};
use airfield_core::filter::{ActivityWindow, DateRange, TaskFilter, TimeWindow};
use airfield_core::status::{ClassifierOptions, classify_with};
use airfield_core::task::{CmTask, Photo, PpmTask};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::{ReportConfig, TrackerConfig};

const FOOTER_NOTICE: &str = "AGL MCT Airfield - Confidential";
const FOOTER_LINES: usize = 2;
const MISSION_SPAN_HOURS: i64 = 2;

/// Errors raised while producing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The window selected nothing.
    #[error("No tasks found for the selected {0}. Try a different period.")]
    NoTasks(&'static str),
    /// The rendered report could not be written.
    #[error("failed to write report to {path}")]
    Write {
        /// Target file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Which tasks a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportWindow {
    /// Tasks scheduled (PPM due date, CM report date) within a date range.
    DateRange(DateRange),
    /// Tasks modified within a mission's time span.
    Mission(ActivityWindow),
}

impl ReportWindow {
    /// The calendar month containing `today`.
    #[must_use]
    pub fn current_month(today: Date) -> Self {
        Self::DateRange(DateRange::month_of(today))
    }

    /// The two hours leading up to `now`.
    #[must_use]
    pub fn recent_mission(now: OffsetDateTime) -> Self {
        Self::Mission(ActivityWindow::trailing(now, Duration::hours(MISSION_SPAN_HOURS)))
    }

    /// Report heading.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::DateRange(_) => "MAINTENANCE TRACKER REPORT",
            Self::Mission(_) => "MISSION TIME REPORT",
        }
    }

    /// Human-readable period, e.g. `01 Jan 2025 to 31 Jan 2025`.
    #[must_use]
    pub fn period_label(&self) -> String {
        match self {
            Self::DateRange(range) => {
                format!("{} to {}", format_display(range.from()), format_display(range.to()))
            }
            Self::Mission(window) => format!(
                "{} to {} UTC",
                format_display_instant(window.start()),
                format_display_instant(window.end())
            ),
        }
    }

    /// Suggested output file name without extension.
    #[must_use]
    pub fn file_stem(&self) -> String {
        match self {
            Self::DateRange(range) => format!(
                "AGL_Maintenance_Report_{}_to_{}",
                format_iso(range.from()),
                format_iso(range.to())
            ),
            Self::Mission(window) => format!(
                "AGL_Mission_Report_{}_to_{}",
                compact_instant(window.start()),
                compact_instant(window.end())
            ),
        }
    }

    const fn describe(&self) -> &'static str {
        match self {
            Self::DateRange(_) => "date range",
            Self::Mission(_) => "mission time",
        }
    }

    fn filter(self) -> TaskFilter {
        let window = match self {
            Self::DateRange(range) => TimeWindow::Calendar(range),
            Self::Mission(window) => TimeWindow::Activity(window),
        };
        TaskFilter::builder().window(window).build()
    }
}

fn compact_instant(instant: OffsetDateTime) -> String {
    instant
        .format(format_description!("[year]-[month]-[day]T[hour][minute]"))
        .unwrap_or_else(|_| instant.unix_timestamp().to_string())
}

/// One rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPage {
    /// Body lines followed by the footer.
    pub lines: Vec<String>,
}

/// A laid-out report.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    /// Report heading.
    pub title: String,
    /// Period label.
    pub period: String,
    /// Suggested file name without extension.
    pub file_stem: String,
    /// PPM tasks included.
    pub ppm_count: usize,
    /// CM tasks included.
    pub cm_count: usize,
    /// Thumbnails left out because their data could not be decoded.
    pub skipped_photos: usize,
    /// Pages in order.
    pub pages: Vec<ReportPage>,
}

impl ReportDocument {
    /// Plain-text rendering with a form feed between pages.
    #[must_use]
    pub fn render_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.lines.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\u{c}\n")
    }

    /// Write [`Self::render_text`] to `dir/<file stem>.txt`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        let path = dir.join(format!("{}.txt", self.file_stem));
        fs::write(&path, self.render_text()).map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Lays out reports according to the tracker configuration.
#[derive(Debug, Clone)]
pub struct ReportBuilder<'a> {
    site: &'a str,
    layout: &'a ReportConfig,
    options: ClassifierOptions,
}

impl<'a> ReportBuilder<'a> {
    /// Builder using the site name, layout and status horizon of `config`.
    #[must_use]
    pub fn new(config: &'a TrackerConfig) -> Self {
        Self {
            site: &config.site.name,
            layout: &config.report,
            options: config.classifier_options(),
        }
    }

    /// Select tasks through `window` and lay out the report.
    ///
    /// # Errors
    /// Returns [`ReportError::NoTasks`] when the window selects nothing.
    pub fn build(
        &self,
        window: ReportWindow,
        ppm: &[PpmTask],
        cm: &[CmTask],
        now: OffsetDateTime,
    ) -> Result<ReportDocument, ReportError> {
        let filter = window.filter();
        let ppm = filter.apply(ppm);
        let cm = filter.apply(cm);
        if ppm.is_empty() && cm.is_empty() {
            return Err(ReportError::NoTasks(window.describe()));
        }
        debug!(ppm = ppm.len(), cm = cm.len(), title = window.title(), "building report");

        let today = now.date();
        let mut skipped_photos = 0;
        let mut blocks = vec![self.header(window, ppm.len(), cm.len(), now)];
        if !ppm.is_empty() {
            blocks.push(ppm_summary(&PpmSummary::compute(ppm.iter().copied(), today)));
        }
        if !cm.is_empty() {
            blocks.push(cm_summary(&CmSummary::compute(cm.iter().copied())));
        }
        for (index, task) in ppm.iter().enumerate() {
            let mut block = Vec::new();
            if index == 0 {
                block.extend(["PPM TASKS DETAILS".to_owned(), String::new()]);
            }
            block.extend(self.ppm_block(index + 1, task, today, &mut skipped_photos));
            blocks.push(block);
        }
        for (index, task) in cm.iter().enumerate() {
            let mut block = Vec::new();
            if index == 0 {
                block.extend(["CM TASKS DETAILS".to_owned(), String::new()]);
            }
            block.extend(self.cm_block(index + 1, task, &mut skipped_photos));
            blocks.push(block);
        }

        Ok(ReportDocument {
            title: window.title().to_owned(),
            period: window.period_label(),
            file_stem: window.file_stem(),
            ppm_count: ppm.len(),
            cm_count: cm.len(),
            skipped_photos,
            pages: paginate(blocks, self.layout.lines_per_page),
        })
    }

    fn header(&self, window: ReportWindow, ppm: usize, cm: usize, now: OffsetDateTime) -> Vec<String> {
        vec![
            self.site.to_owned(),
            window.title().to_owned(),
            String::new(),
            format!("Report Period: {}", window.period_label()),
            format!("Generated: {} UTC", format_display_instant(now)),
            format!("Total PPM Tasks: {ppm} | Total CM Tasks: {cm}"),
            String::new(),
        ]
    }

    fn ppm_block(&self, number: usize, task: &PpmTask, today: Date, skipped: &mut usize) -> Vec<String> {
        let status = classify_with(task, today, self.options);
        let mut lines = vec![
            format!("PPM TASK {number}"),
            format!("  Description: {}", self.description(&task.description)),
            format!(
                "  Shift: {}  Type: {}  Frequency: {}",
                or_na(&task.shift_type),
                or_na(&task.task_type),
                task.frequency.map_or("N/A", |f| f.as_str())
            ),
            format!("  Status: {status}  Due Date: {}", format_display(task.due_date)),
            format!(
                "  Assignments: Day: {}  Night: {}",
                or_default(&task.day_shift, "Not assigned"),
                or_default(&task.night_shift, "Not assigned")
            ),
        ];
        lines.extend(self.photo_lines(&task.photos, skipped));
        lines.push(String::new());
        lines
    }

    fn cm_block(&self, number: usize, task: &CmTask, skipped: &mut usize) -> Vec<String> {
        let mut lines = vec![
            format!("CM TASK {number} - WO: {}", or_na(&task.work_order)),
            format!("  Description: {}", self.description(&task.description)),
            format!(
                "  Priority: {} {}  Location: {}",
                task.priority.glyph(),
                task.priority,
                or_na(&task.location)
            ),
            format!(
                "  Status: {}  Reported: {}",
                task.status,
                format_display(task.date_reported)
            ),
            format!(
                "  Reported By: {}  Assigned To: {}",
                or_na(&task.reported_by),
                or_default(&task.assigned_to, "Unassigned")
            ),
        ];
        lines.extend(self.photo_lines(&task.photos, skipped));
        lines.push(String::new());
        lines
    }

    fn photo_lines(&self, photos: &[Photo], skipped: &mut usize) -> Vec<String> {
        let mut lines = vec![format!("  Photos: {} attached", photos.len())];
        for photo in photos.iter().take(self.layout.max_thumbnails) {
            match decoded_len(&photo.data) {
                Some(bytes) => lines.push(format!("    [thumbnail] {} ({bytes} bytes)", or_na(&photo.name))),
                None => {
                    *skipped += 1;
                    warn!(photo = %photo.name, "skipping photo with unreadable data");
                }
            }
        }
        let hidden = photos.len().saturating_sub(self.layout.max_thumbnails);
        if hidden > 0 {
            lines.push(format!("    +{hidden} more photo(s)"));
        }
        lines
    }

    fn description(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return "No description".to_owned();
        }
        truncate(text, self.layout.description_width)
    }
}

fn ppm_summary(summary: &PpmSummary) -> Vec<String> {
    vec![
        "PPM TASKS SUMMARY".to_owned(),
        format!(
            "  ✓ Completed: {}    ⏳ In Progress: {}",
            summary.completed, summary.in_progress
        ),
        format!(
            "  ○ Not Started: {}    ⚠ Overdue: {}",
            summary.not_started, summary.overdue
        ),
        format!("  📷 Tasks with Photos: {}", summary.with_photos),
        String::new(),
    ]
}

fn cm_summary(summary: &CmSummary) -> Vec<String> {
    vec![
        "CM TASKS SUMMARY".to_owned(),
        format!("  🔴 Open: {}    ⏳ In Progress: {}", summary.open, summary.in_progress),
        format!(
            "  ⏸ Pending Parts: {}    ✓ Completed: {}    Closed: {}",
            summary.pending_parts, summary.completed, summary.closed
        ),
        format!(
            "  ⚠ High Priority: {}    📷 Tasks with Photos: {}",
            summary.high_priority, summary.with_photos
        ),
        String::new(),
    ]
}

/// Flow blocks onto pages of `lines_per_page` lines, footer included.
///
/// A block taller than a page gets a page of its own and overflows it.
fn paginate(blocks: Vec<Vec<String>>, lines_per_page: usize) -> Vec<ReportPage> {
    let body = lines_per_page.saturating_sub(FOOTER_LINES).max(1);
    let mut bodies: Vec<Vec<String>> = vec![Vec::new()];
    for block in blocks {
        if let Some(current) = bodies.last_mut()
            && !current.is_empty()
            && current.len() + block.len() > body
        {
            bodies.push(Vec::new());
        }
        if let Some(current) = bodies.last_mut() {
            current.extend(block);
        }
    }
    let total = bodies.len();
    bodies
        .into_iter()
        .enumerate()
        .map(|(index, mut lines)| {
            lines.push(format!("Page {} of {total}", index + 1));
            lines.push(FOOTER_NOTICE.to_owned());
            ReportPage { lines }
        })
        .collect()
}

/// Size of the image behind a `data:` URL, or `None` if it does not decode.
fn decoded_len(data_url: &str) -> Option<usize> {
    let (meta, payload) = data_url.strip_prefix("data:")?.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(payload.trim()).ok().map(|bytes| bytes.len())
}

/// Cut `text` to at most `width` graphemes, marking the cut with `...`.
fn truncate(text: &str, width: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= width {
        return text.to_owned();
    }
    let mut out: String = graphemes[..width.saturating_sub(3)].concat();
    out.push_str("...");
    out
}

fn or_na(value: &str) -> &str {
    or_default(value, "N/A")
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use airfield_core::status::PpmStatus;
    use time::macros::{date, datetime};

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn ppm(due: Date) -> PpmTask {
        let mut task = PpmTask::new(due);
        task.description = "Inspect runway edge lights".into();
        task
    }

    #[test]
    fn empty_selection_is_an_error() {
        let config = TrackerConfig::default();
        let window = ReportWindow::current_month(date!(2025 - 03 - 10));
        let err = ReportBuilder::new(&config)
            .build(window, &[ppm(date!(2025 - 01 - 01))], &[], datetime!(2025-03-10 09:00 UTC))
            .expect_err("nothing in March");
        assert!(matches!(err, ReportError::NoTasks("date range")));
    }

    #[test]
    fn header_and_footer_follow_layout() {
        let config = TrackerConfig::default();
        let window = ReportWindow::current_month(date!(2025 - 01 - 15));
        let doc = ReportBuilder::new(&config)
            .build(window, &[ppm(date!(2025 - 01 - 20))], &[], datetime!(2025-01-15 09:00 UTC))
            .expect("report");
        assert_eq!(doc.file_stem, "AGL_Maintenance_Report_2025-01-01_to_2025-01-31");
        let text = doc.render_text();
        assert!(text.starts_with("AGL MCT AIRFIELD\nMAINTENANCE TRACKER REPORT"));
        assert!(text.contains("Report Period: 01 Jan 2025 to 31 Jan 2025"));
        assert!(text.contains("Total PPM Tasks: 1 | Total CM Tasks: 0"));
        assert!(text.contains("PPM TASKS SUMMARY"));
        assert!(!text.contains("CM TASKS SUMMARY"));
        assert!(text.contains("Status: ○ Not Started"));
        assert!(text.contains("Day: Not assigned"));
        assert!(text.ends_with("Page 1 of 1\nAGL MCT Airfield - Confidential"));
    }

    #[test]
    fn thumbnails_are_capped_and_bad_data_skipped() {
        let config = TrackerConfig::default();
        let now = datetime!(2025-01-15 09:00 UTC);
        let mut task = ppm(date!(2025 - 01 - 20));
        task.photos = vec![
            Photo::new("a.png", PIXEL, now),
            Photo::new("broken.png", "data:image/png;base64,@@@", now),
            Photo::new("c.png", PIXEL, now),
            Photo::new("d.png", PIXEL, now),
            Photo::new("e.png", PIXEL, now),
        ];
        let doc = ReportBuilder::new(&config)
            .build(ReportWindow::current_month(now.date()), &[task], &[], now)
            .expect("report");
        let text = doc.render_text();
        assert_eq!(doc.skipped_photos, 1);
        assert_eq!(text.matches("[thumbnail]").count(), 2);
        assert!(text.contains("Photos: 5 attached"));
        assert!(text.contains("+2 more photo(s)"));
    }

    #[test]
    fn mission_window_uses_activity() {
        let config = TrackerConfig::default();
        let now = datetime!(2025-01-15 12:00 UTC);
        let mut recent = CmTask::new(date!(2024 - 12 - 01));
        recent.work_order = "WO-7".into();
        recent.updated_at = Some(now - Duration::minutes(30));
        let mut stale = CmTask::new(date!(2025 - 01 - 15));
        stale.updated_at = Some(now - Duration::hours(3));
        let legacy = CmTask::new(date!(2025 - 01 - 15));
        let doc = ReportBuilder::new(&config)
            .build(ReportWindow::recent_mission(now), &[], &[recent, stale, legacy], now)
            .expect("report");
        assert_eq!(doc.title, "MISSION TIME REPORT");
        assert_eq!(doc.cm_count, 1);
        let text = doc.render_text();
        assert!(text.contains("CM TASK 1 - WO: WO-7"));
        assert!(text.contains("Assigned To: Unassigned"));
        assert_eq!(doc.file_stem, "AGL_Mission_Report_2025-01-15T1000_to_2025-01-15T1200");
    }

    #[test]
    fn blocks_flow_onto_numbered_pages() {
        let mut config = TrackerConfig::default();
        config.report.lines_per_page = 20;
        let tasks: Vec<PpmTask> = (0..6)
            .map(|offset| {
                let mut task = ppm(date!(2025 - 01 - 10));
                task.status = if offset % 2 == 0 { PpmStatus::Completed } else { PpmStatus::InProgress };
                task
            })
            .collect();
        let doc = ReportBuilder::new(&config)
            .build(ReportWindow::current_month(date!(2025 - 01 - 01)), &tasks, &[], datetime!(2025-01-01 09:00 UTC))
            .expect("report");
        let pages = doc.pages.len();
        assert!(pages > 1);
        for (index, page) in doc.pages.iter().enumerate() {
            assert_eq!(page.lines[page.lines.len() - 2], format!("Page {} of {pages}", index + 1));
            assert!(page.lines.len() <= 20);
        }
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let long = "x".repeat(60);
        let cut = truncate(&long, 55);
        assert_eq!(cut.len(), 55);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short", 55), "short");
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
    }
}
