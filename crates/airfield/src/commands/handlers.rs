use std::fs;
use std::path::{Path, PathBuf};

use airfield_app::TaskService;
use airfield_app::csv_export::{self, CsvTable, ExportOutcome};
use airfield_app::filter_util::TaskFilterBuilder;
use airfield_app::report::{ReportBuilder, ReportWindow};
use airfield_core::date::today;
use airfield_core::filter::TaskFilter;
use airfield_core::status::sort_by_urgency;
use airfield_core::task::{Completion, Photo, TaskKind};
use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use time::OffsetDateTime;

use super::{parse_task_id, render};
use crate::{KindArg, ListFormat};

pub struct ReportArgs {
    pub from: Option<String>,
    pub to: Option<String>,
    pub mission: bool,
    pub mission_start: Option<String>,
    pub mission_end: Option<String>,
    pub out: Option<PathBuf>,
}

pub fn dashboard(service: &TaskService) {
    let counts = service.dashboard(today());
    println!("Due today:   {}", counts.due_today);
    println!("Overdue:     {}", counts.overdue);
    println!("In progress: {}", counts.in_progress);
    println!("Open CM:     {}", counts.open_cm);
}

pub fn history(service: &TaskService, limit: usize) {
    let entries = service.history(limit);
    if entries.is_empty() {
        println!("No completed tasks yet");
        return;
    }
    render::history_table(&entries);
}

pub fn list_ppm(service: &TaskService, filter: &TaskFilter, by_urgency: bool, format: ListFormat) -> Result<()> {
    let today = today();
    let mut tasks = filter.apply(service.ppm());
    if by_urgency {
        sort_by_urgency(&mut tasks, today, service.config().classifier_options());
    }
    if tasks.is_empty() {
        println!("{}", empty_message(filter));
        return Ok(());
    }
    match format {
        ListFormat::Table => render::ppm_table(&tasks, |task| service.smart_status(task, today)),
        ListFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
    }
    Ok(())
}

pub fn list_cm(service: &TaskService, filter: &TaskFilter, format: ListFormat) -> Result<()> {
    let tasks = filter.apply(service.cm());
    if tasks.is_empty() {
        println!("{}", empty_message(filter));
        return Ok(());
    }
    match format {
        ListFormat::Table => render::cm_table(&tasks),
        ListFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
    }
    Ok(())
}

fn empty_message(filter: &TaskFilter) -> &'static str {
    if filter.is_empty() {
        "No tasks found"
    } else {
        "No tasks matched the provided filters"
    }
}

pub fn report_completion(completion: Option<Completion>) {
    match completion {
        Some(Completion::Rescheduled(next)) => {
            println!("completed; next due {}", airfield_core::date::format_display(next));
        }
        Some(Completion::Finished) => println!("completed"),
        None => {}
    }
}

pub fn delete(service: &mut TaskService, kind: TaskKind, id: &str, now: OffsetDateTime) -> Result<()> {
    let id = parse_task_id(id)?;
    let removed = service.delete(kind, id, now)?;
    println!("deleted {} task {}: {}", removed.kind(), removed.id(), removed.description());
    Ok(())
}

pub fn add_photo(
    service: &mut TaskService,
    kind: TaskKind,
    id: &str,
    file: &Path,
    now: OffsetDateTime,
) -> Result<()> {
    let id = parse_task_id(id)?;
    let photo = read_photo(file, now)?;
    let count = service.add_photo(kind, id, photo, now)?;
    println!("attached {}; {count} photo(s) on task {id}", file.display());
    Ok(())
}

pub fn remove_photo(
    service: &mut TaskService,
    kind: TaskKind,
    id: &str,
    index: usize,
    now: OffsetDateTime,
) -> Result<()> {
    let id = parse_task_id(id)?;
    let removed = service.remove_photo(kind, id, index, now)?;
    println!("removed photo {} from task {id}", removed.name);
    Ok(())
}

fn read_photo(file: &Path, now: OffsetDateTime) -> Result<Photo> {
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} is not a file", file.display()))?;
    let data = format!("data:{};base64,{}", mime_for(file), STANDARD.encode(bytes));
    Ok(Photo::new(name, data, now))
}

fn mime_for(file: &Path) -> &'static str {
    let ext = file
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

pub fn report(service: &TaskService, args: ReportArgs) -> Result<()> {
    let now = OffsetDateTime::now_utc();
    let window = if args.mission {
        ReportWindow::recent_mission(now)
    } else if args.mission_start.is_some() {
        let filter = TaskFilterBuilder::new(TaskKind::Ppm)
            .with_activity_window(args.mission_start.as_deref(), args.mission_end.as_deref())
            .map_err(|err| anyhow!(err.describe_user_facing()))?
            .build();
        match filter.window() {
            Some(airfield_core::filter::TimeWindow::Activity(window)) => ReportWindow::Mission(*window),
            _ => return Err(anyhow!("Please enter valid mission start and end times")),
        }
    } else if args.from.is_some() {
        let filter = TaskFilterBuilder::new(TaskKind::Ppm)
            .with_date_range(args.from.as_deref(), args.to.as_deref())
            .map_err(|err| anyhow!(err.describe_user_facing()))?
            .build();
        match filter.window() {
            Some(airfield_core::filter::TimeWindow::Calendar(range)) => ReportWindow::DateRange(*range),
            _ => return Err(anyhow!("Please enter valid dates")),
        }
    } else {
        ReportWindow::current_month(now.date())
    };

    let doc = ReportBuilder::new(service.config()).build(window, service.ppm(), service.cm(), now)?;
    let dir = args.out.unwrap_or_else(|| PathBuf::from("."));
    let path = doc.write_to_dir(&dir)?;
    println!(
        "wrote {} ({} PPM, {} CM, {} page(s))",
        path.display(),
        doc.ppm_count,
        doc.cm_count,
        doc.pages.len()
    );
    if doc.skipped_photos > 0 {
        eprintln!("warning: {} photo(s) could not be rendered", doc.skipped_photos);
    }
    Ok(())
}

pub fn export_csv(service: &TaskService, out: Option<PathBuf>) -> Result<()> {
    let path = out.unwrap_or_else(|| PathBuf::from(csv_export::csv_file_name(today())));
    print_outcome(&csv_export::export_csv(&CsvTable::from_ppm(service.ppm()), &path)?);
    Ok(())
}

pub fn export_json(service: &TaskService, kind: KindArg, out: &Path) -> Result<()> {
    let outcome = match kind {
        KindArg::Ppm => csv_export::export_json(service.ppm(), out)?,
        KindArg::Cm => csv_export::export_json(service.cm(), out)?,
    };
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &ExportOutcome) {
    match outcome {
        ExportOutcome::Written { rows, path } => println!("exported {rows} row(s) to {}", path.display()),
        ExportOutcome::NoData => println!("No data to export"),
    }
}

pub fn clean(service: &mut TaskService) -> Result<()> {
    let report = service.clean(OffsetDateTime::now_utc())?;
    if report.total() == 0 {
        println!("No invalid records found");
    } else {
        println!(
            "removed {} invalid record(s) ({} PPM, {} CM)",
            report.total(),
            report.removed_ppm,
            report.removed_cm
        );
    }
    Ok(())
}
