use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use airfield_app::filter_util::TaskFilterBuilder;
use airfield_app::service::{CmInput, PpmInput, TaskService};
use airfield_app::sync_guard::SyncGuard;
use airfield_app::task_repository::{Notice, TaskRepository};
use airfield_app::TrackerConfig;
use airfield_core::filter::TaskFilter;
use airfield_core::id::TaskId;
use airfield_core::task::{CategoryField, TaskKind};
use airfield_store::LocalStore;
use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::{CmCommand, CmFields, CmFilterArgs, Command, PpmCommand, PpmFields, PpmFilterArgs};

mod handlers;
mod render;

/// Build a service over the local store in `data_dir`.
pub fn open_service(data_dir: &Path) -> Result<TaskService> {
    let config = TrackerConfig::load(data_dir)?;
    let repo = TaskRepository::new(
        None,
        Arc::new(LocalStore::new(data_dir)),
        SyncGuard::new(config.cooldown()),
    );
    let mut service = TaskService::new(repo, config);
    let report = service.start().context("failed to load tasks")?;
    if !report.dropped.is_empty() {
        warn!(
            dropped = report.dropped.len(),
            "ignored records with invalid dates; run `airfield clean` to remove them"
        );
    }
    info!(source = report.source, ppm = report.ppm, cm = report.cm, "tasks loaded");
    Ok(service)
}

pub fn run(command: Command, service: &mut TaskService) -> Result<()> {
    let result = match command {
        Command::Dashboard => {
            handlers::dashboard(service);
            Ok(())
        }
        Command::Ppm(cmd) => run_ppm(cmd, service),
        Command::Cm(cmd) => run_cm(cmd, service),
        Command::History { limit } => {
            handlers::history(service, limit);
            Ok(())
        }
        Command::Report {
            from,
            to,
            mission,
            mission_start,
            mission_end,
            out,
        } => handlers::report(
            service,
            handlers::ReportArgs {
                from,
                to,
                mission,
                mission_start,
                mission_end,
                out,
            },
        ),
        Command::ExportCsv { out } => handlers::export_csv(service, out),
        Command::ExportJson { kind, out } => handlers::export_json(service, kind, &out),
        Command::Clean => handlers::clean(service),
    };
    for notice in service.take_notices() {
        match notice {
            Notice::FallbackActivated { reason } => {
                eprintln!("warning: remote sync unavailable, saved locally ({reason})");
            }
            Notice::SyncRestored => eprintln!("remote sync restored"),
        }
    }
    result
}

fn run_ppm(command: PpmCommand, service: &mut TaskService) -> Result<()> {
    let now = time::OffsetDateTime::now_utc();
    match command {
        PpmCommand::List {
            filter,
            by_urgency,
            format,
        } => handlers::list_ppm(service, &ppm_filter(filter)?, by_urgency, format),
        PpmCommand::Add(fields) => {
            let saved = service.create_ppm(ppm_input(fields), now)?;
            println!("created PPM task: {}", saved.id);
            handlers::report_completion(saved.completion);
            Ok(())
        }
        PpmCommand::Edit { id, fields } => {
            let saved = service.update_ppm(parse_task_id(&id)?, ppm_input(fields), now)?;
            println!("updated PPM task: {}", saved.id);
            handlers::report_completion(saved.completion);
            Ok(())
        }
        PpmCommand::Complete { id } => {
            let completion = service.complete_ppm(parse_task_id(&id)?, now)?;
            handlers::report_completion(Some(completion));
            Ok(())
        }
        PpmCommand::Delete { id } => handlers::delete(service, TaskKind::Ppm, &id, now),
        PpmCommand::PhotoAdd { id, file } => handlers::add_photo(service, TaskKind::Ppm, &id, &file, now),
        PpmCommand::PhotoRm { id, index } => handlers::remove_photo(service, TaskKind::Ppm, &id, index, now),
    }
}

fn run_cm(command: CmCommand, service: &mut TaskService) -> Result<()> {
    let now = time::OffsetDateTime::now_utc();
    match command {
        CmCommand::List { filter, format } => handlers::list_cm(service, &cm_filter(filter)?, format),
        CmCommand::Add(fields) => {
            let id = service.create_cm(cm_input(fields), now)?;
            println!("created CM task: {id}");
            Ok(())
        }
        CmCommand::Edit { id, fields } => {
            let id = parse_task_id(&id)?;
            service.update_cm(id, cm_input(fields), now)?;
            println!("updated CM task: {id}");
            Ok(())
        }
        CmCommand::Delete { id } => handlers::delete(service, TaskKind::Cm, &id, now),
        CmCommand::PhotoAdd { id, file } => handlers::add_photo(service, TaskKind::Cm, &id, &file, now),
        CmCommand::PhotoRm { id, index } => handlers::remove_photo(service, TaskKind::Cm, &id, index, now),
    }
}

fn ppm_input(fields: PpmFields) -> PpmInput {
    PpmInput {
        shift_type: fields.shift_type,
        description: fields.description,
        task_type: fields.task_type,
        due_date: fields.due,
        frequency: fields.frequency,
        status: fields.status,
        day_shift: fields.day_shift,
        night_shift: fields.night_shift,
    }
}

fn cm_input(fields: CmFields) -> CmInput {
    CmInput {
        work_order: fields.work_order,
        description: fields.description,
        reported_by: fields.reported_by,
        date_reported: fields.reported,
        status: fields.status,
        assigned_to: fields.assigned_to,
        priority: fields.priority,
        location: fields.location,
    }
}

fn ppm_filter(args: PpmFilterArgs) -> Result<TaskFilter> {
    let builder = TaskFilterBuilder::new(TaskKind::Ppm)
        .with_category(CategoryField::ShiftType, args.shift_type.as_deref())
        .and_then(|b| b.with_category(CategoryField::TaskType, args.task_type.as_deref()))
        .and_then(|b| b.with_category(CategoryField::Status, args.status.as_deref()))
        .and_then(|b| b.with_category(CategoryField::Frequency, args.frequency.as_deref()))
        .and_then(|b| b.with_date_range(args.from.as_deref(), args.to.as_deref()))
        .map_err(|err| anyhow!(err.describe_user_facing()))?;
    Ok(builder.with_text(args.search).build())
}

fn cm_filter(args: CmFilterArgs) -> Result<TaskFilter> {
    let builder = TaskFilterBuilder::new(TaskKind::Cm)
        .with_category(CategoryField::Status, args.status.as_deref())
        .and_then(|b| b.with_category(CategoryField::Priority, args.priority.as_deref()))
        .and_then(|b| b.with_category(CategoryField::Location, args.location.as_deref()))
        .and_then(|b| b.with_category(CategoryField::AssignedTo, args.assigned_to.as_deref()))
        .and_then(|b| b.with_date_range(args.from.as_deref(), args.to.as_deref()))
        .map_err(|err| anyhow!(err.describe_user_facing()))?;
    Ok(builder.with_text(args.search).build())
}

pub fn parse_task_id(raw: &str) -> Result<TaskId> {
    TaskId::from_str(raw).with_context(|| format!("invalid task id: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use airfield_core::task::PpmTask;
    use tempfile::TempDir;
    use time::macros::date;

    fn service() -> Result<(TempDir, TaskService)> {
        let dir = TempDir::new()?;
        let service = open_service(dir.path())?;
        Ok((dir, service))
    }

    fn add_args(description: &str, due: &str) -> PpmFields {
        PpmFields {
            shift_type: "Day".into(),
            description: description.into(),
            due: due.into(),
            ..PpmFields::default()
        }
    }

    #[test]
    fn run_add_then_complete() -> Result<()> {
        let (_dir, mut service) = service()?;
        run(
            Command::Ppm(PpmCommand::Add(PpmFields {
                frequency: Some("Weekly".into()),
                ..add_args("Inspect PAPI", "2025-01-01")
            })),
            &mut service,
        )?;
        let id = service.ppm()[0].id;
        run(Command::Ppm(PpmCommand::Complete { id: id.to_string() }), &mut service)?;
        assert_eq!(service.ppm()[0].due_date, date!(2025 - 01 - 08));
        Ok(())
    }

    #[test]
    fn run_rejects_invalid_due_date() -> Result<()> {
        let (_dir, mut service) = service()?;
        let err = run(
            Command::Ppm(PpmCommand::Add(add_args("Inspect PAPI", "2025-13-01"))),
            &mut service,
        )
        .err()
        .ok_or_else(|| anyhow!("expected validation error"))?;
        assert_eq!(err.to_string(), "Please enter a valid due date");
        assert!(service.ppm().is_empty());
        Ok(())
    }

    #[test]
    fn ppm_filter_ignores_all_selectors() -> Result<()> {
        let filter = ppm_filter(PpmFilterArgs {
            shift_type: Some("All".into()),
            status: Some("All".into()),
            ..PpmFilterArgs::default()
        })?;
        assert!(filter.is_empty());
        assert!(filter.matches(&PpmTask::new(date!(2025 - 01 - 01))));
        Ok(())
    }

    #[test]
    fn inverted_range_is_reported_plainly() {
        let err = ppm_filter(PpmFilterArgs {
            from: Some("2025-02-01".into()),
            to: Some("2025-01-01".into()),
            ..PpmFilterArgs::default()
        })
        .err();
        assert_eq!(
            err.map(|e| e.to_string()).as_deref(),
            Some("Start must be before end")
        );
    }

    #[test]
    fn parse_task_id_rejects_garbage() {
        assert!(parse_task_id("abc").is_err());
        assert!(parse_task_id(" 1735689600000 ").is_ok());
    }
}
