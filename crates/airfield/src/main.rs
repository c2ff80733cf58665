//! CLI entry point for the airfield maintenance tracker.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

const DEFAULT_DATA_DIR: &str = ".airfield";

/// Preventive and corrective maintenance tracking for airfield ground lighting.
#[derive(Parser, Debug)]
#[command(
    name = "airfield",
    version,
    about = "airfield: PPM and CM maintenance tracker"
)]
struct Cli {
    /// Directory holding the task backups and config.toml (defaults to ~/.airfield).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the dashboard counters.
    Dashboard,

    /// Manage preventive maintenance tasks.
    #[command(subcommand)]
    Ppm(PpmCommand),

    /// Manage corrective maintenance tasks.
    #[command(subcommand)]
    Cm(CmCommand),

    /// List recently completed PPM tasks.
    History {
        #[arg(long, default_value_t = airfield_core::dashboard::DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },

    /// Write a paginated text report.
    Report {
        /// First day of the report period (YYYY-MM-DD).
        #[arg(long, requires = "to", conflicts_with_all = ["mission", "mission_start"])]
        from: Option<String>,
        /// Last day of the report period (YYYY-MM-DD).
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Report on tasks modified in the last two hours.
        #[arg(long, conflicts_with = "mission_start")]
        mission: bool,
        /// Mission start (RFC 3339 or YYYY-MM-DDTHH:MM, UTC).
        #[arg(long, requires = "mission_end")]
        mission_start: Option<String>,
        /// Mission end (RFC 3339 or YYYY-MM-DDTHH:MM, UTC).
        #[arg(long, requires = "mission_start")]
        mission_end: Option<String>,
        /// Output directory (defaults to the current directory).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Export PPM tasks as CSV.
    ExportCsv {
        /// Output file (defaults to AGL_Maintenance_Report_<today>.csv).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Export a collection as JSON.
    ExportJson {
        #[arg(long, value_enum, default_value_t = KindArg::Ppm)]
        kind: KindArg,
        #[arg(long)]
        out: PathBuf,
    },

    /// Remove stored records whose dates are invalid.
    Clean,
}

#[derive(Subcommand, Debug)]
enum PpmCommand {
    /// List PPM tasks with their smart status.
    List {
        #[command(flatten)]
        filter: PpmFilterArgs,
        /// Sort by urgency instead of list order.
        #[arg(long)]
        by_urgency: bool,
        #[arg(long, value_enum, default_value_t = ListFormat::Table)]
        format: ListFormat,
    },
    /// Create a PPM task.
    Add(PpmFields),
    /// Replace the fields of a PPM task.
    Edit {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        fields: PpmFields,
    },
    /// Mark a PPM task completed.
    Complete {
        #[arg(long)]
        id: String,
    },
    /// Delete a PPM task.
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Attach an image file.
    PhotoAdd {
        #[arg(long)]
        id: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Remove the photo at a zero-based index.
    PhotoRm {
        #[arg(long)]
        id: String,
        #[arg(long)]
        index: usize,
    },
}

#[derive(Subcommand, Debug)]
enum CmCommand {
    /// List CM tasks.
    List {
        #[command(flatten)]
        filter: CmFilterArgs,
        #[arg(long, value_enum, default_value_t = ListFormat::Table)]
        format: ListFormat,
    },
    /// Create a CM task.
    Add(CmFields),
    /// Replace the fields of a CM task.
    Edit {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        fields: CmFields,
    },
    /// Delete a CM task.
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Attach an image file.
    PhotoAdd {
        #[arg(long)]
        id: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Remove the photo at a zero-based index.
    PhotoRm {
        #[arg(long)]
        id: String,
        #[arg(long)]
        index: usize,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct PpmFields {
    #[arg(long, default_value = "")]
    shift_type: String,
    #[arg(long)]
    description: String,
    #[arg(long = "type", default_value = "")]
    task_type: String,
    /// Due date (YYYY-MM-DD).
    #[arg(long)]
    due: String,
    #[arg(long)]
    frequency: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long, default_value = "")]
    day_shift: String,
    #[arg(long, default_value = "")]
    night_shift: String,
}

#[derive(Args, Debug, Clone, Default)]
struct CmFields {
    #[arg(long)]
    work_order: String,
    #[arg(long)]
    description: String,
    #[arg(long, default_value = "")]
    reported_by: String,
    /// Report date (YYYY-MM-DD).
    #[arg(long)]
    reported: String,
    #[arg(long)]
    status: Option<String>,
    #[arg(long, default_value = "")]
    assigned_to: String,
    #[arg(long)]
    priority: Option<String>,
    #[arg(long, default_value = "")]
    location: String,
}

#[derive(Args, Debug, Clone, Default)]
struct PpmFilterArgs {
    #[arg(long)]
    shift_type: Option<String>,
    #[arg(long = "type")]
    task_type: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    frequency: Option<String>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
struct CmFilterArgs {
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    priority: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    assigned_to: Option<String>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum ListFormat {
    #[default]
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Ppm,
    Cm,
}

fn main() -> Result<()> {
    let Cli { data_dir, cmd } = Cli::parse();
    install_tracing();

    let data_dir = resolve_data_dir(data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    let mut service = commands::open_service(&data_dir)?;
    commands::run(cmd, &mut service)
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        dirs::home_dir().map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), |home| home.join(DEFAULT_DATA_DIR))
    })
}

fn install_tracing() {
    // RUST_LOG is honoured; INFO by default.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}
