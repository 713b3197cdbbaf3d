//! CLI entry point for tasknest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

const DEFAULT_USER: &str = "me@localhost";

/// Personal tasks with search, a kanban board and a calendar timeline.
#[derive(Parser, Debug)]
#[command(
    name = "tasknest",
    version,
    about = "tasknest: personal tasks with search, kanban board and calendar views"
)]
struct Cli {
    /// Data directory (defaults to the platform data directory).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Profile email; created on first use.
    #[arg(long, global = true, default_value = DEFAULT_USER)]
    user: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a task.
    Add {
        text: String,
        #[command(flatten)]
        fields: TaskFields,
    },

    /// Edit a task. An empty value clears an optional field.
    Edit {
        task: String,
        #[arg(long)]
        text: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },

    /// List tasks.
    Ls(LsArgs),

    /// Toggle a task's completion.
    Done { task: String },

    /// Move a task on the kanban board (todo, in-progress, completed).
    Status { task: String, status: String },

    /// Assign a task.
    Assign { task: String, assignee: String },

    /// Delete tasks.
    Rm {
        #[arg(required = true)]
        tasks: Vec<String>,
    },

    /// Delete every completed task.
    ClearCompleted,

    /// Comment on a task.
    Comment { task: String, text: String },

    /// Show a task's comments.
    Comments { task: String },

    /// Manage categories.
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Summary statistics.
    Stats {
        /// Reference day for "due today" (YYYY-MM-DD).
        #[arg(long)]
        today: Option<String>,
    },

    /// Show the kanban board.
    Board,

    /// Tasks starting or due in a month.
    Timeline {
        /// Month as YYYY-MM (defaults to the current month).
        #[arg(long)]
        month: Option<String>,
    },

    /// Export tasks and categories as JSON.
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import an export document into the current profile.
    Import { path: PathBuf },

    /// Bundle files into a .tar.gz with one folder per file type.
    Organize {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long, default_value = "organized_files.tar.gz")]
        output: PathBuf,
    },

    /// Theme and preferences.
    #[command(subcommand)]
    Theme(ThemeCommand),
}

#[derive(Args, Debug, Default)]
struct TaskFields {
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(short = 'p', long)]
    priority: Option<String>,
    /// First day of work (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,
    /// Deadline (YYYY-MM-DD).
    #[arg(long)]
    due: Option<String>,
    #[arg(long)]
    color: Option<String>,
}

#[derive(Args, Debug, Default)]
struct LsArgs {
    /// Case-insensitive text search over text and description.
    #[arg(short = 's', long)]
    search: Option<String>,
    /// Category name; repeat to accept several.
    #[arg(long = "category")]
    categories: Vec<String>,
    #[arg(short = 'p', long = "priority")]
    priorities: Vec<String>,
    /// Earliest due date (inclusive).
    #[arg(long)]
    from: Option<String>,
    /// Latest due date (inclusive).
    #[arg(long)]
    until: Option<String>,
    /// all, active or completed.
    #[arg(long)]
    status: Option<String>,
    /// created-at, due-date, priority or alphabetical.
    #[arg(long)]
    sort: Option<String>,
    /// asc or desc.
    #[arg(long)]
    direction: Option<String>,
    #[arg(long, value_enum, default_value_t = LsFormat::Table)]
    format: LsFormat,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum, PartialEq, Eq)]
enum LsFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    /// Create a category.
    Add { name: String },
    /// Rename a category.
    Rename { name: String, new_name: String },
    /// Delete a category.
    Rm { name: String },
    /// List categories with task counts.
    Ls,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum Switch {
    On,
    Off,
}

impl Switch {
    const fn enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(Subcommand, Debug)]
enum ThemeCommand {
    /// Print the current settings.
    Show,
    /// Apply a predefined palette (Ocean, Forest, Sunset, Royal, Midnight).
    Palette { name: String },
    /// Override one color slot with a #rrggbb value.
    Set { slot: String, value: String },
    /// Dark mode.
    Dark {
        #[arg(value_enum)]
        mode: Switch,
    },
    /// Dense layout.
    Compact {
        #[arg(value_enum)]
        mode: Switch,
    },
    /// Success messages after each command.
    Notifications {
        #[arg(value_enum)]
        mode: Switch,
    },
    /// Write the settings document.
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the settings with a document.
    Import { path: PathBuf },
    /// Restore the defaults.
    Reset,
}

fn main() -> Result<()> {
    let Cli { data_dir, user, cmd } = Cli::parse();
    install_tracing();

    let data_dir = match data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(commands::run(&data_dir, &user, cmd))
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("tasknest"))
        .context("could not determine a data directory; pass --data-dir")
}

fn install_tracing() {
    // RUST_LOG is honoured; the default level is INFO.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}
