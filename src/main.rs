mod api;
mod calc;
mod cmd;
mod data;
mod error;
mod logging;
mod planner;
mod ui;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cmd::create::{CreateArgs, MonthAssignment, PercentInput};
use cmd::update::UpdateArgs;
use data::AllocationType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "atlas", about = "Plan employee allocations month by month")]
struct Cli {
    /// Path to the data directory containing config and data files (default: ./config)
    #[arg(long, default_value = "./config", global = true)]
    data_dir: PathBuf,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize data files with seed data
    Init,
    /// List the months a date range covers
    Months {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// Flag past months the way the edit form locks them
        #[arg(long)]
        edit: bool,
        /// Print the month list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search employees
    Employees {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Search projects
    Projects {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Search managers
    Managers {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// List allocations
    Allocations {
        /// Only allocations of this employee id
        #[arg(short, long)]
        employee: Option<u64>,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Show one allocation with its monthly breakdown
    Show { id: u64 },
    /// Create an allocation
    Create {
        #[arg(long)]
        employee: u64,
        #[arg(long)]
        project: Option<u64>,
        /// Defaults to `default_allocation_type` from config.yaml
        #[arg(long = "type", value_enum)]
        allocation_type: Option<AllocationType>,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// Same percentage for every month
        #[arg(long)]
        percent: Option<String>,
        /// Percentage for one month; repeat for each month
        #[arg(long = "month", value_name = "YYYY-MM=N")]
        months: Vec<MonthAssignment>,
    },
    /// Update an allocation. Past months cannot be changed.
    Update {
        id: u64,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long = "type", value_enum)]
        allocation_type: Option<AllocationType>,
        #[arg(long)]
        project: Option<u64>,
        #[arg(long)]
        percent: Option<String>,
        #[arg(long = "month", value_name = "YYYY-MM=N")]
        months: Vec<MonthAssignment>,
        /// Discard percentages without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete an allocation
    Delete {
        id: u64,
        #[arg(short, long)]
        yes: bool,
    },
    /// Open the allocation form
    New,
    /// Open an existing allocation in the form
    Edit { id: u64 },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    // Resolve data_dir to an absolute path so file I/O works regardless of
    // future directory changes within the process.
    let data_dir = if cli.data_dir.is_absolute() {
        cli.data_dir.clone()
    } else {
        std::env::current_dir()?.join(&cli.data_dir)
    };
    data::persistence::set_data_dir(data_dir.clone());

    // Auto-init when the data directory is missing or empty and the user did not
    // explicitly invoke the `init` subcommand.
    let is_init_command = matches!(cli.command, Some(Commands::Init));
    if !is_init_command && dir_needs_init(&data_dir) {
        eprintln!(
            "Data directory '{}' is missing or empty, running init...",
            data_dir.display()
        );
        cmd::init::run()?;
    }

    match cli.command {
        None | Some(Commands::New) => cmd::form::run(None),
        Some(Commands::Edit { id }) => cmd::form::run(Some(id)),
        Some(Commands::Init) => cmd::init::run(),
        Some(Commands::Months {
            start,
            end,
            edit,
            json,
        }) => cmd::months::run(start, end, edit, json),
        Some(Commands::Employees { search, page }) => {
            cmd::directory::run_employees(search.as_deref(), page)
        }
        Some(Commands::Projects { search, page }) => {
            cmd::directory::run_projects(search.as_deref(), page)
        }
        Some(Commands::Managers { search, page }) => {
            cmd::directory::run_managers(search.as_deref(), page)
        }
        Some(Commands::Allocations { employee, page }) => cmd::allocations::run(employee, page),
        Some(Commands::Show { id }) => cmd::allocations::run_show(id),
        Some(Commands::Create {
            employee,
            project,
            allocation_type,
            start,
            end,
            percent,
            months,
        }) => {
            let allocation_type = match allocation_type {
                Some(t) => t,
                None => data::AppSettings::load()?.default_allocation_type,
            };
            cmd::create::run(CreateArgs {
                employee_id: employee,
                project_id: project,
                allocation_type,
                start,
                end,
                percent: PercentInput::from_args(percent, months)?,
            })
        }
        Some(Commands::Update {
            id,
            start,
            end,
            allocation_type,
            project,
            percent,
            months,
            yes,
        }) => cmd::update::run(
            UpdateArgs {
                id,
                start,
                end,
                allocation_type,
                project_id: project,
                percent: PercentInput::from_args(percent, months)?,
            },
            yes,
        ),
        Some(Commands::Delete { id, yes }) => cmd::delete::run(id, yes),
    }
}

/// Returns true when `dir` does not exist or exists but contains no files.
fn dir_needs_init(dir: &std::path::Path) -> bool {
    if !dir.exists() {
        return true;
    }
    dir.read_dir()
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
