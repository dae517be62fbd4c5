use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use godel_core::GodelError;
use std::ffi::OsString;
use std::path::PathBuf;

use godel_manager::commands::{self, GlobalOptions, Launcher};
use godel_manager::{logging, progress};

#[derive(Parser)]
#[command(name = "godel")]
#[command(about = "Resolves versioned build plugins and runs their tasks")]
#[command(version)]
struct Cli {
    /// Print debug logs and full error chains; forwarded to plugins that accept it
    #[arg(long, global = true)]
    debug: bool,

    /// Hide progress output
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Project directory (defaults to the nearest directory containing godel/config/godel.yml)
    #[arg(long, value_name = "DIR", global = true)]
    project_dir: Option<PathBuf>,

    /// Path to godel.yml; its directory also holds plugin configuration
    #[arg(long, value_name = "FILE", global = true)]
    godel_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tasks provided by the configured plugins
    Tasks,

    /// Show resolved plugins, their executables and assets
    Info,

    /// Run every verification task
    Verify {
        /// Apply fixes; --apply=false only checks
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        apply: bool,

        /// Task to leave out (repeatable)
        #[arg(long, value_name = "TASK")]
        skip: Vec<String>,

        /// Flag for one verify task (repeatable)
        #[arg(long = "verify-flag", value_name = "TASK:FLAG[=VALUE]")]
        verify_flags: Vec<String>,
    },

    /// Upgrade plugin configuration files to their latest format
    UpgradeConfig,

    /// Print the launcher version
    Version,

    /// Any plugin task, followed by its arguments
    #[command(external_subcommand)]
    Task(Vec<OsString>),
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);
    progress::set_quiet(cli.quiet);

    let debug = cli.debug;
    if let Err(e) = run_command(cli) {
        // Plugins report their own failures; only the exit status is ours.
        if let Some(err @ GodelError::TaskFailed { .. }) = e.downcast_ref::<GodelError>() {
            std::process::exit(err.exit_code());
        }
        if debug {
            eprintln!("{} {:?}", "Error:".red().bold(), e);
        } else {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        std::process::exit(1);
    }
}

fn run_command(cli: Cli) -> anyhow::Result<()> {
    let opts = GlobalOptions {
        debug: cli.debug,
        project_dir: cli.project_dir,
        godel_config: cli.godel_config,
    };

    match cli.command {
        Commands::Version => {
            println!("godel version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Tasks => commands::tasks::list_tasks(&Launcher::load(&opts)?),
        Commands::Info => commands::info::show_info(&Launcher::load(&opts)?),
        Commands::Verify {
            apply,
            skip,
            verify_flags,
        } => commands::verify::verify(&Launcher::load(&opts)?, apply, skip, &verify_flags),
        Commands::UpgradeConfig => commands::upgrade_config::upgrade_config(&Launcher::load(&opts)?),
        Commands::Task(args) => commands::run::run_task(&Launcher::load(&opts)?, &args),
    }
}
