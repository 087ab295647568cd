use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pzprof::{
    commands,
    config::Config,
    link::select_linker,
    paths::default_config_file,
    probe::detect_symlink_support,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "pzprof")]
#[command(about = "Project Zomboid Profile Switcher - keep several game builds and swap between them")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Log engine steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all stored profiles
    List,

    /// Show the active version and the state of the live paths
    Status,

    /// Show detailed information about a profile
    Inspect {
        /// Name of the profile to inspect
        name: String,
    },

    /// Store the installed version as a new profile and activate it
    Capture {
        /// Name for the new profile (e.g. "Build 41")
        name: String,
    },

    /// Switch to a stored profile
    Use {
        /// Name of the profile to activate
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove the live links so no version is active
    Unlink {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show or change the configured paths
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run diagnostics on the pzprof setup
    Doctor,

    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,

    /// Set one or more paths
    Set {
        /// Steam's steamapps folder
        #[arg(long, value_name = "DIR")]
        steamapps: Option<PathBuf>,

        /// Folder where profiles are stored
        #[arg(long, value_name = "DIR")]
        manager: Option<PathBuf>,

        /// Live Zomboid user-data folder
        #[arg(long, value_name = "DIR")]
        user_data: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "pzprof=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "pzprof", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose);
    let ui = Ui::new(cli.color, cli.no_color);

    let config_file = match cli.config {
        Some(path) => path,
        None => default_config_file()?,
    };
    let config = Config::load_or_init(&config_file)?;

    let support = detect_symlink_support();
    if !support.is_available() {
        ui.warn(commands::PERMISSION_WARNING);
    }
    let linker = select_linker(support);
    tracing::debug!(linker = linker.name(), "selected link strategy");

    let result = match cli.command {
        Commands::List => commands::list(&config, &ui),
        Commands::Status => commands::status(&config, &ui),
        Commands::Inspect { name } => commands::inspect(&config, &name, &ui),
        Commands::Capture { name } => commands::capture(&config, &name, linker, &ui),
        Commands::Use { name, yes } => commands::use_profile(&config, &name, linker, yes, &ui),
        Commands::Unlink { yes } => commands::unlink(&config, yes, &ui),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(&config, &config_file, &ui),
            ConfigAction::Set {
                steamapps,
                manager,
                user_data,
            } => commands::config_set(&config_file, steamapps, manager, user_data, &ui),
        },
        Commands::Doctor => commands::doctor(&config, support, &ui),
        Commands::Completions { .. } => Ok(()),
    };

    if let Err(e) = &result {
        tracing::debug!(error = ?e, "command failed");
    }
    result
}
