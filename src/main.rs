//! unity-deploy: merge freshly exported Unity Android libraries into
//! customized projects, one named profile per target project.

use anyhow::Result;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use unity_deploy::{config, unity};

mod commands;

#[derive(Parser)]
#[command(name = "unity-deploy")]
#[command(about = "Deploy exported Unity libraries into Android projects", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: platform config dir, or $UNITY_DEPLOY_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample config with app, launcher and kiosk profiles
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// List configured profiles
    List,

    /// Show a profile's resolved paths and steps
    Show {
        profile: String,

        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a profile's merge steps
    Deploy {
        profile: String,

        /// Show what would be done without making changes
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Manifest template name (overrides the profile's selection)
        #[arg(long)]
        manifest: Option<String>,
    },

    /// Check a deployed library against its profile's steps
    Verify {
        profile: String,

        /// Manifest template name the library was deployed with
        #[arg(long)]
        manifest: Option<String>,
    },

    /// Replace the library with its backup
    Restore {
        profile: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Snapshot the library (or its backup) into a .tar.gz
    Archive {
        profile: String,

        /// Output file (will add .tar.gz if not present)
        #[arg(short, long)]
        output: Option<String>,

        /// Archive the backup library instead
        #[arg(long)]
        backup: bool,
    },

    /// Show recent deployments
    History {
        /// Only runs of this profile
        #[arg(long)]
        profile: Option<String>,

        /// Number of runs to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "unity_deploy=debug",
        _ => "unity_deploy=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = config::config_path(cli.config.as_deref())?;
    tracing::debug!(path = %config_path.display(), "using config");

    match cli.command {
        Commands::Init { force } => {
            commands::init::execute(&config_path, force)?;
        }

        Commands::List => {
            let config = config::Config::load(&config_path)?;
            println!("{}", commands::list::execute(&config)?);
        }

        Commands::Show { profile, json } => {
            let config = config::Config::load(&config_path)?;
            println!(
                "{}",
                commands::show::execute(&profile, config.profile(&profile)?, json)?
            );
        }

        Commands::Deploy {
            profile,
            dry_run,
            yes,
            manifest,
        } => {
            if dry_run {
                println!("{}", "(DRY-RUN MODE - no changes will be made)".blue());
            }
            let config = config::Config::load(&config_path)?;
            let options = commands::deploy::DeployOptions {
                dry_run,
                yes,
                manifest,
            };
            commands::deploy::execute(
                &profile,
                config.profile(&profile)?,
                &options,
                &config::history_db_path()?,
            )?;
        }

        Commands::Verify { profile, manifest } => {
            let config = config::Config::load(&config_path)?;
            println!(
                "{}",
                commands::verify::execute(config.profile(&profile)?, manifest.as_deref())?
            );
        }

        Commands::Restore { profile, yes } => {
            let config = config::Config::load(&config_path)?;
            commands::restore::execute(
                &profile,
                config.profile(&profile)?,
                yes,
                &config::history_db_path()?,
            )?;
        }

        Commands::Archive {
            profile,
            output,
            backup,
        } => {
            let config = config::Config::load(&config_path)?;
            commands::archive::execute(
                &profile,
                config.profile(&profile)?,
                output.as_deref(),
                backup,
            )?;
        }

        Commands::History { profile, limit } => {
            let db = config::history_db_path()?;
            println!(
                "{}",
                commands::history::execute(&db, profile.as_deref(), limit)?
            );
        }
    }

    Ok(())
}
