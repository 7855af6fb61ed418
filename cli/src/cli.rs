//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags, PathFlags};
use crate::commands;

/// Ordered deployment of interdependent infrastructure layers
#[derive(Parser)]
#[command(
    name = "strata",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log progress details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Configuration file
    #[arg(long, global = true, env = "STRATA_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// State document location
    #[arg(long, global = true, env = "STRATA_STATE", value_name = "PATH")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy every enabled layer in dependency order
    Deploy(commands::deploy::DeployArgs),

    /// Show the deployment order without touching anything
    Plan,

    /// Tear down layers in reverse dependency order
    Destroy(commands::destroy::DestroyArgs),

    /// Show the recorded deployment state
    Status,

    /// Print a layer's recorded outputs
    Outputs(commands::outputs::OutputsArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot run. Commands that ran but
    /// ended unsuccessfully report that through the exit code instead.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            verbose,
            yes,
            config,
            state,
            command,
        } = self;
        let app = AppContext::new(AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
                verbose,
            },
            paths: PathFlags { config, state },
            yes,
        });
        match command {
            Command::Deploy(args) => commands::deploy::run(&app, &args).await,
            Command::Plan => commands::plan::run(&app),
            Command::Destroy(args) => commands::destroy::run(&app, &args).await,
            Command::Status => commands::status::run(&app).await,
            Command::Outputs(args) => commands::outputs::run(&app, &args).await,
            Command::Version => commands::version::run(&app),
        }
    }
}
