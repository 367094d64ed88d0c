use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coinboard::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for coinboard::AppCommand {
    fn from(cmd: Commands) -> coinboard::AppCommand {
        match cmd {
            Commands::Show => coinboard::AppCommand::Show,
            Commands::Watch => coinboard::AppCommand::Watch,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch current prices once and print them
    Show,
    /// Keep prices updated until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => coinboard::cli::setup::setup(),
        Some(cmd) => coinboard::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
