pub mod cli;
pub mod core;
pub mod providers;
pub mod store;
pub mod widget;

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Show,
    Watch,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("coinboard starting...");

    let config = match config_path {
        Some(path) => core::config::AppConfig::load_from_path(path)?,
        None => core::config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let fetcher = Arc::new(providers::http::HttpFetcher::new()?);

    match command {
        AppCommand::Show => cli::show::run(&config, fetcher).await,
        AppCommand::Watch => cli::watch::run(&config, fetcher).await,
    }
}
