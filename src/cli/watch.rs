use super::table;
use crate::core::config::AppConfig;
use crate::core::fetch::JsonFetcher;
use crate::widget::Widget;
use anyhow::{Context, Result};
use console::Term;
use std::sync::Arc;
use tracing::info;

/// Keeps a widget running and redraws the table on every change until Ctrl-C.
pub async fn run(config: &AppConfig, fetcher: Arc<dyn JsonFetcher>) -> Result<()> {
    let handle = Widget::new(config.settings(), fetcher).spawn();
    let mut snapshots = handle.subscribe();
    let term = Term::stdout();

    loop {
        let output = {
            let snapshot = snapshots.borrow_and_update();
            table::render(&snapshot, &config.view, &config.show_column_headers)
        };
        term.clear_screen().context("Failed to clear the terminal")?;
        term.write_line(&output)
            .context("Failed to write to the terminal")?;

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, stopping widget");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
