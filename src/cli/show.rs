use super::{table, ui};
use crate::core::config::AppConfig;
use crate::core::fetch::JsonFetcher;
use crate::widget::{Widget, WidgetSnapshot, WidgetStatus};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Upper bound for the first bulk update, covering listing and detail retries.
const FIRST_UPDATE_TIMEOUT: Duration = Duration::from_secs(120);

fn first_update_done(snapshot: &WidgetSnapshot) -> bool {
    match snapshot.status {
        WidgetStatus::Loading => false,
        WidgetStatus::Failed(_) => true,
        WidgetStatus::Ready => snapshot.currencies.is_empty() || snapshot.last_attempt.is_some(),
    }
}

/// Starts a widget, prints the table once the first update landed and exits.
pub async fn run(config: &AppConfig, fetcher: Arc<dyn JsonFetcher>) -> Result<()> {
    let handle = Widget::new(config.settings(), fetcher).spawn();
    let mut snapshots = handle.subscribe();

    let spinner = ui::new_spinner("Fetching currency data...");
    // The watch guard must not outlive the wait.
    let waited = tokio::time::timeout(FIRST_UPDATE_TIMEOUT, async {
        snapshots.wait_for(first_update_done).await.map(|_| ())
    })
    .await;
    spinner.finish_and_clear();

    if waited.is_err() {
        warn!("Timed out waiting for currency data, showing what is available");
    }

    let snapshot = handle.snapshot();
    println!(
        "{}",
        table::render(&snapshot, &config.view, &config.show_column_headers)
    );
    handle.shutdown().await;

    if let WidgetStatus::Failed(message) = snapshot.status {
        anyhow::bail!(message);
    }
    // Stale rows are still worth showing; an empty table is not.
    match snapshot.last_error {
        Some(error) if snapshot.records.loaded_count() == 0 => anyhow::bail!(error),
        _ => {}
    }
    Ok(())
}
