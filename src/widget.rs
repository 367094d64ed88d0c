//! A running widget instance: downloads the listing once, resolves the
//! configured currencies, then keeps their quotes fresh on a fixed interval.
//!
//! Each instance is one tokio task that exclusively owns its tracked
//! currencies, data store and scheduler. Callers talk to it through a
//! [`WidgetHandle`] and observe it through [`WidgetSnapshot`]s.

use crate::core::config::WidgetSettings;
use crate::core::currency::TrackedCurrency;
use crate::core::error::WidgetError;
use crate::core::fetch::JsonFetcher;
use crate::core::quote::QuoteData;
use crate::core::resolver::{self, Resolution};
use crate::core::retry::{GivenUp, RetryController, RetryPolicy};
use crate::core::scheduler::UpdateScheduler;
use crate::providers::coinmarketcap::CoinMarketCapApi;
use crate::store::{CurrencyDataRecord, CurrencyDataStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Correlation id tagging everything a widget instance sends and receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn next() -> Self {
        InstanceId(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "widget-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetStatus {
    /// The listing is still being downloaded.
    Loading,
    Ready,
    /// The listing could not be downloaded; carries the diagnostic text.
    Failed(String),
}

/// What a renderer sees of a widget instance.
#[derive(Debug, Clone)]
pub struct WidgetSnapshot {
    pub instance: InstanceId,
    pub status: WidgetStatus,
    pub conversion: String,
    pub currencies: Vec<TrackedCurrency>,
    pub records: CurrencyDataStore,
    /// When the last successful bulk update landed.
    pub last_updated: Option<DateTime<Utc>>,
    /// When the last bulk update finished, successfully or not.
    pub last_attempt: Option<DateTime<Utc>>,
    /// Diagnostic of the last bulk update if it gave up.
    pub last_error: Option<String>,
}

impl WidgetSnapshot {
    fn loading(instance: InstanceId, conversion: &str) -> Self {
        Self {
            instance,
            status: WidgetStatus::Loading,
            conversion: conversion.to_string(),
            currencies: Vec::new(),
            records: CurrencyDataStore::new(),
            last_updated: None,
            last_attempt: None,
            last_error: None,
        }
    }

    /// Displayable rows in configured order. Unloaded currencies are skipped.
    pub fn rows(&self) -> impl Iterator<Item = (&TrackedCurrency, &CurrencyDataRecord)> {
        self.currencies.iter().filter_map(|currency| {
            self.records
                .get(currency.id)
                .filter(|record| record.loaded)
                .map(|record| (currency, record))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// The host hid the widget; stop the periodic timer.
    Suspend,
    /// The host showed the widget again.
    Resume,
    RefreshNow,
    Shutdown,
}

#[derive(Debug)]
enum Notification {
    QuotesReceived {
        instance: InstanceId,
        cycle: u64,
        result: Result<HashMap<u64, QuoteData>, GivenUp>,
    },
}

pub struct Widget {
    instance: InstanceId,
    settings: WidgetSettings,
    api: Arc<CoinMarketCapApi>,
}

impl Widget {
    pub fn new(settings: WidgetSettings, fetcher: Arc<dyn JsonFetcher>) -> Self {
        let api = CoinMarketCapApi::new(settings.provider.clone(), fetcher);
        Self {
            instance: InstanceId::next(),
            settings,
            api: Arc::new(api),
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Starts the instance on the current tokio runtime.
    pub fn spawn(self) -> WidgetHandle {
        let instance = self.instance;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) =
            watch::channel(WidgetSnapshot::loading(instance, &self.settings.conversion));

        let task = tokio::spawn(self.run(command_rx, snapshot_tx));

        WidgetHandle {
            instance,
            commands: command_tx,
            snapshots: snapshot_rx,
            task,
        }
    }

    async fn load_listing(&self) -> Result<Resolution, WidgetError> {
        info!(instance = %self.instance, "Request sent for currency listings");
        let mut controller = RetryController::new(
            "listing",
            RetryPolicy::listing(self.settings.max_listing_attempts),
        );
        let listing = controller
            .run(|_| self.api.fetch_listings())
            .await
            .map_err(|given_up| WidgetError::ListingExhausted {
                attempts: given_up.attempts,
                last: given_up.last,
            })?;
        info!(entries = listing.len(), "Listings retrieved successfully");

        Ok(resolver::resolve(
            &listing,
            &self.settings.currencies,
            &self.settings.display,
        ))
    }

    async fn run(
        self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        snapshots: watch::Sender<WidgetSnapshot>,
    ) {
        // Commands arriving while the listing loads are replayed afterwards.
        let mut deferred = Vec::new();
        let loaded = {
            let listing = self.load_listing();
            tokio::pin!(listing);
            loop {
                tokio::select! {
                    result = &mut listing => break result,
                    command = commands.recv() => match command {
                        None | Some(Command::Shutdown) => {
                            info!(instance = %self.instance, "Shut down before the listing loaded");
                            return;
                        }
                        Some(command) => deferred.push(command),
                    },
                }
            }
        };

        let resolution = match loaded {
            Ok(resolution) => resolution,
            Err(err) => {
                report(self.instance, &err);
                snapshots.send_modify(|snapshot| {
                    snapshot.status = WidgetStatus::Failed(err.to_string())
                });
                // Nothing can load without a listing; idle until shut down.
                while let Some(command) = commands.recv().await {
                    if command == Command::Shutdown {
                        break;
                    }
                }
                return;
            }
        };

        if resolution.dropped_count() > 0 {
            warn!(
                dropped = resolution.dropped_count(),
                "Some configured currencies could not be found in the listing"
            );
        }

        let mut event_loop = EventLoop::new(self, resolution.tracked, snapshots);
        event_loop.publish();
        event_loop.scheduler.start();
        for command in deferred {
            event_loop.handle_command(command);
        }
        event_loop.begin_cycle();
        event_loop.run(commands).await;
    }
}

struct EventLoop {
    instance: InstanceId,
    settings: WidgetSettings,
    api: Arc<CoinMarketCapApi>,
    tracked: Vec<TrackedCurrency>,
    store: CurrencyDataStore,
    scheduler: UpdateScheduler,
    last_updated: Option<DateTime<Utc>>,
    last_attempt: Option<DateTime<Utc>>,
    last_error: Option<String>,
    in_flight: Option<u64>,
    next_cycle: u64,
    inbound_tx: mpsc::UnboundedSender<Notification>,
    inbound_rx: mpsc::UnboundedReceiver<Notification>,
    snapshots: watch::Sender<WidgetSnapshot>,
    stopped: bool,
}

impl EventLoop {
    fn new(
        widget: Widget,
        tracked: Vec<TrackedCurrency>,
        snapshots: watch::Sender<WidgetSnapshot>,
    ) -> Self {
        let mut store = CurrencyDataStore::new();
        store.initialize(&tracked);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        Self {
            instance: widget.instance,
            scheduler: UpdateScheduler::new(widget.settings.update_interval),
            settings: widget.settings,
            api: widget.api,
            tracked,
            store,
            last_updated: None,
            last_attempt: None,
            last_error: None,
            in_flight: None,
            next_cycle: 1,
            inbound_tx,
            inbound_rx,
            snapshots,
            stopped: false,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while !self.stopped {
            tokio::select! {
                _ = self.scheduler.tick() => {
                    debug!(instance = %self.instance, "Update triggered");
                    self.begin_cycle();
                }
                Some(notification) = self.inbound_rx.recv() => self.handle_notification(notification),
                command = commands.recv() => self.handle_command(command.unwrap_or(Command::Shutdown)),
            }
        }
        info!(instance = %self.instance, "Widget stopped");
    }

    fn publish(&self) {
        self.snapshots.send_replace(WidgetSnapshot {
            instance: self.instance,
            status: WidgetStatus::Ready,
            conversion: self.settings.conversion.clone(),
            currencies: self.tracked.clone(),
            records: self.store.clone(),
            last_updated: self.last_updated,
            last_attempt: self.last_attempt,
            last_error: self.last_error.clone(),
        });
    }

    fn handle_command(&mut self, command: Command) {
        debug!(instance = %self.instance, ?command, "Command received");
        match command {
            Command::Suspend => self.scheduler.suspend(),
            Command::Resume => {
                if self.scheduler.resume(Instant::now()) {
                    self.begin_cycle();
                }
            }
            Command::RefreshNow => self.begin_cycle(),
            Command::Shutdown => self.stopped = true,
        }
    }

    /// Ids for one batched request, in tracked order without repeats.
    fn batch_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = Vec::with_capacity(self.tracked.len());
        for currency in &self.tracked {
            if !ids.contains(&currency.id) {
                ids.push(currency.id);
            }
        }
        ids
    }

    /// Starts one bulk update unless another one is still running.
    fn begin_cycle(&mut self) {
        if let Some(cycle) = self.in_flight {
            debug!(cycle, "Update still in flight, skipping");
            return;
        }
        let ids = self.batch_ids();
        if ids.is_empty() {
            debug!("No tracked currencies, nothing to update");
            return;
        }

        let cycle = self.next_cycle;
        self.next_cycle += 1;
        self.in_flight = Some(cycle);

        let instance = self.instance;
        let api = Arc::clone(&self.api);
        let conversion = self.settings.conversion.clone();
        let policy = RetryPolicy::detail(
            self.settings.max_detail_attempts,
            self.settings.retry_delay,
        );
        let inbound = self.inbound_tx.clone();
        info!(%instance, cycle, currencies = ids.len(), "Request sent for currency details");

        tokio::spawn(async move {
            let mut controller = RetryController::new("detail", policy);
            let result = controller
                .run(|_| api.fetch_quotes(&ids, &conversion))
                .await;
            let notification = Notification::QuotesReceived {
                instance,
                cycle,
                result,
            };
            if inbound.send(notification).is_err() {
                debug!(%instance, cycle, "Widget gone, dropping currency details");
            }
        });
    }

    fn handle_notification(&mut self, notification: Notification) {
        let Notification::QuotesReceived {
            instance,
            cycle,
            result,
        } = notification;
        if instance != self.instance {
            debug!(%instance, "Ignoring notification for another widget");
            return;
        }
        if self.in_flight == Some(cycle) {
            self.in_flight = None;
        }
        let now = Utc::now();
        self.last_attempt = Some(now);

        match result {
            Ok(quotes) => {
                let updated = self.store.merge(quotes);
                self.scheduler.mark_updated(Instant::now());
                self.last_updated = Some(now);
                self.last_error = None;
                info!(
                    instance = %self.instance,
                    cycle,
                    updated,
                    "Currency update received"
                );
                self.publish();
            }
            Err(given_up) => {
                let err = WidgetError::DetailExhausted {
                    attempts: given_up.attempts,
                    last: given_up.last,
                };
                debug!(cycle, "Currency update gave up");
                report(self.instance, &err);
                self.last_error = Some(err.to_string());
                self.publish();
            }
        }
    }
}

fn report(instance: InstanceId, err: &WidgetError) {
    if err.is_fatal() {
        error!(%instance, error = %err, "Unable to load currency data");
    } else {
        warn!(%instance, error = %err, "Keeping previous data until the next update");
    }
}

/// Control and observation side of a spawned [`Widget`].
pub struct WidgetHandle {
    instance: InstanceId,
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<WidgetSnapshot>,
    task: JoinHandle<()>,
}

impl WidgetHandle {
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!(instance = %self.instance, ?command, "Widget already stopped");
        }
    }

    pub fn suspend(&self) {
        self.send(Command::Suspend);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn refresh_now(&self) {
        self.send(Command::RefreshNow);
    }

    pub fn subscribe(&self) -> watch::Receiver<WidgetSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stops the instance and waits for its task to finish.
    pub async fn shutdown(self) {
        self.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            warn!(instance = %self.instance, error = %e, "Widget task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AppConfig, ProviderConfig};
    use crate::core::currency::{CurrencySpec, DetailedSpec};
    use crate::core::fetch::FetchOutcome;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Gets the 1-based number of the request being answered.
    type Responder = Box<dyn Fn(usize) -> FetchOutcome + Send + Sync>;

    /// Answers listing and quote requests from closures and records every URL.
    struct ScriptedFetcher {
        listing: Responder,
        quotes: Responder,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new<L, Q>(listing: L, quotes: Q) -> Arc<Self>
        where
            L: Fn(usize) -> FetchOutcome + Send + Sync + 'static,
            Q: Fn(usize) -> FetchOutcome + Send + Sync + 'static,
        {
            Arc::new(Self {
                listing: Box::new(listing),
                quotes: Box::new(quotes),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn count(&self, needle: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|url| url.contains(needle))
                .count()
        }

        fn quote_requests(&self) -> usize {
            self.count("quotes/latest")
        }

        fn listing_requests(&self) -> usize {
            self.count("cryptocurrency/map")
        }
    }

    #[async_trait]
    impl JsonFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str, _api_key: Option<&str>) -> FetchOutcome {
            let mut requests = self.requests.lock().unwrap();
            requests.push(url.to_string());
            if url.contains("quotes/latest") {
                let n = requests.iter().filter(|u| u.contains("quotes/latest")).count();
                (self.quotes)(n)
            } else {
                let n = requests.iter().filter(|u| u.contains("cryptocurrency/map")).count();
                (self.listing)(n)
            }
        }
    }

    fn ok(body: Value) -> FetchOutcome {
        FetchOutcome::Success { status: 200, body }
    }

    fn listing_body() -> Value {
        json!({
            "status": {"error_code": 0},
            "data": [
                {"id": 1, "name": "Bitcoin", "symbol": "BTC", "slug": "bitcoin"},
                {"id": 5, "name": "Five", "symbol": "FIVE", "slug": "five"},
                {"id": 1027, "name": "Ethereum", "symbol": "ETH", "slug": "ethereum"}
            ]
        })
    }

    fn quotes_body(entries: &[(u64, f64)]) -> Value {
        let data: serde_json::Map<String, Value> = entries
            .iter()
            .map(|(id, price)| {
                (
                    id.to_string(),
                    json!({"id": id, "quote": {"USD": {"price": price}}}),
                )
            })
            .collect();
        json!({"status": {"error_code": 0}, "data": data})
    }

    fn settings(currencies: Vec<CurrencySpec>) -> WidgetSettings {
        let config = AppConfig {
            currencies: Some(currencies),
            provider: ProviderConfig {
                base_url: "http://cmc.test".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        config.settings()
    }

    async fn wait_until(
        handle: &WidgetHandle,
        predicate: impl FnMut(&WidgetSnapshot) -> bool,
    ) -> WidgetSnapshot {
        let mut rx = handle.subscribe();
        let snapshot = rx.wait_for(predicate).await.unwrap().clone();
        snapshot
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_and_loads_btc() {
        let fetcher = ScriptedFetcher::new(
            |_| {
                ok(json!({"data": [{"id": 1, "name": "Bitcoin", "symbol": "BTC", "slug": "bitcoin"}]}))
            },
            |_| ok(quotes_body(&[(1, 64000.0)])),
        );
        let widget = Widget::new(
            settings(vec![CurrencySpec::Name("btc".to_string())]),
            fetcher.clone(),
        );
        let handle = widget.spawn();

        let snapshot = wait_until(&handle, |s| s.records.loaded_count() == 1).await;
        assert_eq!(snapshot.status, WidgetStatus::Ready);
        assert_eq!(snapshot.currencies.len(), 1);
        assert_eq!(snapshot.currencies[0].id, 1);
        let rows: Vec<_> = snapshot.rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].1.data.as_ref().and_then(|d| d.price("USD")),
            Some(64000.0)
        );
        assert!(snapshot.last_updated.is_some());
        assert_eq!(fetcher.listing_requests(), 1);
        assert!(fetcher.requests.lock().unwrap()[1].ends_with("?id=1&convert=USD"));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_exhausted_never_requests_details() {
        let fetcher = ScriptedFetcher::new(
            |_| FetchOutcome::failure(Some(503), "HTTP error: 503 Service Unavailable"),
            |_| ok(quotes_body(&[])),
        );
        let widget = Widget::new(settings(vec![CurrencySpec::Id(1)]), fetcher.clone());
        let handle = widget.spawn();

        let snapshot =
            wait_until(&handle, |s| matches!(s.status, WidgetStatus::Failed(_))).await;
        match snapshot.status {
            WidgetStatus::Failed(message) => {
                assert!(message.starts_with("listing download failed after 4 attempts"));
                assert!(message.contains("503"));
            }
            other => panic!("Expected a failed widget, got {other:?}"),
        }

        // Long after the failure, still no detail request.
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(fetcher.listing_requests(), 4);
        assert_eq!(fetcher.quote_requests(), 0);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_retry_recovers() {
        let fetcher = ScriptedFetcher::new(
            |n| {
                if n < 3 {
                    FetchOutcome::failure(None, "connection reset")
                } else {
                    ok(listing_body())
                }
            },
            |_| ok(quotes_body(&[(1027, 3000.0)])),
        );
        let widget = Widget::new(
            settings(vec![CurrencySpec::Name("eth".to_string())]),
            fetcher.clone(),
        );
        let handle = widget.spawn();

        wait_until(&handle, |s| s.records.is_loaded(1027)).await;
        assert_eq!(fetcher.listing_requests(), 3);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_currency_is_dropped() {
        let fetcher = ScriptedFetcher::new(
            |_| ok(listing_body()),
            |_| ok(quotes_body(&[])),
        );
        let spec = CurrencySpec::Detailed(DetailedSpec {
            id: Some(999),
            ..Default::default()
        });
        let widget = Widget::new(settings(vec![spec]), fetcher.clone());
        let handle = widget.spawn();

        let snapshot = wait_until(&handle, |s| s.status == WidgetStatus::Ready).await;
        assert!(snapshot.currencies.is_empty());
        assert_eq!(snapshot.rows().count(), 0);

        // An empty tracked set never issues a detail request.
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(fetcher.quote_requests(), 0);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_id_keeps_previous_data() {
        let fetcher = ScriptedFetcher::new(
            |_| ok(listing_body()),
            |n| {
                if n == 1 {
                    ok(quotes_body(&[(1, 100.0), (5, 10.0)]))
                } else {
                    ok(quotes_body(&[(1, 200.0)]))
                }
            },
        );
        let widget = Widget::new(
            settings(vec![CurrencySpec::Id(1), CurrencySpec::Id(5)]),
            fetcher.clone(),
        );
        let handle = widget.spawn();

        wait_until(&handle, |s| s.records.loaded_count() == 2).await;
        handle.refresh_now();
        let snapshot = wait_until(&handle, |s| {
            s.records
                .get(1)
                .and_then(|r| r.data.as_ref())
                .and_then(|d| d.price("USD"))
                == Some(200.0)
        })
        .await;

        let five = snapshot.records.get(5).unwrap();
        assert!(five.loaded);
        assert_eq!(five.data.as_ref().and_then(|d| d.price("USD")), Some(10.0));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_failure_keeps_stale_data() {
        let fetcher = ScriptedFetcher::new(
            |_| ok(listing_body()),
            |n| {
                if n == 1 {
                    ok(quotes_body(&[(1, 100.0)]))
                } else {
                    FetchOutcome::failure(Some(500), "HTTP error: 500 Internal Server Error")
                }
            },
        );
        let widget = Widget::new(settings(vec![CurrencySpec::Id(1)]), fetcher.clone());
        let handle = widget.spawn();

        wait_until(&handle, |s| s.records.is_loaded(1)).await;

        // Next scheduled cycle fails twice (max_detail_attempts) and gives up.
        tokio::time::sleep(Duration::from_secs(600 + 30)).await;
        assert_eq!(fetcher.quote_requests(), 3);

        let snapshot = handle.snapshot();
        let record = snapshot.records.get(1).unwrap();
        assert!(record.loaded);
        assert_eq!(record.data.as_ref().and_then(|d| d.price("USD")), Some(100.0));
        assert!(
            snapshot
                .last_error
                .as_deref()
                .is_some_and(|e| e.starts_with("currency detail update failed after 2 attempts"))
        );

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_giving_up_is_published() {
        let fetcher = ScriptedFetcher::new(
            |_| ok(listing_body()),
            |n| {
                if n <= 2 {
                    FetchOutcome::failure(None, "Request error: connection refused")
                } else {
                    ok(quotes_body(&[(1, 100.0)]))
                }
            },
        );
        let widget = Widget::new(settings(vec![CurrencySpec::Id(1)]), fetcher.clone());
        let handle = widget.spawn();

        let snapshot = wait_until(&handle, |s| s.last_attempt.is_some()).await;
        assert_eq!(snapshot.status, WidgetStatus::Ready);
        assert_eq!(snapshot.records.loaded_count(), 0);
        assert!(snapshot.last_updated.is_none());
        assert!(
            snapshot
                .last_error
                .as_deref()
                .is_some_and(|e| e.contains("connection refused"))
        );
        assert_eq!(fetcher.quote_requests(), 2);

        // The next scheduled cycle succeeds and clears the error.
        let snapshot = wait_until(&handle, |s| s.records.is_loaded(1)).await;
        assert!(snapshot.last_error.is_none());
        assert_eq!(snapshot.last_attempt, snapshot.last_updated);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_updates_and_suspend() {
        let fetcher = ScriptedFetcher::new(
            |_| ok(listing_body()),
            |n| ok(quotes_body(&[(1, n as f64)])),
        );
        let widget = Widget::new(settings(vec![CurrencySpec::Id(1)]), fetcher.clone());
        let handle = widget.spawn();

        wait_until(&handle, |s| s.records.is_loaded(1)).await;
        assert_eq!(fetcher.quote_requests(), 1);

        tokio::time::sleep(Duration::from_secs(600 + 1)).await;
        assert_eq!(fetcher.quote_requests(), 2);

        handle.suspend();
        tokio::time::sleep(Duration::from_secs(600 * 3)).await;
        assert_eq!(fetcher.quote_requests(), 2);

        // Stale by more than one interval: resume refreshes immediately.
        handle.resume();
        wait_until(&handle, |s| {
            s.records
                .get(1)
                .and_then(|r| r.data.as_ref())
                .and_then(|d| d.price("USD"))
                == Some(3.0)
        })
        .await;
        assert_eq!(fetcher.quote_requests(), 3);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_within_interval_does_not_refresh() {
        let fetcher = ScriptedFetcher::new(
            |_| ok(listing_body()),
            |_| ok(quotes_body(&[(1, 1.0)])),
        );
        let widget = Widget::new(settings(vec![CurrencySpec::Id(1)]), fetcher.clone());
        let handle = widget.spawn();

        wait_until(&handle, |s| s.records.is_loaded(1)).await;
        handle.suspend();
        tokio::time::sleep(Duration::from_secs(60)).await;
        handle.resume();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fetcher.quote_requests(), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_is_skipped_while_cycle_in_flight() {
        let fetcher = ScriptedFetcher::new(
            |_| ok(listing_body()),
            |_| FetchOutcome::failure(None, "timeout"),
        );
        let widget = Widget::new(settings(vec![CurrencySpec::Id(1)]), fetcher.clone());
        let handle = widget.spawn();

        wait_until(&handle, |s| s.status == WidgetStatus::Ready).await;
        // The first cycle is waiting out its retry delay.
        handle.refresh_now();
        handle.refresh_now();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fetcher.quote_requests(), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_specs_are_batched_once() {
        let fetcher = ScriptedFetcher::new(
            |_| ok(listing_body()),
            |_| ok(quotes_body(&[(1, 1.0), (1027, 2.0)])),
        );
        let widget = Widget::new(
            settings(vec![
                CurrencySpec::Id(1027),
                CurrencySpec::Name("bitcoin".to_string()),
                CurrencySpec::Name("BTC".to_string()),
            ]),
            fetcher.clone(),
        );
        let handle = widget.spawn();

        let snapshot = wait_until(&handle, |s| s.records.loaded_count() == 2).await;
        let ids: Vec<u64> = snapshot.rows().map(|(c, _)| c.id).collect();
        assert_eq!(ids, vec![1027, 1, 1]);
        assert!(fetcher.requests.lock().unwrap()[1].contains("?id=1027,1&"));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_loading() {
        let fetcher = ScriptedFetcher::new(
            |_| FetchOutcome::failure(None, "connection refused"),
            |_| ok(quotes_body(&[])),
        );
        let widget = Widget::new(settings(vec![CurrencySpec::Id(1)]), fetcher.clone());
        let handle = widget.spawn();
        assert_eq!(handle.snapshot().status, WidgetStatus::Loading);

        handle.shutdown().await;
        assert!(fetcher.listing_requests() <= 1);
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let a = InstanceId::next();
        let b = InstanceId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("widget-"));
    }
}
