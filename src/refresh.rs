//! Refresh loop: fetch -> compute -> aggregate -> persist, then sleep
//!
//! One background task runs the loop. The controlling side only holds a
//! `watch` sender used as the stop signal; the worker checks it at the top of
//! every iteration and while sleeping, and never interrupts a request that is
//! already in flight.

use crate::aggregator::{build_overview, build_record, AggregateError};
use crate::config::{FetcherConfig, TrackedSymbol};
use crate::market::{fetch_symbol, MarketDataProvider};
use crate::snapshot::{Snapshot, SnapshotError, SnapshotMetadata, SnapshotSink};
use chrono::Local;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Settings for the refresh loop
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub symbols: Vec<TrackedSymbol>,
    pub lead_symbol: String,
    pub interval: Duration,
    pub sparkline_points: usize,
    /// Stop after this many cycles; `None` runs until stopped
    pub max_cycles: Option<u64>,
}

impl RefreshSettings {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            symbols: config.symbols.clone(),
            lead_symbol: config.lead_symbol.clone(),
            interval: config.update_interval(),
            sparkline_points: config.sparkline_points,
            max_cycles: None,
        }
    }
}

#[derive(Debug)]
pub enum CycleError {
    Aggregate(AggregateError),
    Snapshot(SnapshotError),
}

impl From<AggregateError> for CycleError {
    fn from(err: AggregateError) -> Self {
        CycleError::Aggregate(err)
    }
}

impl From<SnapshotError> for CycleError {
    fn from(err: SnapshotError) -> Self {
        CycleError::Snapshot(err)
    }
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleError::Aggregate(e) => write!(f, "cycle skipped: {}", e),
            CycleError::Snapshot(e) => write!(f, "snapshot write failed: {}", e),
        }
    }
}

impl std::error::Error for CycleError {}

/// Run one refresh cycle and persist its snapshot.
///
/// Symbols are fetched one after another. Symbols the provider failed on are
/// left out of the snapshot. When nothing could be fetched the cycle fails
/// with [`AggregateError::NoSymbols`] and the previous snapshot is kept.
pub async fn run_cycle(
    provider: &dyn MarketDataProvider,
    sink: &dyn SnapshotSink,
    settings: &RefreshSettings,
) -> Result<Snapshot, CycleError> {
    log::info!("🔄 Fetching at {}", Local::now().format("%H:%M:%S"));

    let mut scored = Vec::with_capacity(settings.symbols.len());
    for symbol in &settings.symbols {
        let fetch = fetch_symbol(provider, symbol).await;
        if let Some(entry) = build_record(&fetch, settings.sparkline_points, Local::now()) {
            let record = &entry.record;
            let marker = if record.change_24h > 0.0 { "🟢" } else { "🔴" };
            log::info!(
                "{} {}: ${:.2} ({:+.2}%)",
                marker,
                record.name,
                record.price,
                record.change_24h
            );
            scored.push(entry);
        }
    }

    let now = Local::now();
    let market_overview = build_overview(&scored, &settings.lead_symbol, now)?;

    let snapshot = Snapshot {
        cryptocurrencies: scored.into_iter().map(|s| s.record).collect(),
        market_overview,
        metadata: SnapshotMetadata {
            update_interval: settings.interval.as_secs(),
            last_fetch: now.to_rfc3339(),
        },
    };

    sink.write_snapshot(&snapshot).await?;
    log::info!(
        "✅ Saved {} of {} symbols ({} backend)",
        snapshot.cryptocurrencies.len(),
        settings.symbols.len(),
        sink.backend_type()
    );

    Ok(snapshot)
}

/// Lifecycle state of a [`RefreshLoop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// Owns the background refresh task
pub struct RefreshLoop {
    provider: Arc<dyn MarketDataProvider>,
    sink: Arc<dyn SnapshotSink>,
    settings: RefreshSettings,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<u64>>,
}

impl RefreshLoop {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        sink: Arc<dyn SnapshotSink>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            provider,
            sink,
            settings,
            stop_tx: None,
            handle: None,
        }
    }

    pub fn state(&self) -> LoopState {
        match &self.handle {
            Some(handle) if !handle.is_finished() => LoopState::Running,
            _ => LoopState::Stopped,
        }
    }

    /// Spawn the worker. Returns `false` if it is already running.
    pub fn start(&mut self) -> bool {
        if self.state() == LoopState::Running {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let provider = self.provider.clone();
        let sink = self.sink.clone();
        let settings = self.settings.clone();

        log::info!(
            "🚀 Started (updating every {}s from {})",
            settings.interval.as_secs(),
            provider.provider_name()
        );

        self.handle = Some(tokio::spawn(async move {
            refresh_task(provider, sink, settings, stop_rx).await
        }));
        self.stop_tx = Some(stop_tx);
        true
    }

    /// Signal the worker and wait for it to finish. Returns the completed cycle count.
    pub async fn stop(&mut self) -> u64 {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        let cycles = self.join().await;
        log::info!("🛑 Stopped after {} cycles", cycles);
        cycles
    }

    /// Wait for the worker to end on its own (only happens with `max_cycles`).
    pub async fn wait(&mut self) -> u64 {
        let cycles = self.join().await;
        self.stop_tx = None;
        cycles
    }

    async fn join(&mut self) -> u64 {
        match self.handle.take() {
            Some(handle) => match handle.await {
                Ok(cycles) => cycles,
                Err(e) => {
                    log::error!("❌ Refresh task ended abnormally: {}", e);
                    0
                }
            },
            None => 0,
        }
    }
}

/// Worker body. Returns the number of cycles attempted.
async fn refresh_task(
    provider: Arc<dyn MarketDataProvider>,
    sink: Arc<dyn SnapshotSink>,
    settings: RefreshSettings,
    mut stop_rx: watch::Receiver<bool>,
) -> u64 {
    let mut cycles = 0u64;

    loop {
        if *stop_rx.borrow() {
            break;
        }

        if let Err(e) = run_cycle(provider.as_ref(), sink.as_ref(), &settings).await {
            log::error!("❌ Error: {}", e);
        }
        cycles += 1;

        if settings.max_cycles.is_some_and(|max| cycles >= max) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(settings.interval) => {}
            changed = stop_rx.changed() => {
                // Sender dropped counts as a stop request
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    cycles
}
