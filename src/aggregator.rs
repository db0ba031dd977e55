// Aggregation loop. Sole owner of the current window: events and flush ticks are handled
// by one task, so the window needs no locking. Each flush hands its snapshot to a spawned
// write task and moves on; a failed write is logged and the snapshot is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::instrument;

use crate::models::{Event, Snapshot, Window};
use crate::store::Store;

/// Counters shared by the listener, the aggregator and its write tasks.
#[derive(Debug, Default)]
pub struct CollectorStats {
    pub events_received: AtomicU64,
    pub events_malformed: AtomicU64,
    pub snapshots_written: AtomicU64,
    pub snapshots_failed: AtomicU64,
}

pub struct AggregatorDeps {
    pub store: Arc<dyn Store>,
    pub events_rx: mpsc::Receiver<Event>,
    pub stats: Arc<CollectorStats>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

pub struct AggregatorConfig {
    /// Window length. Ticks are spaced from the previous tick, so drift is not corrected.
    pub flush_interval_ms: u64,
    /// How often to log collector stats (real seconds).
    pub stats_log_interval_secs: u64,
}

/// Spawns the aggregation loop. It runs until shutdown is signalled or every event
/// sender is dropped, then flushes the open window and waits for that last write.
pub fn spawn(deps: AggregatorDeps, config: AggregatorConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(deps, config))
}

#[instrument(skip_all, fields(flush_interval_ms = config.flush_interval_ms))]
async fn run(deps: AggregatorDeps, config: AggregatorConfig) {
    let AggregatorDeps {
        store,
        mut events_rx,
        stats,
        mut shutdown_rx,
    } = deps;

    let flush_period = Duration::from_millis(config.flush_interval_ms);
    let stats_log_interval = Duration::from_secs(config.stats_log_interval_secs);

    let mut flush_tick = interval_at(Instant::now() + flush_period, flush_period);
    flush_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stats_log_tick = interval_at(Instant::now() + stats_log_interval, stats_log_interval);
    stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut window = Window::new();

    loop {
        tokio::select! {
            event = events_rx.recv() => {
                match event {
                    Some(event) => {
                        window.ingest(&event);
                        stats.events_received.fetch_add(1, Ordering::Relaxed);
                    }
                    None => {
                        tracing::debug!("Event channel closed");
                        break;
                    }
                }
            }
            _ = flush_tick.tick() => {
                let snapshot = take_snapshot(&mut window);
                let store = store.clone();
                let stats = stats.clone();
                tokio::spawn(async move {
                    write_snapshot(store.as_ref(), snapshot, &stats).await;
                });
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("Aggregator shutting down");
                break;
            }
            _ = stats_log_tick.tick() => {
                tracing::info!(
                    events_received = stats.events_received.load(Ordering::Relaxed),
                    events_malformed = stats.events_malformed.load(Ordering::Relaxed),
                    snapshots_written = stats.snapshots_written.load(Ordering::Relaxed),
                    snapshots_failed = stats.snapshots_failed.load(Ordering::Relaxed),
                    "collector stats"
                );
            }
        }
    }

    // Events already queued belong to the last window.
    while let Ok(event) = events_rx.try_recv() {
        window.ingest(&event);
        stats.events_received.fetch_add(1, Ordering::Relaxed);
    }
    let snapshot = take_snapshot(&mut window);
    write_snapshot(store.as_ref(), snapshot, &stats).await;
}

/// Swap in a fresh window and stamp the closed one with the current time.
pub fn take_snapshot(window: &mut Window) -> Snapshot {
    let snapshot = std::mem::take(window).into_snapshot(Utc::now());
    tracing::info!(
        counts = snapshot.counts.len(),
        timings = snapshot.timings.len(),
        "Window flushed"
    );
    for (name, count) in &snapshot.counts {
        tracing::debug!(metric = %name, value = count.value, "count");
    }
    for (name, timing) in &snapshot.timings {
        tracing::debug!(
            metric = %name,
            avg = timing.avg().unwrap_or_default(),
            min = timing.min,
            max = timing.max,
            count = timing.count,
            "timing"
        );
    }
    snapshot
}

async fn write_snapshot(store: &dyn Store, snapshot: Snapshot, stats: &CollectorStats) {
    match store.write(&snapshot).await {
        Ok(()) => {
            stats.snapshots_written.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                operation = "write_snapshot",
                timestamp = %snapshot.timestamp,
                "Snapshot saved"
            );
        }
        Err(e) => {
            stats.snapshots_failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                error = %e,
                operation = "write_snapshot",
                timestamp = %snapshot.timestamp,
                "Snapshot write failed; window dropped"
            );
        }
    }
}
