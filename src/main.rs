use anyhow::Result;
use chilada::*;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let sqlite = store::SqliteStore::connect(
        &app_config.database.path,
        app_config.database.max_pool_size,
    )
    .await?;
    let store: Arc<dyn store::Store> = Arc::new(sqlite);
    store.open().await?;

    let udp_addr = format!("{}:{}", app_config.ingest.host, app_config.ingest.port);
    let socket = UdpSocket::bind(&udp_addr).await?;

    let stats = Arc::new(aggregator::CollectorStats::default());
    let (events_tx, events_rx) = mpsc::channel(app_config.ingest.queue_capacity);
    let (listener_shutdown_tx, listener_shutdown_rx) = oneshot::channel();
    let (aggregator_shutdown_tx, aggregator_shutdown_rx) = oneshot::channel();

    let listener_handle = ingest::spawn(ingest::ListenerDeps {
        socket,
        events_tx,
        stats: stats.clone(),
        shutdown_rx: listener_shutdown_rx,
    });

    let aggregator_handle = aggregator::spawn(
        aggregator::AggregatorDeps {
            store: store.clone(),
            events_rx,
            stats,
            shutdown_rx: aggregator_shutdown_rx,
        },
        aggregator::AggregatorConfig {
            flush_interval_ms: app_config.aggregation.flush_interval_ms,
            stats_log_interval_secs: app_config.aggregation.stats_log_interval_secs,
        },
    );

    let app = routes::app(store, app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
        }
    }

    let _ = listener_shutdown_tx.send(());
    let _ = listener_handle.await;
    let _ = aggregator_shutdown_tx.send(());
    let _ = aggregator_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
