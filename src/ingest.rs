// UDP listener: one JSON event per datagram, decoded and queued for the aggregator.
// Malformed datagrams are counted and dropped; receive errors never stop the loop.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};

use crate::aggregator::CollectorStats;
use crate::models::Event;

/// Receive buffer size; longer datagrams are truncated and fail to decode.
pub const MAX_DATAGRAM_BYTES: usize = 4096;

pub struct ListenerDeps {
    pub socket: UdpSocket,
    pub events_tx: mpsc::Sender<Event>,
    pub stats: Arc<CollectorStats>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

pub fn spawn(deps: ListenerDeps) -> tokio::task::JoinHandle<()> {
    let ListenerDeps {
        socket,
        events_tx,
        stats,
        mut shutdown_rx,
    } = deps;

    tokio::spawn(async move {
        if let Ok(addr) = socket.local_addr() {
            tracing::info!("Listening for events on udp://{}", addr);
        }
        let mut buf = vec![0u8; MAX_DATAGRAM_BYTES];
        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => {
                    let (n, peer) = match result {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "recv_from", "UDP receive failed");
                            continue;
                        }
                    };
                    match Event::decode(&buf[..n]) {
                        Ok(event) => {
                            if events_tx.send(event).await.is_err() {
                                tracing::debug!("Event channel closed");
                                break;
                            }
                        }
                        Err(e) => {
                            stats.events_malformed.fetch_add(1, Ordering::Relaxed);
                            tracing::debug!(error = %e, peer = %peer, "Dropping malformed datagram");
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Listener shutting down");
                    break;
                }
            }
        }
    })
}
