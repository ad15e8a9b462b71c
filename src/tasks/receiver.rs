//! Receiver Task: loops on channel receive, decodes into packets, and
//! emits `rx-packet` events.
//!
//! Grounded on `clasp-transport::udp::UdpTransport::recv_loop`'s
//! loop-until-closed shape; the `decode` seam is a dependency-injected
//! function field rather than runtime patching.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

use crate::buffer_pool::BufferPool;
use crate::codec::{self, Packet};
use crate::error::{Error, Result};
use crate::logic::Event;
use crate::net::channel::NetworkChannel;

type DecodeFn = dyn Fn(&[u8]) -> Result<Packet> + Send + Sync;

/// Loops: borrow an rx-buffer, block on channel recv, emit `rx-packet`,
/// release the buffer. On a decode error, emits a diagnostic and keeps
/// going; on `ChannelClosed`, exits. Also exits on a shutdown notification,
/// since a blocking UDP recv has no other way to observe cancellation.
///
/// §5 "Backpressure": the event stream is bounded by `recv-buffer`.
/// Overflow is handled with `try_send` rather than an awaited `send` so the
/// receiver never blocks behind a saturated logic task; the dropped packet
/// is counted in `dropped_rx_packets` instead of queued, a documented
/// simplification of "drops the oldest" (evicting an already-queued item
/// would need a queue the producer can inspect, not a plain `mpsc` channel).
pub struct ReceiverTask {
    channel: Arc<NetworkChannel>,
    rx_pool: Arc<BufferPool>,
    events: mpsc::Sender<Event>,
    shutdown: Arc<Notify>,
    decode: Arc<DecodeFn>,
    dropped_rx_packets: Arc<AtomicU64>,
}

impl ReceiverTask {
    pub fn new(
        channel: Arc<NetworkChannel>,
        rx_pool: Arc<BufferPool>,
        events: mpsc::Sender<Event>,
        shutdown: Arc<Notify>,
        dropped_rx_packets: Arc<AtomicU64>,
    ) -> Self {
        Self {
            channel,
            rx_pool,
            events,
            shutdown,
            decode: Arc::new(codec::decode),
            dropped_rx_packets,
        }
    }

    /// Substitute the decode function, e.g. for tests observing dispatch
    /// without a real wire payload.
    pub fn with_decode_fn(mut self, decode: Arc<DecodeFn>) -> Self {
        self.decode = decode;
        self
    }

    pub async fn run(self) {
        loop {
            let mut buffer = tokio::select! {
                _ = self.shutdown.notified() => {
                    debug!("receiver stopping: shutdown requested");
                    return;
                }
                result = self.rx_pool.checkout() => match result {
                    Ok(buffer) => buffer,
                    Err(_) => {
                        debug!("receiver stopping: rx pool closed");
                        return;
                    }
                },
            };

            tokio::select! {
                _ = self.shutdown.notified() => {
                    debug!("receiver stopping: shutdown requested");
                    return;
                }
                result = self.channel.recv_from(buffer.as_mut_slice()) => match result {
                    Ok((len, sender)) => {
                        self.handle_datagram(&buffer.as_slice()[..len], sender).await;
                    }
                    Err(Error::ChannelClosed) => {
                        debug!("receiver stopping: channel closed");
                        return;
                    }
                    Err(err) => {
                        warn!(%err, "receive error, continuing");
                        let _ = self.events.send(Event::Diagnostic(err.to_string())).await;
                    }
                },
            }
        }
    }

    async fn handle_datagram(&self, bytes: &[u8], sender: SocketAddr) {
        match (self.decode)(bytes) {
            Ok(packet) => {
                let timestamp = now_millis();
                let event = Event::RxPacket {
                    packet,
                    sender,
                    timestamp,
                };
                match self.events.try_send(event) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        self.dropped_rx_packets.fetch_add(1, Ordering::Relaxed);
                        warn!("event stream full, dropping rx-packet");
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("receiver stopping: event channel closed");
                    }
                }
            }
            Err(err) => {
                warn!(%err, "dropping malformed packet");
            }
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
