//! Sender Task: consumes the action stream, applies delays, and writes
//! datagrams.
//!
//! Grounded on `clasp-transport::udp::UdpTransport::send`'s borrow-encode-
//! transmit-release sequence, extended with delay and callback handling.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::buffer_pool::BufferPool;
use crate::codec::{self, Packet};
use crate::config::{Callbacks, TargetConfig};
use crate::error::{Error, Result};
use crate::logic::{Action, ActionTarget, CallbackPayload};
use crate::net::channel::NetworkChannel;
use crate::net::host::{parse_host, HostValue};

const LIMITED_BROADCAST: [u8; 4] = [255, 255, 255, 255];

type EncodeFn = dyn Fn(&Packet) -> Vec<u8> + Send + Sync;

/// Resolves a send target: an explicit action target beats the
/// configured default target; neither present is `MissingTarget`.
/// `255.255.255.255` is gated on `allow_limited_broadcast`.
pub fn resolve_target(
    explicit: Option<&ActionTarget>,
    default_target: Option<&TargetConfig>,
    allow_limited_broadcast: bool,
) -> Result<SocketAddr> {
    let (host, port) = match explicit {
        Some(target) => (target.host.clone(), Some(target.port)),
        None => match default_target {
            Some(target) => (target.host.clone(), target.port),
            None => return Err(Error::MissingTarget),
        },
    };

    let ip = parse_host(Some(&host))?.ok_or(Error::MissingTargetHost)?;
    if ip == LIMITED_BROADCAST && !allow_limited_broadcast {
        return Err(Error::LimitedBroadcastDisabled);
    }

    let port = port.unwrap_or(crate::net::bind::ARTNET_PORT);
    Ok(SocketAddr::from((Ipv4Addr::from(ip), port)))
}

/// Consumes the action stream produced by the logic step.
pub struct SenderTask {
    channel: Arc<NetworkChannel>,
    tx_pool: Arc<BufferPool>,
    actions: mpsc::Receiver<Action>,
    default_target: Option<TargetConfig>,
    allow_limited_broadcast: bool,
    callbacks: Callbacks,
    encode: Arc<EncodeFn>,
}

impl SenderTask {
    pub fn new(
        channel: Arc<NetworkChannel>,
        tx_pool: Arc<BufferPool>,
        actions: mpsc::Receiver<Action>,
        default_target: Option<TargetConfig>,
        allow_limited_broadcast: bool,
        callbacks: Callbacks,
    ) -> Self {
        Self {
            channel,
            tx_pool,
            actions,
            default_target,
            allow_limited_broadcast,
            callbacks,
            encode: Arc::new(codec::encode),
        }
    }

    pub fn with_encode_fn(mut self, encode: Arc<EncodeFn>) -> Self {
        self.encode = encode;
        self
    }

    pub async fn run(mut self) {
        while let Some(action) = self.actions.recv().await {
            self.apply(action).await;
        }
    }

    async fn apply(&self, action: Action) {
        match action {
            Action::Send {
                packet,
                target,
                delay_ms,
            } => {
                if let Some(ms) = delay_ms {
                    if ms > 0 {
                        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                    }
                }
                if let Err(err) = self.send(packet, target.as_ref()).await {
                    warn!(%err, "send failed");
                    if let Some(diagnostics) = &self.callbacks.diagnostics {
                        diagnostics(err.to_string());
                    }
                }
            }
            Action::Callback(payload) => self.invoke_callback(payload),
            Action::Reply { reply, value } => {
                let _ = reply.send(value);
            }
        }
    }

    async fn send(&self, packet: Packet, target: Option<&ActionTarget>) -> Result<()> {
        let addr = resolve_target(target, self.default_target.as_ref(), self.allow_limited_broadcast)?;
        let mut buffer = self.tx_pool.checkout().await?;
        let encoded = (self.encode)(&packet);
        let len = encoded.len().min(buffer.len());
        buffer.as_mut_slice()[..len].copy_from_slice(&encoded[..len]);
        self.channel.send_to(&buffer.as_slice()[..len], addr).await?;
        Ok(())
    }

    fn invoke_callback(&self, payload: CallbackPayload) {
        // Callbacks run inline on the sender task and must not block it;
        // the caller is responsible for keeping its callback cheap.
        match payload {
            CallbackPayload::DmxFrame(frame) => {
                if let Some(cb) = &self.callbacks.dmx_frame {
                    cb(frame);
                }
            }
            CallbackPayload::Programming(event) => {
                if let Some(cb) = &self.callbacks.programming {
                    cb(event);
                }
            }
            CallbackPayload::Rdm(event) => {
                if let Some(cb) = &self.callbacks.rdm {
                    cb(event);
                }
            }
            CallbackPayload::Diagnostic(message) => {
                if let Some(cb) = &self.callbacks.diagnostics {
                    cb(message);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferConfig;

    #[test]
    fn resolve_target_prefers_explicit_over_default() {
        let explicit = ActionTarget {
            host: HostValue::from([10, 0, 0, 5]),
            port: 6454,
        };
        let default_target = TargetConfig {
            host: HostValue::from([192, 168, 1, 1]),
            port: Some(6454),
        };
        let addr = resolve_target(Some(&explicit), Some(&default_target), false).unwrap();
        assert_eq!(addr.ip().to_string(), "10.0.0.5");
    }

    #[test]
    fn resolve_target_requires_some_destination() {
        assert!(matches!(
            resolve_target(None, None, false),
            Err(Error::MissingTarget)
        ));
    }

    #[test]
    fn resolve_target_gates_limited_broadcast() {
        let target = ActionTarget {
            host: HostValue::from("255.255.255.255"),
            port: 6454,
        };
        assert!(matches!(
            resolve_target(Some(&target), None, false),
            Err(Error::LimitedBroadcastDisabled)
        ));
        let addr = resolve_target(Some(&target), None, true).unwrap();
        assert_eq!(addr.ip().to_string(), "255.255.255.255");
    }

    #[tokio::test]
    async fn send_delay_is_observed() {
        let server = NetworkChannel::bind([127, 0, 0, 1], 0, true, false)
            .await
            .unwrap();
        let server_addr = server.local_addr().unwrap();
        let client = Arc::new(
            NetworkChannel::bind([127, 0, 0, 1], 0, true, false)
                .await
                .unwrap(),
        );
        let pool = Arc::new(BufferPool::new(BufferConfig {
            count: 2,
            size: 64,
            direct: false,
        }));
        let (tx, rx) = mpsc::channel(4);
        let target = TargetConfig {
            host: HostValue::from([127, 0, 0, 1]),
            port: Some(server_addr.port()),
        };
        let task = SenderTask::new(client, pool, rx, Some(target), false, Callbacks::default());
        let handle = tokio::spawn(task.run());

        let started = tokio::time::Instant::now();
        tx.send(Action::Send {
            packet: Packet::Poll(crate::codec::ArtPoll::default()),
            target: None,
            delay_ms: Some(30),
        })
        .await
        .unwrap();

        let mut buf = [0u8; 32];
        server.recv_from(&mut buf).await.unwrap();
        assert!(started.elapsed().as_millis() >= 20);

        drop(tx);
        handle.await.unwrap();
    }
}
