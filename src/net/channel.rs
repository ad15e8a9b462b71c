//! Network Channel: a UDP socket wrapper with
//! `{ip, port, broadcast-enabled, reuse-address}`, bound exactly once, with
//! an `open?` flag that transitions true -> false exactly once.
//!
//! Grounded on `clasp-transport::udp::UdpTransport`, with `socket2` added
//! for `SO_REUSEADDR` the way `clasp-transport`'s TCP feature pulls in
//! `socket2` for keepalive tuning.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use socket2::{Domain, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// A bound Art-Net UDP endpoint, shared read/write between the receiver and
/// sender tasks.
pub struct NetworkChannel {
    socket: Arc<UdpSocket>,
    ip: [u8; 4],
    port: u16,
    broadcast_enabled: AtomicBool,
    reuse_address: bool,
    open: AtomicBool,
}

impl NetworkChannel {
    /// Bind to `(ip, port)`, optionally enabling `SO_REUSEADDR` and
    /// broadcast.
    pub async fn bind(ip: [u8; 4], port: u16, reuse_address: bool, broadcast: bool) -> Result<Self> {
        let addr = SocketAddr::from((ip, port));

        let socket2_sock = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
        if reuse_address {
            socket2_sock.set_reuse_address(true)?;
        }
        socket2_sock.set_broadcast(broadcast)?;
        socket2_sock.set_nonblocking(true)?;
        socket2_sock.bind(&addr.into())?;

        let std_socket: std::net::UdpSocket = socket2_sock.into();
        let socket = UdpSocket::from_std(std_socket)?;

        let bound = socket.local_addr()?;
        info!(%bound, reuse_address, broadcast, "Art-Net channel bound");

        Ok(Self {
            socket: Arc::new(socket),
            ip,
            port,
            broadcast_enabled: AtomicBool::new(broadcast),
            reuse_address,
            open: AtomicBool::new(true),
        })
    }

    pub fn ip(&self) -> [u8; 4] {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn reuse_address(&self) -> bool {
        self.reuse_address
    }

    pub fn broadcast_enabled(&self) -> bool {
        self.broadcast_enabled.load(Ordering::Acquire)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn set_broadcast(&self, enable: bool) -> Result<()> {
        self.socket.set_broadcast(enable)?;
        self.broadcast_enabled.store(enable, Ordering::Release);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// `open?` transitions true -> false exactly once; repeat calls are a
    /// no-op, matching this crate's `close-quietly` idempotence elsewhere.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!("Art-Net channel closed");
        }
    }

    pub async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<usize> {
        if !self.is_open() {
            return Err(Error::ChannelClosed);
        }
        Ok(self.socket.send_to(data, target).await?)
    }

    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        if !self.is_open() {
            return Err(Error::ChannelClosed);
        }
        Ok(self.socket.recv_from(buf).await?)
    }
}
