//! Lifecycle: builds the buffer pools, network channel, and the four
//! pipeline tasks; tears them down in order on shutdown.
//!
//! Grounded on `clasp-bridge::ArtNetBridge`'s `start()`/`stop()` pair
//! (`Bridge` trait impl), generalized from one bridge task to the full
//! receiver/logic/sender/command-bus pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::info;

use crate::buffer_pool::BufferPool;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logic::{self, Action, Event, LogicState};
use crate::net::bind::{self, BindResolution};
use crate::net::channel::NetworkChannel;
use crate::tasks::command_bus::CommandBusTask;
use crate::tasks::receiver::ReceiverTask;
use crate::tasks::sender::SenderTask;

/// A running node: the bound channel, pools, and the join handles for its
/// four pipeline tasks.
pub struct Node {
    bind: BindResolution,
    channel: Arc<NetworkChannel>,
    rx_pool: Arc<BufferPool>,
    tx_pool: Arc<BufferPool>,
    command_tx: Option<mpsc::Sender<Event>>,
    shutdown: Arc<Notify>,
    handles: Vec<JoinHandle<()>>,
    dropped_rx_packets: Arc<AtomicU64>,
}

impl Node {
    /// Resolves the bind address, opens the channel and pools, and spawns
    /// the receiver, logic, sender, and command-bus tasks.
    pub async fn start(config: Config) -> Result<Self> {
        let bind = bind::resolve(&config)?;
        let channel = Arc::new(NetworkChannel::bind(bind.ip, bind.port, true, true).await?);
        let rx_pool = Arc::new(BufferPool::new(config.rx_buffer));
        let tx_pool = Arc::new(BufferPool::new(config.tx_buffer));

        let (event_tx, event_rx) = mpsc::channel(config.recv_buffer);
        let (action_tx, action_rx) = mpsc::channel(config.actions_buffer);
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let shutdown = Arc::new(Notify::new());
        let dropped_rx_packets = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(4);

        handles.push(tokio::spawn(
            CommandBusTask::new(command_rx, event_tx.clone()).run(),
        ));

        handles.push(tokio::spawn(
            ReceiverTask::new(
                channel.clone(),
                rx_pool.clone(),
                event_tx.clone(),
                shutdown.clone(),
                dropped_rx_packets.clone(),
            )
            .run(),
        ));

        handles.push(tokio::spawn(run_logic_task(config.clone(), event_rx, action_tx)));

        handles.push(tokio::spawn(
            SenderTask::new(
                channel.clone(),
                tx_pool.clone(),
                action_rx,
                config.default_target.clone(),
                config.allow_limited_broadcast,
                config.callbacks.clone(),
            )
            .run(),
        ));

        info!(ip = ?bind.ip, port = bind.port, ip_source = ?bind.ip_source, "Art-Net node started");

        Ok(Self {
            bind,
            channel,
            rx_pool,
            tx_pool,
            command_tx: Some(command_tx),
            shutdown,
            handles,
            dropped_rx_packets,
        })
    }

    pub fn bind_resolution(&self) -> BindResolution {
        self.bind
    }

    /// Count of `rx-packet` events dropped because the event stream was
    /// full (§5 "Backpressure").
    pub fn dropped_rx_packets(&self) -> u64 {
        self.dropped_rx_packets.load(Ordering::Relaxed)
    }

    /// A sender for injecting external commands (apply-state, snapshot,
    /// shutdown) into the event stream. Fails with `NodeMissingFlowContext`
    /// once the node has been (or is being) shut down — there is no running
    /// flow context left to accept a command, let alone reply to a
    /// snapshot.
    pub fn command_sender(&self) -> Result<mpsc::Sender<Event>> {
        self.command_tx.clone().ok_or(Error::NodeMissingFlowContext)
    }

    /// Orderly teardown: request shutdown, let every task observe
    /// channel-closed and drain, then close the pools and channel.
    /// `close-quietly` idempotence means a second call is harmless.
    pub async fn shutdown(mut self) {
        if let Some(command_tx) = self.command_tx.take() {
            let _ = command_tx
                .send(crate::tasks::command_bus::shutdown_command())
                .await;
            // Dropping this Node's own sender lets the command-bus task's
            // receiver observe channel-closed once the queued shutdown
            // command drains.
        }
        // The receiver task may be blocked on a UDP recv with no closing
        // signal of its own; wake it directly.
        self.shutdown.notify_one();

        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }

        self.rx_pool.close();
        self.tx_pool.close();
        self.channel.close();

        info!("Art-Net node stopped");
    }
}

/// The logic task: the single writer of node state. Consumes events,
/// calls the pure `step` function, and forwards produced actions. Exits
/// once `step` reports `running = false` or the event channel closes.
async fn run_logic_task(config: Config, mut events: mpsc::Receiver<Event>, actions: mpsc::Sender<Action>) {
    let mut state: Option<LogicState> = None;

    while let Some(event) = events.recv().await {
        let (next_state, produced) = logic::step(state, &config, event);
        let running = next_state.running;
        state = Some(next_state);

        for action in produced {
            if actions.send(action).await.is_err() {
                return;
            }
        }

        if !running {
            return;
        }
    }
}
