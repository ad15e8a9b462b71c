//! Logic Step: the pure function `step(state, config, event) -> (state',
//! actions)`. The single writer of node state; never does I/O.
//!
//! Grounded on `clasp-core::state::StateStore::update`'s
//! state-in/state-out shape, generalized from a single patch-merge into a
//! full event dispatch table.

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::codec::{ArtPollReply, Packet};
use crate::config::Config;
use crate::net::host::HostValue;
use crate::node::NodeState;
use crate::programming::{apply_artaddress, apply_artinput, apply_artipprog};
use crate::rdm::{self, RdmEvent};

/// Destination carried on a `send` action before the sender resolves it to
/// a concrete socket address (see `tasks::sender::resolve_target`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTarget {
    pub host: HostValue,
    pub port: u16,
}

impl From<SocketAddr> for ActionTarget {
    fn from(addr: SocketAddr) -> Self {
        let octets = match addr {
            SocketAddr::V4(v4) => v4.ip().octets(),
            SocketAddr::V6(_) => [0, 0, 0, 0],
        };
        Self {
            host: HostValue::from(octets),
            port: addr.port(),
        }
    }
}

/// A decoded ArtDmx frame handed to the `dmx-frame` callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmxFrame {
    pub port_address: u16,
    pub data: Vec<u8>,
    pub length: u16,
    pub sequence: u8,
    pub physical: u8,
    pub net: u8,
    pub sub_uni: u8,
}

/// Summary of a programming transition, handed to the `programming`
/// callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgrammingEvent {
    Address { changes: Vec<&'static str> },
    Input { applied_bind_index: u8, applied_to_base: bool },
    IpProg { dhcp: bool },
}

/// A typed state patch rather than an untyped map, so field-level
/// changes are checked at compile time instead of by key lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    pub short_name: Option<String>,
    pub long_name: Option<String>,
}

/// What a `snapshot` command projects out of state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotValue {
    Identity { short_name: String, long_name: String },
    Network(crate::node::Network),
    Full(Box<NodeState>),
}

/// A command arriving over the command bus.
#[derive(Debug)]
pub enum CommandKind {
    ApplyState(StatePatch),
    Snapshot {
        path: SnapshotPath,
        reply: oneshot::Sender<SnapshotValue>,
    },
    Shutdown,
}

/// Which slice of state a `snapshot` command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPath {
    Identity,
    Network,
    Full,
}

/// Logic-step input.
#[derive(Debug)]
pub enum Event {
    RxPacket {
        packet: Packet,
        sender: SocketAddr,
        timestamp: u64,
    },
    Command(CommandKind),
    /// A receiver/sender I/O error that did not close the channel: routed
    /// to the diagnostics callback while the offending task keeps running.
    Diagnostic(String),
    Tick {
        now: u64,
    },
}

/// Logic-step output.
#[derive(Debug)]
pub enum Action {
    Send {
        packet: Packet,
        target: Option<ActionTarget>,
        delay_ms: Option<u64>,
    },
    Callback(CallbackPayload),
    Reply {
        reply: oneshot::Sender<SnapshotValue>,
        value: SnapshotValue,
    },
}

/// Payload carried by a `callback` action.
#[derive(Debug)]
pub enum CallbackPayload {
    DmxFrame(DmxFrame),
    Programming(ProgrammingEvent),
    Rdm(RdmEvent),
    Diagnostic(String),
}

/// The logic's private state, distinct from `NodeState`, which is the
/// published identity a `snapshot` projects from.
#[derive(Debug)]
pub struct LogicState {
    pub node: NodeState,
    pub running: bool,
}

impl LogicState {
    fn init(config: &Config) -> Self {
        Self {
            node: NodeState::from_config(config),
            running: true,
        }
    }
}

/// `step(state, config, event) -> (state', actions)`. On first invocation
/// `state` is `None` and is initialized deterministically from `config`.
pub fn step(state: Option<LogicState>, config: &Config, event: Event) -> (LogicState, Vec<Action>) {
    let mut state = state.unwrap_or_else(|| LogicState::init(config));
    let mut actions = Vec::new();

    match event {
        Event::RxPacket {
            packet,
            sender,
            timestamp: _,
        } => handle_rx_packet(&mut state, config, packet, sender, &mut actions),
        Event::Command(kind) => handle_command(&mut state, kind, &mut actions),
        Event::Diagnostic(message) => {
            actions.push(Action::Callback(CallbackPayload::Diagnostic(message)));
        }
        Event::Tick { .. } => {}
    }

    (state, actions)
}

fn handle_rx_packet(
    state: &mut LogicState,
    config: &Config,
    packet: Packet,
    sender: SocketAddr,
    actions: &mut Vec<Action>,
) {
    match packet {
        Packet::Dmx(dmx) => {
            let net = (dmx.port_address >> 8) as u8;
            let sub_uni = (dmx.port_address & 0xff) as u8;
            let universe = state.node.universe_mut(dmx.port_address);
            universe.length = dmx.length;
            universe.sequence = dmx.sequence;
            universe.data[..dmx.length as usize].copy_from_slice(&dmx.data[..dmx.length as usize]);

            actions.push(Action::Callback(CallbackPayload::DmxFrame(DmxFrame {
                port_address: dmx.port_address,
                data: dmx.data.clone(),
                length: dmx.length,
                sequence: dmx.sequence,
                physical: dmx.physical,
                net,
                sub_uni,
            })));
        }
        Packet::Poll(_poll) => {
            actions.push(Action::Send {
                packet: Packet::PollReply(Box::new(build_poll_reply(&state.node))),
                target: Some(sender.into()),
                delay_ms: config.random_delay_fn.as_ref().map(|f| f()),
            });
        }
        Packet::Address(address) => {
            let result = apply_artaddress(&state.node, &address);
            let changes = result.changes.clone();
            state.node = result.node;
            actions.push(Action::Send {
                packet: Packet::PollReply(Box::new(build_poll_reply(&state.node))),
                target: None,
                delay_ms: None,
            });
            actions.push(Action::Callback(CallbackPayload::Programming(
                ProgrammingEvent::Address { changes },
            )));
        }
        Packet::Input(input) => {
            let result = apply_artinput(&state.node, &input, state.node.identity.bind_index);
            state.node = result.node;
            actions.push(Action::Send {
                packet: Packet::PollReply(Box::new(build_poll_reply(&state.node))),
                target: None,
                delay_ms: None,
            });
            actions.push(Action::Callback(CallbackPayload::Programming(
                ProgrammingEvent::Input {
                    applied_bind_index: result.applied_bind_index,
                    applied_to_base: result.applied_to_base,
                },
            )));
        }
        Packet::IpProg(ip_prog) => {
            let result = apply_artipprog(&state.node.network, &state.node.network_defaults, &ip_prog);
            state.node.network = result.network;
            actions.push(Action::Send {
                packet: Packet::IpProgReply(result.reply),
                target: Some(sender.into()),
                delay_ms: None,
            });
            actions.push(Action::Callback(CallbackPayload::Programming(
                ProgrammingEvent::IpProg {
                    dhcp: state.node.network.dhcp,
                },
            )));
        }
        Packet::Rdm(payload) | Packet::RdmSub(payload) => {
            handle_rdm(&payload, actions);
        }
        Packet::PollReply(_) | Packet::IpProgReply(_) | Packet::Unknown(_) => {
            // Unknown/irrelevant-inbound opcodes are discarded silently
            // (Art-Net explicitly permits extension).
        }
    }
}

fn handle_rdm(payload: &[u8], actions: &mut Vec<Action>) {
    let decoded = match rdm::decode_rdmsub_payload(payload) {
        Ok(packet) => packet,
        Err(err) => {
            actions.push(Action::Callback(CallbackPayload::Diagnostic(format!(
                "malformed rdmsub payload: {err}"
            ))));
            return;
        }
    };

    if !rdm::is_valid_rdmsub_packet(decoded.command_class, decoded.sub_count, decoded.payload_length as usize) {
        actions.push(Action::Callback(CallbackPayload::Diagnostic(
            "invalid rdmsub packet".into(),
        )));
        return;
    }

    let sub_devices = rdm::sub_devices(decoded.sub_device, decoded.sub_count);
    actions.push(Action::Callback(CallbackPayload::Rdm(RdmEvent {
        command_class: decoded.command_class,
        sub_devices,
        parameter_id: decoded.parameter_id,
        payload: decoded.payload,
    })));
}

fn handle_command(state: &mut LogicState, kind: CommandKind, actions: &mut Vec<Action>) {
    match kind {
        CommandKind::ApplyState(patch) => {
            if let Some(short_name) = patch.short_name {
                state.node.identity.short_name = short_name;
            }
            if let Some(long_name) = patch.long_name {
                state.node.identity.long_name = long_name;
            }
        }
        CommandKind::Snapshot { path, reply } => {
            let value = match path {
                SnapshotPath::Identity => SnapshotValue::Identity {
                    short_name: state.node.identity.short_name.clone(),
                    long_name: state.node.identity.long_name.clone(),
                },
                SnapshotPath::Network => SnapshotValue::Network(state.node.network),
                SnapshotPath::Full => SnapshotValue::Full(Box::new(state.node.clone())),
            };
            actions.push(Action::Reply { reply, value });
        }
        CommandKind::Shutdown => {
            state.running = false;
        }
    }
}

fn build_poll_reply(node: &NodeState) -> ArtPollReply {
    let good_input = [
        node.ports[0].good_input,
        node.ports[1].good_input,
        node.ports[2].good_input,
        node.ports[3].good_input,
    ];
    let good_output = [
        node.ports[0].good_output,
        node.ports[1].good_output,
        node.ports[2].good_output,
        node.ports[3].good_output,
    ];
    ArtPollReply {
        ip: node.network.ip,
        port: node.network.port,
        short_name: node.identity.short_name.clone(),
        long_name: node.identity.long_name.clone(),
        bind_index: node.identity.bind_index,
        good_input,
        good_output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ArtDmx, ArtPoll};

    fn config() -> Config {
        Config::default()
    }

    fn sender_addr() -> SocketAddr {
        "10.0.0.50:6454".parse().unwrap()
    }

    #[test]
    fn first_invocation_initializes_state_deterministically() {
        let config = config();
        let (state_a, _) = step(
            None,
            &config,
            Event::Tick { now: 0 },
        );
        let (state_b, _) = step(None, &config, Event::Tick { now: 0 });
        assert_eq!(state_a.node.identity.short_name, state_b.node.identity.short_name);
        assert_eq!(state_a.node.network.ip, state_b.node.network.ip);
    }

    #[test]
    fn dmx_updates_universe_and_emits_callback() {
        let config = config();
        let packet = Packet::Dmx(ArtDmx {
            sequence: 1,
            physical: 0,
            port_address: 0x0102,
            length: 3,
            data: vec![10, 20, 30],
        });
        let (state, actions) = step(
            None,
            &config,
            Event::RxPacket {
                packet,
                sender: sender_addr(),
                timestamp: 0,
            },
        );

        assert_eq!(state.node.dmx_universes.get(&0x0102).unwrap().length, 3);
        assert!(matches!(
            actions.as_slice(),
            [Action::Callback(CallbackPayload::DmxFrame(_))]
        ));
    }

    #[test]
    fn poll_replies_directly_to_sender() {
        let config = config();
        let packet = Packet::Poll(ArtPoll::default());
        let (_state, actions) = step(
            None,
            &config,
            Event::RxPacket {
                packet,
                sender: sender_addr(),
                timestamp: 0,
            },
        );

        match &actions[0] {
            Action::Send { target, .. } => {
                assert_eq!(target.as_ref().unwrap().port, 6454);
            }
            other => panic!("expected a send action, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_command_replies_with_projected_state() {
        let config = config();
        let (_state, _) = step(None, &config, Event::Tick { now: 0 });
        let (tx, _rx) = oneshot::channel();
        let (_state, actions) = step(
            Some(LogicState::init(&config)),
            &config,
            Event::Command(CommandKind::Snapshot {
                path: SnapshotPath::Identity,
                reply: tx,
            }),
        );
        assert!(matches!(actions.as_slice(), [Action::Reply { .. }]));
    }

    #[test]
    fn unknown_opcode_produces_no_actions() {
        let config = config();
        let (_state, actions) = step(
            None,
            &config,
            Event::RxPacket {
                packet: Packet::Unknown(0x1234),
                sender: sender_addr(),
                timestamp: 0,
            },
        );
        assert!(actions.is_empty());
    }
}
