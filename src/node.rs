//! Node State: the long-lived, mutable representation of the node's
//! published identity, network settings, ports, DMX universes, and RDM
//! table-of-devices.
//!
//! Grounded on `clasp-core::state::StateStore`'s shape (a single owned
//! struct mutated by one writer, read via clones/snapshots) generalized
//! from its generic param map to this node's concrete fields.

use std::collections::HashMap;

use crate::config::{Config, NetworkConfig, NetworkDefaultsConfig};

/// Bit within `good-input`/`good-output` marking a port disabled.
pub const GOOD_INPUT_DISABLED_BIT: u8 = 0x08;

/// Fixed DMX512 universe size; also the upper bound an ArtDmx `length`
/// field may carry on the wire.
pub const DMX_UNIVERSE_LEN: usize = 512;

/// A DMX universe buffer keyed by port-address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    pub data: [u8; DMX_UNIVERSE_LEN],
    pub length: u16,
    pub sequence: u8,
}

impl Default for Universe {
    fn default() -> Self {
        Self {
            data: [0u8; DMX_UNIVERSE_LEN],
            length: 0,
            sequence: 0,
        }
    }
}

/// Direction of a physical port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// One of the node's four fixed physical ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    pub good_input: u8,
    pub good_output: u8,
    pub disabled: bool,
    pub port_address: u16,
    pub direction: PortDirection,
}

impl Default for Port {
    fn default() -> Self {
        Self {
            good_input: 0,
            good_output: 0,
            disabled: false,
            port_address: 0,
            direction: PortDirection::Output,
        }
    }
}

/// Node identity fields.
#[derive(Debug, Clone)]
pub struct Identity {
    pub short_name: String,
    pub long_name: String,
    pub oem: u16,
    pub version: u16,
    pub bind_index: u8,
}

/// Current network configuration, mutable via ArtIpProg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    pub ip: [u8; 4],
    pub subnet_mask: [u8; 4],
    pub gateway: [u8; 4],
    pub port: u16,
    pub dhcp: bool,
}

impl From<&NetworkConfig> for Network {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            ip: config.ip,
            subnet_mask: config.subnet_mask,
            gateway: config.gateway,
            port: config.port,
            dhcp: config.dhcp,
        }
    }
}

/// Immutable snapshot of `{ip, subnet-mask}` captured at startup, restored
/// on an ArtIpProg reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkDefaults {
    pub ip: [u8; 4],
    pub subnet_mask: [u8; 4],
}

impl From<&NetworkDefaultsConfig> for NetworkDefaults {
    fn from(config: &NetworkDefaultsConfig) -> Self {
        Self {
            ip: config.ip,
            subnet_mask: config.subnet_mask,
        }
    }
}

/// RDM-specific node state: whether RDM is enabled, and each port's table
/// of discovered devices.
#[derive(Debug, Clone, Default)]
pub struct RdmState {
    pub enabled: bool,
    pub table_of_devices: [Vec<u16>; 4],
}

/// The node's full published state.
#[derive(Debug, Clone)]
pub struct NodeState {
    pub identity: Identity,
    pub network: Network,
    pub network_defaults: NetworkDefaults,
    pub ports: [Port; 4],
    pub dmx_universes: HashMap<u16, Universe>,
    pub rdm: RdmState,
}

impl NodeState {
    /// Deterministic initial state built from configuration. On the
    /// logic step's first invocation, state is `None` and must initialize
    /// deterministically from config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            identity: Identity {
                short_name: config.node.short_name.clone(),
                long_name: config.node.long_name.clone(),
                oem: config.node.oem,
                version: config.node.version,
                bind_index: config.node.bind_index,
            },
            network: Network::from(&config.network),
            network_defaults: NetworkDefaults::from(&config.network_defaults),
            ports: [Port::default(); 4],
            dmx_universes: HashMap::new(),
            rdm: RdmState::default(),
        }
    }

    /// `good-input[i]` bit `GOOD_INPUT_DISABLED_BIT` is set iff port `i` is
    /// disabled.
    pub fn set_port_disabled(&mut self, index: usize, disabled: bool) {
        let port = &mut self.ports[index];
        port.disabled = disabled;
        if disabled {
            port.good_input |= GOOD_INPUT_DISABLED_BIT;
        } else {
            port.good_input &= !GOOD_INPUT_DISABLED_BIT;
        }
    }

    pub fn universe_mut(&mut self, port_address: u16) -> &mut Universe {
        self.dmx_universes.entry(port_address).or_default()
    }
}
