//! Typed configuration surface
//!
//! Plain `Default`-able config structs, in the style of
//! `clasp_transport::udp::UdpConfig` and `clasp_discovery::DiscoveryConfig`,
//! rather than untyped maps. Unrecognized keys in a caller's own
//! deserialization layer are silently ignored.

use std::sync::Arc;

use serde::Deserialize;

use crate::net::host::HostValue;
use crate::rdm::RdmEvent;

/// `node.ip` / `bind.host` style value: a dotted-quad string, a literal
/// 4-tuple, or absent.
pub type HostSetting = Option<HostValue>;

/// `node`: identity plus optional explicit bind overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub short_name: String,
    pub long_name: String,
    pub oem: u16,
    pub version: u16,
    pub bind_index: u8,
    #[serde(default)]
    pub ip: HostSetting,
    #[serde(default)]
    pub port: Option<u16>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            short_name: String::new(),
            long_name: String::new(),
            oem: 0,
            version: 1,
            bind_index: 1,
            ip: None,
            port: None,
        }
    }
}

/// `bind`: `{host, port}` for the socket bind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BindConfig {
    #[serde(default)]
    pub host: HostSetting,
    #[serde(default)]
    pub port: Option<u16>,
}

/// `network`: current programmable network settings, seeds `NodeState.network`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub ip: [u8; 4],
    pub subnet_mask: [u8; 4],
    pub gateway: [u8; 4],
    pub port: u16,
    #[serde(default)]
    pub dhcp: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ip: [2, 0, 0, 1],
            subnet_mask: [255, 0, 0, 0],
            gateway: [0, 0, 0, 0],
            port: crate::net::bind::ARTNET_PORT,
            dhcp: false,
        }
    }
}

/// `network-defaults`: restore target for an ArtIpProg reset.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NetworkDefaultsConfig {
    pub ip: [u8; 4],
    pub subnet_mask: [u8; 4],
}

impl Default for NetworkDefaultsConfig {
    fn default() -> Self {
        Self {
            ip: [2, 0, 0, 1],
            subnet_mask: [255, 0, 0, 0],
        }
    }
}

/// `rx-buffer` / `tx-buffer`: `{count, size, direct?}` for the buffer pools.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BufferConfig {
    pub count: usize,
    pub size: usize,
    #[serde(default)]
    pub direct: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            count: 8,
            size: 530,
            direct: false,
        }
    }
}

/// `default-target`: fallback send destination when an action carries none.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub host: HostValue,
    #[serde(default)]
    pub port: Option<u16>,
}

/// `callbacks`: `{dmx-frame, programming, rdm, diagnostics}`.
///
/// Dependency-injected function fields rather than runtime patching, so
/// tests can substitute a callback without any global hot-swap mechanism.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub dmx_frame: Option<Arc<dyn Fn(crate::logic::DmxFrame) + Send + Sync>>,
    pub programming: Option<Arc<dyn Fn(crate::logic::ProgrammingEvent) + Send + Sync>>,
    pub rdm: Option<Arc<dyn Fn(RdmEvent) + Send + Sync>>,
    pub diagnostics: Option<Arc<dyn Fn(String) + Send + Sync>>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("dmx_frame", &self.dmx_frame.is_some())
            .field("programming", &self.programming.is_some())
            .field("rdm", &self.rdm.is_some())
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

/// Full node configuration.
#[derive(Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub bind: BindConfig,
    pub network: NetworkConfig,
    pub network_defaults: NetworkDefaultsConfig,
    pub callbacks: Callbacks,
    pub rx_buffer: BufferConfig,
    pub tx_buffer: BufferConfig,
    pub recv_buffer: usize,
    pub command_buffer: usize,
    pub actions_buffer: usize,
    pub default_target: Option<TargetConfig>,
    pub allow_limited_broadcast: bool,
    pub random_delay_fn: Option<Arc<dyn Fn() -> u64 + Send + Sync>>,
    pub max_packet: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("node", &self.node)
            .field("bind", &self.bind)
            .field("network", &self.network)
            .field("network_defaults", &self.network_defaults)
            .field("callbacks", &self.callbacks)
            .field("rx_buffer", &self.rx_buffer)
            .field("tx_buffer", &self.tx_buffer)
            .field("recv_buffer", &self.recv_buffer)
            .field("command_buffer", &self.command_buffer)
            .field("actions_buffer", &self.actions_buffer)
            .field("allow_limited_broadcast", &self.allow_limited_broadcast)
            .field("max_packet", &self.max_packet)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        // NetworkDefaultsConfig/NetworkConfig/BufferConfig all have their own
        // Default impls above; only the queue/broadcast/packet-size knobs
        // need non-derive defaults here.
        Self {
            node: NodeConfig::default(),
            bind: BindConfig::default(),
            network: NetworkConfig::default(),
            network_defaults: NetworkDefaultsConfig::default(),
            callbacks: Callbacks::default(),
            rx_buffer: BufferConfig::default(),
            tx_buffer: BufferConfig::default(),
            recv_buffer: 64,
            command_buffer: 16,
            actions_buffer: 64,
            default_target: None,
            allow_limited_broadcast: false,
            random_delay_fn: None,
            max_packet: 530,
        }
    }
}
