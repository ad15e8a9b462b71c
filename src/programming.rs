//! Programming Logic: pure state transitions for
//! ArtAddress/ArtInput/ArtIpProg.
//!
//! Grounded on `clasp-core::state::StateStore::update`'s pattern of
//! returning `(new_state, changes)` from a pure function rather than
//! mutating in place, adapted to this module's three packet-specific
//! transitions.

use crate::codec::{ArtAddress, ArtIpProg, ArtInput, ArtIpProgReply};
use crate::node::{Network, NetworkDefaults, NodeState};

/// Bit in an ArtIpProg command byte: enable DHCP.
pub const IPPROG_DHCP_ENABLE: u8 = 0x40;
/// Bits in an ArtIpProg command byte: reset to programmed defaults
/// (observed as `0x88` in the reference scenarios; `0x08` is the documented
/// reset bit, `0x80` simply marks the byte as "program enable").
pub const IPPROG_RESET: u8 = 0x08;
/// Program-enable bit: must be set for any other bit to take effect, per
/// the Art-Net 4 specification's ArtIpProg semantics.
pub const IPPROG_PROGRAM_ENABLE: u8 = 0x80;
/// Bit: program the IP address from `prog_ip`.
pub const IPPROG_SET_IP: u8 = 0x04;
/// Bit: program the subnet mask from `prog_sm`.
pub const IPPROG_SET_SM: u8 = 0x02;
/// Bit: program the port from `prog_port` (Art-Net 4 extension; vendor
/// nodes vary, this library honors it when the bit is set).
pub const IPPROG_SET_PORT: u8 = 0x01;

/// Result of applying an ArtInput packet.
#[derive(Debug, Clone)]
pub struct ArtInputResult {
    pub node: NodeState,
    pub changes: Vec<&'static str>,
    pub applied_bind_index: u8,
    pub applied_to_base: bool,
}

/// `apply-artinput`. Only mutates `node` when
/// `packet.bind_index == target_bind_index`; otherwise returns `node`
/// unchanged, an explicit identity rather than merely a no-op by convention.
pub fn apply_artinput(node: &NodeState, packet: &ArtInput, target_bind_index: u8) -> ArtInputResult {
    if packet.bind_index != target_bind_index {
        return ArtInputResult {
            node: node.clone(),
            changes: Vec::new(),
            applied_bind_index: target_bind_index,
            applied_to_base: false,
        };
    }

    let mut next = node.clone();
    let mut changes = Vec::new();
    for (i, disabled) in packet.disabled.into_iter().enumerate() {
        if next.ports[i].disabled != disabled {
            changes.push("ports");
        }
        next.set_port_disabled(i, disabled);
    }

    ArtInputResult {
        node: next,
        changes,
        applied_bind_index: target_bind_index,
        applied_to_base: true,
    }
}

/// Result of applying an ArtIpProg packet.
#[derive(Debug, Clone)]
pub struct ArtIpProgResult {
    pub network: Network,
    pub reply: ArtIpProgReply,
}

fn reply_from_network(network: &Network) -> ArtIpProgReply {
    ArtIpProgReply {
        ip: network.ip,
        sm: network.subnet_mask,
        gw: network.gateway,
        port: network.port,
    }
}

/// `apply-artipprog`. Checks DHCP-enable and reset before
/// falling through to field-specific bits, matching the rule ordering the
/// reference scenarios pin.
pub fn apply_artipprog(
    network: &Network,
    defaults: &NetworkDefaults,
    packet: &ArtIpProg,
) -> ArtIpProgResult {
    // Rule 1: DHCP enable. All other fields preserved regardless of other
    // bits in the command.
    if packet.command & IPPROG_DHCP_ENABLE != 0 {
        let next = Network {
            dhcp: true,
            ..*network
        };
        return ArtIpProgResult {
            reply: reply_from_network(&next),
            network: next,
        };
    }

    // Rule 2: reset to programmed defaults (0x88 in the reference suite:
    // program-enable + reset).
    if packet.command & (IPPROG_PROGRAM_ENABLE | IPPROG_RESET) == (IPPROG_PROGRAM_ENABLE | IPPROG_RESET) {
        let next = Network {
            ip: defaults.ip,
            subnet_mask: defaults.subnet_mask,
            gateway: [0, 0, 0, 0],
            port: crate::net::bind::ARTNET_PORT,
            dhcp: false,
        };
        return ArtIpProgResult {
            reply: reply_from_network(&next),
            network: next,
        };
    }

    // Rule 3: field-specific bits, gated on program-enable per the Art-Net
    // 4 spec (open question, resolved in DESIGN.md).
    let mut next = *network;
    if packet.command & IPPROG_PROGRAM_ENABLE != 0 {
        if packet.command & IPPROG_SET_IP != 0 {
            next.ip = packet.prog_ip;
        }
        if packet.command & IPPROG_SET_SM != 0 {
            next.subnet_mask = packet.prog_sm;
        }
        if packet.command & IPPROG_SET_PORT != 0 && packet.prog_port != 0 {
            next.port = packet.prog_port;
        }
    }

    ArtIpProgResult {
        reply: reply_from_network(&next),
        network: next,
    }
}

/// Result of applying an ArtAddress packet.
#[derive(Debug, Clone)]
pub struct ArtAddressResult {
    pub node: NodeState,
    pub changes: Vec<&'static str>,
}

/// ArtAddress command-action byte: cancel any merge in progress.
pub const ADDRESS_COMMAND_CANCEL_MERGE: u8 = 0x01;
/// ArtAddress command-action byte: clear DMX output buffers to zero.
pub const ADDRESS_COMMAND_CLEAR_BUFFERS: u8 = 0x05;

/// Applies short-name, long-name, port-addresses, and command-action.
/// Field-local and idempotent: applying the same packet twice yields the
/// same state.
pub fn apply_artaddress(node: &NodeState, packet: &ArtAddress) -> ArtAddressResult {
    let mut next = node.clone();
    let mut changes = Vec::new();

    if let Some(short_name) = &packet.short_name {
        if next.identity.short_name != *short_name {
            next.identity.short_name = short_name.clone();
            changes.push("identity.short_name");
        }
    }
    if let Some(long_name) = &packet.long_name {
        if next.identity.long_name != *long_name {
            next.identity.long_name = long_name.clone();
            changes.push("identity.long_name");
        }
    }

    for (i, sw) in packet.sw_in.into_iter().enumerate() {
        if let Some(universe) = sw {
            let port_address = combine_port_address(packet.net_switch, packet.sub_switch, universe);
            if next.ports[i].port_address != port_address {
                next.ports[i].port_address = port_address;
                changes.push("ports.port_address");
            }
        }
    }
    for (i, sw) in packet.sw_out.into_iter().enumerate() {
        if let Some(universe) = sw {
            let port_address = combine_port_address(packet.net_switch, packet.sub_switch, universe);
            if next.ports[i].port_address != port_address {
                next.ports[i].port_address = port_address;
                changes.push("ports.port_address");
            }
        }
    }

    match packet.command {
        ADDRESS_COMMAND_CLEAR_BUFFERS => {
            for universe in next.dmx_universes.values_mut() {
                *universe = Default::default();
            }
            changes.push("dmx_universes.cleared");
        }
        ADDRESS_COMMAND_CANCEL_MERGE => {
            changes.push("command.cancel_merge");
        }
        _ => {}
    }

    ArtAddressResult {
        node: next,
        changes,
    }
}

/// `port-address = (net & 0x7f) << 8 | (sub-switch & 0x0f) << 4 | (universe & 0x0f)`,
/// the Art-Net 4 15-bit addressing formula.
fn combine_port_address(net_switch: Option<u8>, sub_switch: Option<u8>, universe: u8) -> u16 {
    let net = (net_switch.unwrap_or(0) & 0x7f) as u16;
    let sub = (sub_switch.unwrap_or(0) & 0x0f) as u16;
    let uni = (universe & 0x0f) as u16;
    (net << 8) | (sub << 4) | uni
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn base_node() -> NodeState {
        NodeState::from_config(&Config::default())
    }

    #[test]
    fn artinput_bind_mismatch_is_identity() {
        let mut node = base_node();
        node.identity.bind_index = 5;

        let packet = ArtInput {
            bind_index: 9,
            disabled: [true, false, false, false],
        };
        let result = apply_artinput(&node, &packet, 7);

        assert!(!result.applied_to_base);
        assert!(result.changes.is_empty());
        assert_eq!(result.node.ports, node.ports);
    }

    #[test]
    fn artinput_applies_on_bind_match() {
        let node = base_node();
        let packet = ArtInput {
            bind_index: 5,
            disabled: [true, false, true, false],
        };
        let result = apply_artinput(&node, &packet, 5);

        assert!(result.applied_to_base);
        assert!(result.node.ports[0].disabled);
        assert!(!result.node.ports[1].disabled);
        assert!(result.node.ports[2].disabled);
    }

    #[test]
    fn artipprog_reset_scenario() {
        let network = Network {
            ip: [3, 3, 3, 3],
            subnet_mask: [255, 255, 0, 0],
            gateway: [3, 3, 3, 1],
            port: 0x3333,
            dhcp: true,
        };
        let defaults = NetworkDefaults {
            ip: [2, 2, 2, 2],
            subnet_mask: [255, 0, 0, 0],
        };
        let packet = ArtIpProg {
            command: 0x88,
            prog_ip: [0, 0, 0, 0],
            prog_sm: [0, 0, 0, 0],
            prog_gw: [0, 0, 0, 0],
            prog_port: 0,
        };

        let result = apply_artipprog(&network, &defaults, &packet);
        assert_eq!(result.network.ip, [2, 2, 2, 2]);
        assert_eq!(result.network.subnet_mask, [255, 0, 0, 0]);
        assert_eq!(result.network.gateway, [0, 0, 0, 0]);
        assert_eq!(result.network.port, 0x1936);
        assert!(!result.network.dhcp);
        assert_eq!(result.reply.ip, result.network.ip);
    }

    #[test]
    fn artipprog_dhcp_enable_preserves_other_fields() {
        let network = Network {
            ip: [10, 0, 0, 1],
            subnet_mask: [255, 0, 0, 0],
            gateway: [10, 0, 0, 254],
            port: 6454,
            dhcp: false,
        };
        let defaults = NetworkDefaults {
            ip: [2, 0, 0, 1],
            subnet_mask: [255, 0, 0, 0],
        };
        let packet = ArtIpProg {
            command: 0x40,
            prog_ip: [9, 9, 9, 9],
            prog_sm: [0, 0, 0, 0],
            prog_gw: [0, 0, 0, 0],
            prog_port: 0,
        };

        let result = apply_artipprog(&network, &defaults, &packet);
        assert!(result.network.dhcp);
        assert_eq!(result.network.ip, [10, 0, 0, 1]);
        assert_eq!(result.network.gateway, [10, 0, 0, 254]);
        assert_eq!(result.network.port, 6454);
    }

    #[test]
    fn artipprog_set_ip_field_bit_updates_only_ip() {
        let network = Network {
            ip: [10, 0, 0, 1],
            subnet_mask: [255, 0, 0, 0],
            gateway: [10, 0, 0, 254],
            port: 6454,
            dhcp: false,
        };
        let defaults = NetworkDefaults {
            ip: [2, 0, 0, 1],
            subnet_mask: [255, 0, 0, 0],
        };
        let packet = ArtIpProg {
            command: IPPROG_PROGRAM_ENABLE | IPPROG_SET_IP,
            prog_ip: [192, 168, 1, 50],
            prog_sm: [255, 255, 0, 0],
            prog_gw: [0, 0, 0, 0],
            prog_port: 0,
        };

        let result = apply_artipprog(&network, &defaults, &packet);
        assert_eq!(result.network.ip, [192, 168, 1, 50]);
        assert_eq!(result.network.subnet_mask, network.subnet_mask);
        assert_eq!(result.network.gateway, network.gateway);
        assert_eq!(result.network.port, network.port);
        assert!(!result.network.dhcp);
        assert_eq!(result.reply.ip, result.network.ip);
    }

    #[test]
    fn artaddress_is_idempotent() {
        let node = base_node();
        let packet = ArtAddress {
            short_name: Some("rig-1".into()),
            long_name: None,
            net_switch: Some(1),
            sub_switch: None,
            sw_in: [None; 4],
            sw_out: [Some(2), None, None, None],
            command: 0,
        };

        let once = apply_artaddress(&node, &packet);
        let twice = apply_artaddress(&once.node, &packet);
        assert_eq!(once.node.identity.short_name, twice.node.identity.short_name);
        assert_eq!(once.node.ports[0].port_address, twice.node.ports[0].port_address);
        assert!(twice.changes.is_empty());
    }

    #[test]
    fn artaddress_clear_buffers_zeroes_universes() {
        let mut node = base_node();
        node.universe_mut(1).length = 10;
        let packet = ArtAddress {
            short_name: None,
            long_name: None,
            net_switch: None,
            sub_switch: None,
            sw_in: [None; 4],
            sw_out: [None; 4],
            command: ADDRESS_COMMAND_CLEAR_BUFFERS,
        };
        let result = apply_artaddress(&node, &packet);
        assert_eq!(result.node.dmx_universes.get(&1).unwrap().length, 0);
    }
}
