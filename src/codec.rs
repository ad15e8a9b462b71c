//! Packet Codec: a minimal, self-contained encoder/decoder for exactly the
//! opcodes the rest of the crate needs.
//!
//! Implemented directly rather than depending on a third-party Art-Net
//! crate, so the rest of the pipeline has something real to compile and
//! test against.
//!
//! Wire shape (8-byte `Art-Net\0` header + little-endian opcode) is
//! grounded on
//! `examples/other_examples/9881cbf5_Trangar-artnet_protocol__src-command-mod.rs.rs`;
//! the `PollReply` field subset used is grounded on
//! `examples/other_examples/24948a34_Trangar-artnet_protocol__src-command-poll_reply.rs.rs`
//! and `examples/D1plo1d-tiny-artnet/src/poll_reply.rs`.

use crate::error::{Error, Result};
use crate::node::DMX_UNIVERSE_LEN;

pub const ARTNET_HEADER: &[u8; 8] = b"Art-Net\0";

mod opcode {
    pub const POLL: u16 = 0x2000;
    pub const POLL_REPLY: u16 = 0x2100;
    pub const DMX: u16 = 0x5000;
    pub const ADDRESS: u16 = 0x6000;
    pub const INPUT: u16 = 0x7000;
    pub const RDM: u16 = 0x8300;
    pub const RDM_SUB: u16 = 0x8400;
    pub const IP_PROG: u16 = 0xf800;
    pub const IP_PROG_REPLY: u16 = 0xf900;
}

/// ArtDmx payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtDmx {
    pub sequence: u8,
    pub physical: u8,
    /// 15-bit Art-Net address: `(net << 8) | sub_uni`.
    pub port_address: u16,
    pub length: u16,
    pub data: Vec<u8>,
}

/// ArtPoll payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtPoll {
    pub flags: u8,
    pub priority: u8,
}

/// ArtPollReply payload (the field subset the programming/poll handling
/// in this crate actually consumes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtPollReply {
    pub ip: [u8; 4],
    pub port: u16,
    pub short_name: String,
    pub long_name: String,
    pub bind_index: u8,
    pub good_input: [u8; 4],
    pub good_output: [u8; 4],
}

/// ArtAddress payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtAddress {
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub net_switch: Option<u8>,
    pub sub_switch: Option<u8>,
    pub sw_in: [Option<u8>; 4],
    pub sw_out: [Option<u8>; 4],
    pub command: u8,
}

/// ArtInput payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtInput {
    pub bind_index: u8,
    pub disabled: [bool; 4],
}

/// ArtIpProg payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtIpProg {
    pub command: u8,
    pub prog_ip: [u8; 4],
    pub prog_sm: [u8; 4],
    pub prog_gw: [u8; 4],
    pub prog_port: u16,
}

/// ArtIpProgReply payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtIpProgReply {
    pub ip: [u8; 4],
    pub sm: [u8; 4],
    pub gw: [u8; 4],
    pub port: u16,
}

/// A decoded Art-Net packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Poll(ArtPoll),
    PollReply(Box<ArtPollReply>),
    Dmx(ArtDmx),
    Address(Box<ArtAddress>),
    Input(ArtInput),
    IpProg(ArtIpProg),
    IpProgReply(ArtIpProgReply),
    Rdm(Vec<u8>),
    RdmSub(Vec<u8>),
    /// Art-Net explicitly permits extension; an opcode this codec does not
    /// recognize decodes to this variant instead of failing.
    Unknown(u16),
}

fn fixed_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

fn write_fixed_string(out: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(width);
    out.extend_from_slice(&bytes[..n]);
    out.resize(out.len() + (width - n), 0);
}

/// Encode a packet into Art-Net wire bytes.
pub fn encode(packet: &Packet) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    out.extend_from_slice(ARTNET_HEADER);

    match packet {
        Packet::Poll(poll) => {
            out.extend_from_slice(&opcode::POLL.to_le_bytes());
            out.push(poll.flags);
            out.push(poll.priority);
        }
        Packet::PollReply(reply) => {
            out.extend_from_slice(&opcode::POLL_REPLY.to_le_bytes());
            out.extend_from_slice(&reply.ip);
            out.extend_from_slice(&reply.port.to_le_bytes());
            write_fixed_string(&mut out, &reply.short_name, 18);
            write_fixed_string(&mut out, &reply.long_name, 64);
            out.extend_from_slice(&reply.good_input);
            out.extend_from_slice(&reply.good_output);
            out.push(reply.bind_index);
        }
        Packet::Dmx(dmx) => {
            out.extend_from_slice(&opcode::DMX.to_le_bytes());
            out.push(dmx.sequence);
            out.push(dmx.physical);
            out.extend_from_slice(&dmx.port_address.to_be_bytes());
            out.extend_from_slice(&dmx.length.to_be_bytes());
            out.extend_from_slice(&dmx.data[..dmx.length as usize]);
        }
        Packet::Address(addr) => {
            out.extend_from_slice(&opcode::ADDRESS.to_le_bytes());
            write_fixed_string(&mut out, addr.short_name.as_deref().unwrap_or(""), 18);
            write_fixed_string(&mut out, addr.long_name.as_deref().unwrap_or(""), 64);
            out.push(addr.net_switch.unwrap_or(0x7f)); // 0x7f = "no change" per Art-Net 4
            out.push(addr.sub_switch.unwrap_or(0x7f));
            for sw in addr.sw_in {
                out.push(sw.unwrap_or(0x7f));
            }
            for sw in addr.sw_out {
                out.push(sw.unwrap_or(0x7f));
            }
            out.push(addr.command);
        }
        Packet::Input(input) => {
            out.extend_from_slice(&opcode::INPUT.to_le_bytes());
            out.push(input.bind_index);
            for disabled in input.disabled {
                out.push(if disabled { 0x01 } else { 0x00 });
            }
        }
        Packet::IpProg(prog) => {
            out.extend_from_slice(&opcode::IP_PROG.to_le_bytes());
            out.push(prog.command);
            out.extend_from_slice(&prog.prog_ip);
            out.extend_from_slice(&prog.prog_sm);
            out.extend_from_slice(&prog.prog_gw);
            out.extend_from_slice(&prog.prog_port.to_be_bytes());
        }
        Packet::IpProgReply(reply) => {
            out.extend_from_slice(&opcode::IP_PROG_REPLY.to_le_bytes());
            out.extend_from_slice(&reply.ip);
            out.extend_from_slice(&reply.sm);
            out.extend_from_slice(&reply.gw);
            out.extend_from_slice(&reply.port.to_be_bytes());
        }
        Packet::Rdm(payload) => {
            out.extend_from_slice(&opcode::RDM.to_le_bytes());
            out.extend_from_slice(payload);
        }
        Packet::RdmSub(payload) => {
            out.extend_from_slice(&opcode::RDM_SUB.to_le_bytes());
            out.extend_from_slice(payload);
        }
        Packet::Unknown(op) => {
            out.extend_from_slice(&op.to_le_bytes());
        }
    }

    out
}

/// Decode Art-Net wire bytes into a packet. Unknown opcodes decode to
/// `Packet::Unknown` rather than erroring, since Art-Net explicitly
/// permits extension and unrecognized opcodes are discarded silently.
pub fn decode(buf: &[u8]) -> Result<Packet> {
    if buf.len() < 10 || &buf[..8] != ARTNET_HEADER {
        return Err(Error::InvalidHostFormat("not an Art-Net packet".into()));
    }
    let op = u16::from_le_bytes([buf[8], buf[9]]);
    let data = &buf[10..];

    let packet = match op {
        opcode::POLL => Packet::Poll(ArtPoll {
            flags: data.first().copied().unwrap_or(0),
            priority: data.get(1).copied().unwrap_or(0),
        }),
        opcode::POLL_REPLY => {
            if data.len() < 4 + 2 + 18 + 64 + 4 + 4 + 1 {
                return Err(Error::InvalidHostFormat("short ArtPollReply".into()));
            }
            let ip = [data[0], data[1], data[2], data[3]];
            let port = u16::from_le_bytes([data[4], data[5]]);
            let short_name = fixed_string(&data[6..24]);
            let long_name = fixed_string(&data[24..88]);
            let good_input = [data[88], data[89], data[90], data[91]];
            let good_output = [data[92], data[93], data[94], data[95]];
            let bind_index = data[96];
            Packet::PollReply(Box::new(ArtPollReply {
                ip,
                port,
                short_name,
                long_name,
                bind_index,
                good_input,
                good_output,
            }))
        }
        opcode::DMX => {
            if data.len() < 6 {
                return Err(Error::InvalidHostFormat("short ArtDmx".into()));
            }
            let sequence = data[0];
            let physical = data[1];
            let port_address = u16::from_be_bytes([data[2], data[3]]);
            let length = u16::from_be_bytes([data[4], data[5]]);
            let payload = &data[6..];
            if (length as usize) > payload.len() {
                return Err(Error::InvalidHostFormat("ArtDmx length exceeds payload".into()));
            }
            if (length as usize) > DMX_UNIVERSE_LEN {
                return Err(Error::InvalidHostFormat("ArtDmx length exceeds universe size".into()));
            }
            Packet::Dmx(ArtDmx {
                sequence,
                physical,
                port_address,
                length,
                data: payload[..length as usize].to_vec(),
            })
        }
        opcode::ADDRESS => {
            if data.len() < 18 + 64 + 2 + 4 + 4 + 1 {
                return Err(Error::InvalidHostFormat("short ArtAddress".into()));
            }
            let short_name = fixed_string(&data[0..18]);
            let long_name = fixed_string(&data[18..82]);
            let net_switch = data[82];
            let sub_switch = data[83];
            let sw_in = [data[84], data[85], data[86], data[87]];
            let sw_out = [data[88], data[89], data[90], data[91]];
            let command = data[92];
            let no_change = |b: u8| if b == 0x7f { None } else { Some(b) };
            Packet::Address(Box::new(ArtAddress {
                short_name: (!short_name.is_empty()).then_some(short_name),
                long_name: (!long_name.is_empty()).then_some(long_name),
                net_switch: no_change(net_switch),
                sub_switch: no_change(sub_switch),
                sw_in: sw_in.map(no_change),
                sw_out: sw_out.map(no_change),
                command,
            }))
        }
        opcode::INPUT => {
            if data.len() < 5 {
                return Err(Error::InvalidHostFormat("short ArtInput".into()));
            }
            let bind_index = data[0];
            let mut disabled = [false; 4];
            for (i, slot) in disabled.iter_mut().enumerate() {
                *slot = data[1 + i] & 0x01 != 0;
            }
            Packet::Input(ArtInput {
                bind_index,
                disabled,
            })
        }
        opcode::IP_PROG => {
            if data.len() < 1 + 4 + 4 + 4 + 2 {
                return Err(Error::InvalidHostFormat("short ArtIpProg".into()));
            }
            Packet::IpProg(ArtIpProg {
                command: data[0],
                prog_ip: [data[1], data[2], data[3], data[4]],
                prog_sm: [data[5], data[6], data[7], data[8]],
                prog_gw: [data[9], data[10], data[11], data[12]],
                prog_port: u16::from_be_bytes([data[13], data[14]]),
            })
        }
        opcode::IP_PROG_REPLY => {
            if data.len() < 4 + 4 + 4 + 2 {
                return Err(Error::InvalidHostFormat("short ArtIpProgReply".into()));
            }
            Packet::IpProgReply(ArtIpProgReply {
                ip: [data[0], data[1], data[2], data[3]],
                sm: [data[4], data[5], data[6], data[7]],
                gw: [data[8], data[9], data[10], data[11]],
                port: u16::from_be_bytes([data[12], data[13]]),
            })
        }
        opcode::RDM => Packet::Rdm(data.to_vec()),
        opcode::RDM_SUB => Packet::RdmSub(data.to_vec()),
        other => Packet::Unknown(other),
    };

    Ok(packet)
}
