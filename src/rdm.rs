//! RDM Transport: command-class classification, payload validation, and
//! sub-device enumeration for RDMsub packets.
//!
//! Grounded on `clasp-transport::traits` for the `Result`-returning,
//! pure-validation shape, and on the command dispatch table in
//! `examples/other_examples/9881cbf5_Trangar-artnet_protocol__src-command-mod.rs.rs`
//! for treating command classes as a closed byte set rather than a bitmask.

use bytes::Buf;

use crate::error::{Error, Result};
use crate::net::host::HostValue;

/// RDM request command class: a device get request.
pub const CC_GET: u8 = 0x20;
/// RDM response command class: reply to a get request.
pub const CC_GET_RESPONSE: u8 = 0x21;
/// RDM request command class: a device set request.
pub const CC_SET: u8 = 0x30;
/// RDM response command class: reply to a set request.
pub const CC_SET_RESPONSE: u8 = 0x31;

/// Minimum RDMsub payload length, bytes.
pub const MIN_PAYLOAD_LEN: usize = 24;
/// Maximum RDMsub payload length, bytes.
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Byte offset of the command class within an RDMsub payload.
const COMMAND_CLASS_OFFSET: usize = 20;

/// A logical RDMsub packet, independent of wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdmSubPacket {
    pub command_class: u8,
    pub sub_device: u16,
    pub sub_count: u16,
    pub parameter_id: u16,
    pub payload: Vec<u8>,
    pub payload_length: u8,
}

/// Emitted via `Callbacks.rdm` when the logic step forwards an RDM/RDMsub
/// packet to the user's handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdmEvent {
    pub command_class: u8,
    pub sub_devices: Vec<u16>,
    pub parameter_id: u16,
    pub payload: Vec<u8>,
}

/// True for `{0x20, 0x30}`.
pub fn is_request(cc: u8) -> bool {
    matches!(cc, CC_GET | CC_SET)
}

/// True for `{0x21, 0x31}`.
pub fn is_response(cc: u8) -> bool {
    matches!(cc, CC_GET_RESPONSE | CC_SET_RESPONSE)
}

/// `valid = requests ∪ responses`.
pub fn is_valid_command_class(cc: u8) -> bool {
    is_request(cc) || is_response(cc)
}

/// Command class at byte offset 20 of a raw payload slice. Works on any
/// byte source of length ≥ 21; shorter returns `None`.
pub fn payload_command_class(payload: &[u8]) -> Option<u8> {
    payload.get(COMMAND_CLASS_OFFSET).copied()
}

/// Same extraction, but over a positioned byte buffer (`bytes::Buf`)
/// without consuming its logical position. Peeks via `chunk()`, never
/// calls `advance`.
pub fn payload_command_class_buf<B: Buf>(buf: &B) -> Option<u8> {
    buf.chunk().get(COMMAND_CLASS_OFFSET).copied()
}

/// `expected(cc, sub-count)`. `None` for a command class
/// outside the valid set.
pub fn expected_data_length(cc: u8, sub_count: u16) -> Option<usize> {
    match cc {
        CC_GET | CC_SET_RESPONSE => Some(0),
        CC_SET | CC_GET_RESPONSE => Some(sub_count as usize * 2),
        _ => None,
    }
}

/// Validity of `{command-class, sub-count, payload-length}`: a valid
/// command class, `sub-count ≥ 1`, and `payload-length` matching the
/// expected length exactly.
pub fn is_valid_rdmsub_packet(cc: u8, sub_count: u16, payload_length: usize) -> bool {
    if !is_valid_command_class(cc) || sub_count == 0 {
        return false;
    }
    expected_data_length(cc, sub_count) == Some(payload_length)
}

/// The sub-device enumeration range: `{first, count, last}`, `last` wrapping
/// modulo 2^16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubDeviceRange {
    pub first: u16,
    pub count: u16,
    pub last: u16,
}

/// `range = {first, count, last = (sub-device + sub-count - 1) mod 2^16}`.
pub fn sub_device_range(sub_device: u16, sub_count: u16) -> SubDeviceRange {
    let last = if sub_count == 0 {
        sub_device
    } else {
        sub_device.wrapping_add(sub_count - 1)
    };
    SubDeviceRange {
        first: sub_device,
        count: sub_count,
        last,
    }
}

/// `sub-devices = [sub-device, sub-device+1, ...]`, length `sub-count`,
/// wrapping modulo 2^16.
pub fn sub_devices(sub_device: u16, sub_count: u16) -> Vec<u16> {
    (0..sub_count)
        .map(|i| sub_device.wrapping_add(i))
        .collect()
}

/// One entry of `entries(values)`: a sub-device slot paired with its index
/// and an optional value (`None` when `values` ran short).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T> {
    pub index: u16,
    pub sub_device: u16,
    pub value: Option<T>,
}

/// `entries(values)`: zips `0..sub-count-1` with sub-device ids and the
/// `values` sequence; short `values` leave trailing entries with
/// `value = None`.
pub fn entries<T: Clone>(sub_device: u16, sub_count: u16, values: &[T]) -> Vec<Entry<T>> {
    sub_devices(sub_device, sub_count)
        .into_iter()
        .enumerate()
        .map(|(i, dev)| Entry {
            index: i as u16,
            sub_device: dev,
            value: values.get(i).cloned(),
        })
        .collect()
}

/// `normalize-bytes(x)`: an owned, non-aliasing copy of a byte slice.
pub fn normalize_bytes(x: &[u8]) -> Vec<u8> {
    x.to_vec()
}

/// `normalize-buffer(x)`: a read-only view over normalized bytes.
pub fn normalize_buffer(x: &[u8]) -> bytes::Bytes {
    bytes::Bytes::copy_from_slice(x)
}

/// `validate-length(n)`: accepts `[24, 255]`, otherwise fails with
/// `PayloadTooShort`/`PayloadTooLong`.
pub fn validate_length(n: usize) -> Result<usize> {
    if n < MIN_PAYLOAD_LEN {
        return Err(Error::PayloadTooShort {
            n,
            min: MIN_PAYLOAD_LEN,
        });
    }
    if n > MAX_PAYLOAD_LEN {
        return Err(Error::PayloadTooLong {
            n,
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(n)
}

/// Byte offset of `payload_length` within an encoded RDMsub payload.
const PAYLOAD_LENGTH_OFFSET: usize = 6;
/// Fixed header size before the command-class byte and the variable-length
/// payload that follows it.
const HEADER_LEN: usize = COMMAND_CLASS_OFFSET + 1;

/// Decodes the fixed-layout RDMsub payload carried inside an ArtRdmSub
/// packet: `sub_device`/`sub_count`/`parameter_id` (big-endian u16s),
/// `payload_length`, then the command class at byte offset 20, followed by
/// `payload_length` bytes of payload.
pub fn decode_rdmsub_payload(bytes: &[u8]) -> Result<RdmSubPacket> {
    validate_length(bytes.len())?;
    let sub_device = u16::from_be_bytes([bytes[0], bytes[1]]);
    let sub_count = u16::from_be_bytes([bytes[2], bytes[3]]);
    let parameter_id = u16::from_be_bytes([bytes[4], bytes[5]]);
    let payload_length = bytes[PAYLOAD_LENGTH_OFFSET];
    let command_class = bytes[COMMAND_CLASS_OFFSET];

    let payload_end = HEADER_LEN + payload_length as usize;
    if bytes.len() < payload_end {
        return Err(Error::PayloadTooShort {
            n: bytes.len(),
            min: payload_end,
        });
    }

    Ok(RdmSubPacket {
        command_class,
        sub_device,
        sub_count,
        parameter_id,
        payload: bytes[HEADER_LEN..payload_end].to_vec(),
        payload_length,
    })
}

/// Inverse of [`decode_rdmsub_payload`].
pub fn encode_rdmsub_payload(packet: &RdmSubPacket) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_LEN];
    out[0..2].copy_from_slice(&packet.sub_device.to_be_bytes());
    out[2..4].copy_from_slice(&packet.sub_count.to_be_bytes());
    out[4..6].copy_from_slice(&packet.parameter_id.to_be_bytes());
    out[PAYLOAD_LENGTH_OFFSET] = packet.payload_length;
    out[COMMAND_CLASS_OFFSET] = packet.command_class;
    out.extend_from_slice(&packet.payload);
    out
}

/// A normalized send target: host plus a port that defaults to Art-Net's
/// IANA port when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTarget {
    pub host: HostValue,
    pub port: u16,
}

/// `normalize-target({host, port?})`: defaults `port` to `0x1936` (6454).
/// Fails with `MissingTargetHost` if `host` is absent.
pub fn normalize_target(host: Option<HostValue>, port: Option<u16>) -> Result<NormalizedTarget> {
    let host = host.ok_or(Error::MissingTargetHost)?;
    Ok(NormalizedTarget {
        host,
        port: port.unwrap_or(crate::net::bind::ARTNET_PORT),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_response_are_disjoint_and_exhaustive_over_valid() {
        for cc in [CC_GET, CC_GET_RESPONSE, CC_SET, CC_SET_RESPONSE] {
            assert_ne!(is_request(cc), is_response(cc));
        }
    }

    #[test]
    fn set_validation_scenarios() {
        assert!(is_valid_rdmsub_packet(CC_SET, 5, 10));
        assert!(!is_valid_rdmsub_packet(CC_SET, 5, 8));
        assert!(!is_valid_rdmsub_packet(CC_SET, 3, 5));
    }

    #[test]
    fn sub_count_zero_is_never_valid() {
        assert!(!is_valid_rdmsub_packet(CC_GET, 0, 0));
    }

    #[test]
    fn sub_device_wrap() {
        let range = sub_device_range(65534, 3);
        assert_eq!(
            range,
            SubDeviceRange {
                first: 65534,
                count: 3,
                last: 0
            }
        );
        assert_eq!(sub_devices(65534, 3), vec![65534, 65535, 0]);
    }

    #[test]
    fn sub_devices_boundaries() {
        assert!(sub_devices(10, 0).is_empty());
        assert_eq!(sub_devices(10, 1), vec![10]);
    }

    #[test]
    fn entries_pads_missing_values_with_none() {
        let result = entries(10, 3, &[1u8, 2]);
        assert_eq!(result[0].value, Some(1));
        assert_eq!(result[1].value, Some(2));
        assert_eq!(result[2].value, None);
        assert_eq!(result[2].sub_device, 12);
    }

    #[test]
    fn payload_command_class_boundary() {
        assert_eq!(payload_command_class(&[0u8; 20]), None);
        let mut payload = vec![0u8; 21];
        payload[20] = CC_SET;
        assert_eq!(payload_command_class(&payload), Some(CC_SET));
    }

    #[test]
    fn payload_command_class_buf_does_not_consume() {
        let mut payload = vec![0u8; 21];
        payload[20] = CC_GET_RESPONSE;
        let buf = bytes::Bytes::from(payload);
        let remaining_before = buf.remaining();
        assert_eq!(payload_command_class_buf(&buf), Some(CC_GET_RESPONSE));
        assert_eq!(buf.remaining(), remaining_before);
    }

    #[test]
    fn normalize_bytes_does_not_alias() {
        let original = vec![1u8, 2, 3];
        let copy = normalize_bytes(&original);
        assert_eq!(copy, original);
        assert_ne!(copy.as_ptr(), original.as_ptr());
    }

    #[test]
    fn validate_length_boundaries() {
        assert_eq!(validate_length(24).unwrap(), 24);
        assert_eq!(validate_length(255).unwrap(), 255);
        assert!(matches!(
            validate_length(23),
            Err(Error::PayloadTooShort { n: 23, min: 24 })
        ));
        assert!(matches!(
            validate_length(256),
            Err(Error::PayloadTooLong { n: 256, max: 255 })
        ));
    }

    #[test]
    fn normalize_target_defaults_port() {
        let target = normalize_target(Some(HostValue::from("10.0.0.5")), None).unwrap();
        assert_eq!(target.port, 6454);
    }

    #[test]
    fn rdmsub_payload_round_trips() {
        let packet = RdmSubPacket {
            command_class: CC_SET,
            sub_device: 12,
            sub_count: 2,
            parameter_id: 0x0050,
            payload: vec![1, 2, 3, 4],
            payload_length: 4,
        };
        let bytes = encode_rdmsub_payload(&packet);
        assert_eq!(payload_command_class(&bytes), Some(CC_SET));
        assert_eq!(decode_rdmsub_payload(&bytes).unwrap(), packet);
    }

    #[test]
    fn rdmsub_payload_too_short_for_declared_length() {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[PAYLOAD_LENGTH_OFFSET] = 10;
        assert!(matches!(
            decode_rdmsub_payload(&bytes),
            Err(Error::PayloadTooShort { .. })
        ));
    }

    #[test]
    fn decode_rdmsub_payload_rejects_oversized_total_length() {
        let mut bytes = vec![0u8; HEADER_LEN + 240];
        bytes[PAYLOAD_LENGTH_OFFSET] = 240;
        assert!(matches!(
            decode_rdmsub_payload(&bytes),
            Err(Error::PayloadTooLong { .. })
        ));
    }

    #[test]
    fn normalize_target_requires_host() {
        assert!(matches!(
            normalize_target(None, Some(6454)),
            Err(Error::MissingTargetHost)
        ));
    }
}
