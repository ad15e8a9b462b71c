//! Host parsing and wildcard predicate

use std::net::IpAddr;

use serde::Deserialize;

use crate::error::{Error, Result};

/// A host setting as it arrives from configuration: either a dotted-quad
/// string or a literal 4-tuple. `None` (the field absent) is represented by
/// wrapping this in `Option<HostValue>` at the config layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HostValue {
    Text(String),
    Tuple([u8; 4]),
}

impl From<[u8; 4]> for HostValue {
    fn from(tuple: [u8; 4]) -> Self {
        HostValue::Tuple(tuple)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Text(s.to_string())
    }
}

/// `parse-host(x)`: dotted-quad string -> 4-tuple; 4-tuple -> passthrough;
/// absent -> `None`; anything else -> `InvalidHostFormat`.
pub fn parse_host(x: Option<&HostValue>) -> Result<Option<[u8; 4]>> {
    match x {
        None => Ok(None),
        Some(HostValue::Tuple(t)) => Ok(Some(*t)),
        Some(HostValue::Text(s)) => parse_dotted_quad(s)
            .map(Some)
            .ok_or_else(|| Error::InvalidHostFormat(s.clone())),
    }
}

fn parse_dotted_quad(s: &str) -> Option<[u8; 4]> {
    let mut parts = s.split('.');
    let mut out = [0u8; 4];
    for slot in out.iter_mut() {
        let part = parts.next()?;
        *slot = part.parse::<u8>().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

/// `wildcard?(x)`: true for absent, `"0.0.0.0"`, and `[0,0,0,0]`.
pub fn is_wildcard(x: Option<&HostValue>) -> bool {
    match x {
        None => true,
        Some(HostValue::Tuple(t)) => *t == [0, 0, 0, 0],
        Some(HostValue::Text(s)) => s == "0.0.0.0",
    }
}

/// Detects a non-loopback, non-wildcard local IPv4 address, used by the
/// bind resolver's auto-detection step. Grounded on the same
/// `local_ip_address` crate `D1plo1d-tiny-artnet` dev-depends on for this
/// exact purpose.
pub fn detect_local_ipv4() -> Option<[u8; 4]> {
    match local_ip_address::local_ip() {
        Ok(IpAddr::V4(addr)) => {
            if addr.is_loopback() || addr.is_unspecified() {
                None
            } else {
                Some(addr.octets())
            }
        }
        _ => None,
    }
}
