//! Bind resolver: merges config precedence into a final `(ip, port)` plus
//! source tags.

use crate::config::Config;
use crate::error::Result;
use crate::net::host::{is_wildcard, parse_host};

/// Art-Net's IANA-assigned UDP port.
pub const ARTNET_PORT: u16 = 6454;

/// Deterministic fallback IP used when auto-detection fails.
pub const FALLBACK_IP: [u8; 4] = [127, 0, 0, 1];

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    ExplicitNode,
    ExplicitBind,
    AutoDetected,
    Fallback,
    Default,
}

/// The result of resolving a bind address from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindResolution {
    pub ip: [u8; 4],
    pub port: u16,
    pub ip_source: Source,
    pub port_source: Source,
    pub non_standard_port: bool,
}

/// Resolve `(ip, port)` from `config.node`/`config.bind` by the
/// explicit-node/explicit-bind/auto-detect/fallback precedence chain.
pub fn resolve(config: &Config) -> Result<BindResolution> {
    let (ip, ip_source) = resolve_ip(config)?;
    let (port, port_source, non_standard_port) = resolve_port(config);

    Ok(BindResolution {
        ip,
        port,
        ip_source,
        port_source,
        non_standard_port,
    })
}

fn resolve_ip(config: &Config) -> Result<([u8; 4], Source)> {
    // 1. node.ip present and non-wildcard
    if !is_wildcard(config.node.ip.as_ref()) {
        let ip = parse_host(config.node.ip.as_ref())?.expect("non-wildcard implies Some");
        return Ok((ip, Source::ExplicitNode));
    }

    // 2. bind.host present and non-wildcard
    if !is_wildcard(config.bind.host.as_ref()) {
        let ip = parse_host(config.bind.host.as_ref())?.expect("non-wildcard implies Some");
        return Ok((ip, Source::ExplicitBind));
    }

    // 3. Auto-detect, falling back to a deterministic default. Never the
    // wildcard.
    match crate::net::host::detect_local_ipv4() {
        Some(ip) => Ok((ip, Source::AutoDetected)),
        None => Ok((FALLBACK_IP, Source::Fallback)),
    }
}

fn resolve_port(config: &Config) -> (u16, Source, bool) {
    if let Some(port) = config.node.port {
        return (port, Source::ExplicitNode, port != ARTNET_PORT);
    }
    if let Some(port) = config.bind.port {
        return (port, Source::ExplicitBind, port != ARTNET_PORT);
    }
    (ARTNET_PORT, Source::Default, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::host::HostValue;

    fn base_config() -> Config {
        Config::default()
    }

    #[test]
    fn explicit_node_ip_wins() {
        let mut config = base_config();
        config.node.ip = Some(HostValue::from([10, 0, 0, 99]));
        config.bind.host = Some(HostValue::from("192.168.1.50"));

        let result = resolve(&config).unwrap();
        assert_eq!(result.ip, [10, 0, 0, 99]);
        assert_eq!(result.ip_source, Source::ExplicitNode);
    }

    #[test]
    fn explicit_bind_port_is_non_standard() {
        let mut config = base_config();
        config.bind.port = Some(6455);

        let result = resolve(&config).unwrap();
        assert_eq!(result.port, 6455);
        assert_eq!(result.port_source, Source::ExplicitBind);
        assert!(result.non_standard_port);
    }

    #[test]
    fn default_port_when_unconfigured() {
        let config = base_config();
        let result = resolve(&config).unwrap();
        assert_eq!(result.port, ARTNET_PORT);
        assert_eq!(result.port_source, Source::Default);
        assert!(!result.non_standard_port);
    }

    #[test]
    fn ip_never_wildcard() {
        let config = base_config();
        let result = resolve(&config).unwrap();
        assert_ne!(result.ip, [0, 0, 0, 0]);
    }

    #[test]
    fn invalid_bind_host_fails() {
        let mut config = base_config();
        config.bind.host = Some(HostValue::from("not-an-ip"));
        assert!(resolve(&config).is_err());
    }
}
