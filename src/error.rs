//! Error types for the Art-Net node core

use thiserror::Error;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, Error>;

/// Node error types
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed user input at startup
    #[error("invalid config field {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// Non-parseable host string/value
    #[error("invalid host format: {0}")]
    InvalidHostFormat(String),

    /// Send requested without a resolvable target host
    #[error("missing target host")]
    MissingTargetHost,

    /// Send requested without any resolvable destination
    #[error("missing target")]
    MissingTarget,

    /// 255.255.255.255 used while policy disallows it
    #[error("limited broadcast disabled")]
    LimitedBroadcastDisabled,

    /// RDMsub payload shorter than the minimum bound
    #[error("payload too short: {n} bytes (min {min})")]
    PayloadTooShort { n: usize, min: usize },

    /// RDMsub payload longer than the maximum bound
    #[error("payload too long: {n} bytes (max {max})")]
    PayloadTooLong { n: usize, max: usize },

    /// `apply-state` command payload was not a map/struct-shaped patch
    #[error("apply-state command expects a map payload")]
    ApplyStateExpectsMap,

    /// Snapshot requested on a node with no running flow context
    #[error("node is missing flow context")]
    NodeMissingFlowContext,

    /// Terminal: channel closed, triggers orderly shutdown
    #[error("channel closed")]
    ChannelClosed,

    /// Underlying I/O failure (socket bind/send/recv)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
