//! artnet-node
//!
//! An embeddable Art-Net 4 node: a concurrent shell pipeline (receiver,
//! logic step, sender, command bus) around a pooled-buffer UDP channel,
//! plus the programming logic and RDM-over-Art-Net (RDMsub) transport
//! needed to participate as a real node on an Art-Net network.
//!
//! This crate provides:
//! - A bounded buffer pool and UDP channel wrapper ([`buffer_pool`], [`net::channel`])
//! - Bind address resolution from configuration ([`net::bind`])
//! - An Art-Net packet codec for the opcodes this node acts on ([`codec`])
//! - RDM sub-device validation and enumeration ([`rdm`])
//! - Pure programming-state transitions for ArtAddress/ArtInput/ArtIpProg ([`programming`])
//! - The pure logic step tying events to actions ([`logic`])
//! - The receiver/sender/command-bus tasks and node lifecycle ([`tasks`], [`lifecycle`])

pub mod buffer_pool;
pub mod codec;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logic;
pub mod net;
pub mod node;
pub mod programming;
pub mod rdm;
pub mod tasks;

pub use config::Config;
pub use error::{Error, Result};
pub use lifecycle::Node;
pub use net::bind::ARTNET_PORT;
