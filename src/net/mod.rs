//! Networking: host parsing, bind resolution, and the UDP channel.

pub mod bind;
pub mod channel;
pub mod host;
