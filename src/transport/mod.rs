//! Datagram transports.
//!
//! A [`Transport`] is the mailbox of one process: unreliable, unordered,
//! fire-and-forget datagrams. Two implementations are provided:
//!
//! - [`UdpTransport`]: one UDP socket per process
//! - [`LocalHub`] / [`LocalTransport`]: an in-process mesh over bounded
//!   crossbeam channels, lossy when a queue is full

mod local;
mod udp;

pub use local::{LocalHub, LocalTransport};
pub use udp::UdpTransport;

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Address of a transport endpoint.
///
/// For UDP this is `host:port`; the `osc.udp://host:port/` URL form is
/// accepted too. For the in-process hub any string works.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create an address.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address as given.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `host:port` part, with any `osc.udp://` scheme and trailing
    /// slash removed.
    pub fn host_port(&self) -> &str {
        let s = self.0.strip_prefix("osc.udp://").unwrap_or(&self.0);
        s.strip_suffix('/').unwrap_or(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One received datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Sender's address.
    pub from: Address,
    /// Raw payload.
    pub bytes: Vec<u8>,
}

/// A datagram endpoint owned by exactly one simulation.
pub trait Transport: Send + 'static {
    /// Address peers use to reach this endpoint.
    fn local_address(&self) -> &Address;

    /// Receive one datagram, waiting at most `timeout`. A zero timeout
    /// polls without blocking. `Ok(None)` means nothing arrived.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the endpoint failed.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Packet>, TransportError>;

    /// Send one datagram. Delivery is not guaranteed.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the address is invalid or the
    /// endpoint failed. Lost datagrams are not errors.
    fn send(&mut self, to: &Address, bytes: &[u8]) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_port_strips_url_form() {
        assert_eq!(Address::from("osc.udp://localhost:7770/").host_port(), "localhost:7770");
        assert_eq!(Address::from("127.0.0.1:7771").host_port(), "127.0.0.1:7771");
    }
}
