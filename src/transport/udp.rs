//! UDP transport.

use super::{Address, Packet, Transport};
use crate::error::TransportError;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;
use tracing::trace;

/// Largest datagram accepted.
const MAX_DATAGRAM: usize = 65_536;

/// A process endpoint over one UDP socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    address: Address,
    buf: Vec<u8>,
    nonblocking: bool,
    resolved: HashMap<Address, SocketAddr>,
}

impl UdpTransport {
    /// Bind to `address` (`host:port`; port `0` picks a free one).
    ///
    /// # Errors
    ///
    /// [`TransportError::AddressInUse`] if the port is taken, otherwise
    /// the I/O error from binding.
    pub fn bind(address: &str) -> Result<Self, TransportError> {
        let host_port = Address::from(address);
        let socket = UdpSocket::bind(host_port.host_port()).map_err(|e| {
            if e.kind() == ErrorKind::AddrInUse {
                TransportError::AddressInUse(address.to_string())
            } else {
                TransportError::Io(e)
            }
        })?;
        let local = socket.local_addr()?;
        trace!(address = %local, "udp bound");
        Ok(Self {
            socket,
            address: Address::new(local.to_string()),
            buf: vec![0; MAX_DATAGRAM],
            nonblocking: false,
            resolved: HashMap::new(),
        })
    }

    fn resolve(&mut self, to: &Address) -> Result<SocketAddr, TransportError> {
        if let Some(addr) = self.resolved.get(to) {
            return Ok(*addr);
        }
        let addr = to
            .host_port()
            .to_socket_addrs()
            .map_err(|_| TransportError::BadAddress(to.to_string()))?
            .next()
            .ok_or_else(|| TransportError::BadAddress(to.to_string()))?;
        self.resolved.insert(to.clone(), addr);
        Ok(addr)
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<(), TransportError> {
        if self.nonblocking != nonblocking {
            self.socket.set_nonblocking(nonblocking)?;
            self.nonblocking = nonblocking;
        }
        Ok(())
    }
}

impl Transport for UdpTransport {
    fn local_address(&self) -> &Address {
        &self.address
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Packet>, TransportError> {
        if timeout.is_zero() {
            self.set_nonblocking(true)?;
        } else {
            self.set_nonblocking(false)?;
            self.socket.set_read_timeout(Some(timeout))?;
        }
        match self.socket.recv_from(&mut self.buf) {
            Ok((n, from)) => Ok(Some(Packet {
                from: Address::new(from.to_string()),
                bytes: self.buf[..n].to_vec(),
            })),
            // ICMP port-unreachable from an earlier send surfaces here on
            // some platforms; it is datagram loss, not an endpoint failure.
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock
                        | ErrorKind::TimedOut
                        | ErrorKind::ConnectionRefused
                        | ErrorKind::ConnectionReset
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn send(&mut self, to: &Address, bytes: &[u8]) -> Result<(), TransportError> {
        let target = self.resolve(to)?;
        self.socket.send_to(bytes, target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_roundtrip() {
        let mut a = UdpTransport::bind("127.0.0.1:0").unwrap();
        let mut b = UdpTransport::bind("127.0.0.1:0").unwrap();
        let to = b.local_address().clone();

        a.send(&to, b"/ping\0\0\0").unwrap();
        let packet = b.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
        assert_eq!(packet.bytes, b"/ping\0\0\0");
        assert_eq!(&packet.from, a.local_address());
    }

    #[test]
    fn test_empty_poll_returns_none() {
        let mut a = UdpTransport::bind("127.0.0.1:0").unwrap();
        assert!(a.recv_timeout(Duration::ZERO).unwrap().is_none());
        assert!(a.recv_timeout(Duration::from_millis(5)).unwrap().is_none());
    }

    #[test]
    fn test_bad_address() {
        let mut a = UdpTransport::bind("127.0.0.1:0").unwrap();
        assert!(matches!(
            a.send(&Address::from("not an address"), b""),
            Err(TransportError::BadAddress(_))
        ));
    }
}
