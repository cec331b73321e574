//! Peers and broadcast routing.
//!
//! A [`PeerRegistry`] is the per-process list of processes that may receive
//! broadcasts. Entries are snapshots taken at registration time. Delivery
//! serializes each message once and sends the same bytes to every matching
//! peer, fire-and-forget.

mod outbox;
mod throttle;

pub use outbox::{Outbound, Outbox};
pub use throttle::Throttle;

use crate::protocol::codec;
use crate::role::Roles;
use crate::transport::{Address, Transport};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Snapshot of another process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Where to send.
    pub address: Address,
    /// The peer's tick length at registration time.
    pub tick: Duration,
    /// The peer's role bits.
    pub roles: Roles,
}

impl Peer {
    /// Create a peer descriptor.
    pub fn new(address: impl Into<Address>, roles: Roles, tick: Duration) -> Self {
        Self {
            address: address.into(),
            tick,
            roles,
        }
    }
}

/// Per-process peer list.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: Vec<Peer>,
    throttle: Throttle,
    throttling: bool,
    scratch: Vec<u8>,
}

impl PeerRegistry {
    /// Create an empty registry. `throttling` enables the throttle policy
    /// for sends that ask for it.
    pub fn new(throttling: bool) -> Self {
        Self {
            throttling,
            ..Self::default()
        }
    }

    /// Register a peer. A second registration of the same address is
    /// ignored. Returns whether the peer was added.
    pub fn add(&mut self, peer: Peer) -> bool {
        if self.peers.iter().any(|p| p.address == peer.address) {
            debug!(address = %peer.address, "peer already registered");
            return false;
        }
        info!(address = %peer.address, roles = ?peer.roles, tick = ?peer.tick, "peer added");
        self.peers.push(peer);
        true
    }

    /// Unregister the peer at `address`. Returns whether it was present.
    pub fn remove(&mut self, address: &Address) -> bool {
        let before = self.peers.len();
        self.peers.retain(|p| &p.address != address);
        let removed = before != self.peers.len();
        if removed {
            self.throttle.forget(address);
            info!(address = %address, "peer removed");
        }
        removed
    }

    /// Drop throttle history for messages at or below `node_path`, once
    /// the node is gone.
    pub fn forget_path(&mut self, node_path: &str) {
        self.throttle.forget_path(node_path);
    }

    /// Number of `(peer, path)` throttle counters held.
    #[inline]
    pub fn throttle_entries(&self) -> usize {
        self.throttle.len()
    }

    /// Look up a peer by address.
    pub fn get(&self, address: &Address) -> Option<&Peer> {
        self.peers.iter().find(|p| &p.address == address)
    }

    /// All peers, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    /// Peers whose roles intersect `roles`.
    pub fn matching(&self, roles: Roles) -> impl Iterator<Item = &Peer> {
        self.peers.iter().filter(move |p| p.roles.intersects(roles))
    }

    /// Number of peers.
    #[inline]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peers are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Deliver `out` to every matching peer over `transport`.
    ///
    /// `own_tick` is the sender's tick length, used by the throttle
    /// policy. Send failures are logged and otherwise ignored. Returns the
    /// number of peers the datagram was handed to.
    pub fn deliver<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        own_tick: Duration,
        out: &Outbound,
    ) -> usize {
        self.scratch.clear();
        codec::encode_into(&out.message, &mut self.scratch);

        let mut sent = 0;
        for peer in self.peers.iter().filter(|p| p.roles.intersects(out.roles)) {
            if out.throttle
                && self.throttling
                && !self
                    .throttle
                    .admit(&peer.address, &out.message.path, own_tick, peer.tick)
            {
                continue;
            }
            match transport.send(&peer.address, &self.scratch) {
                Ok(()) => sent += 1,
                Err(e) => debug!(to = %peer.address, error = %e, "send failed"),
            }
        }
        trace!(path = %out.message.path, roles = ?out.roles, sent, "deliver");
        sent
    }
}
