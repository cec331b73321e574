//! Rate limiting of throttled sends towards slower peers.

use crate::transport::Address;
use std::collections::HashMap;
use std::time::Duration;

/// Per `(peer, path)` send counters.
///
/// A throttled message goes to a peer once every
/// `ceil(peer_tick / own_tick)` attempts; the first attempt always goes out.
#[derive(Debug, Default)]
pub struct Throttle {
    counters: HashMap<(Address, String), u32>,
}

impl Throttle {
    /// Create a throttle with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts per delivery for a peer ticking at `peer_tick`.
    pub fn ratio(own_tick: Duration, peer_tick: Duration) -> u32 {
        let own = own_tick.as_nanos();
        if own == 0 || peer_tick <= own_tick {
            return 1;
        }
        u32::try_from(peer_tick.as_nanos().div_ceil(own)).unwrap_or(u32::MAX)
    }

    /// Count one attempt and report whether it should be delivered.
    pub fn admit(&mut self, peer: &Address, path: &str, own_tick: Duration, peer_tick: Duration) -> bool {
        let ratio = Self::ratio(own_tick, peer_tick);
        if ratio <= 1 {
            return true;
        }
        let count = self
            .counters
            .entry((peer.clone(), path.to_string()))
            .or_insert(0);
        let admit = *count == 0;
        *count = (*count + 1) % ratio;
        admit
    }

    /// Forget all counters for `peer`.
    pub fn forget(&mut self, peer: &Address) {
        self.counters.retain(|(address, _), _| address != peer);
    }

    /// Forget counters for `node_path` and every path below it.
    pub fn forget_path(&mut self, node_path: &str) {
        self.counters.retain(|(_, path), _| !is_under(path, node_path));
    }

    /// Number of `(peer, path)` counters held.
    #[inline]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Whether no counters are held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

fn is_under(path: &str, node_path: &str) -> bool {
    path.strip_prefix(node_path)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
