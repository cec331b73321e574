//! Outbound messages waiting for delivery.

use crate::protocol::Message;
use crate::role::Roles;

/// A message plus the role filter it is addressed to.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    /// Peers whose roles intersect this filter receive the message.
    pub roles: Roles,
    /// Rate-limit per the throttle policy.
    pub throttle: bool,
    /// The message.
    pub message: Message,
}

impl Outbound {
    /// Address every peer.
    pub fn to_all(message: Message) -> Self {
        Self::to_type(Roles::all(), message)
    }

    /// Address peers matching `roles`.
    pub fn to_type(roles: Roles, message: Message) -> Self {
        Self {
            roles,
            throttle: false,
            message,
        }
    }

    /// Mark for throttling.
    #[must_use]
    pub fn throttled(mut self) -> Self {
        self.throttle = true;
        self
    }
}

/// Messages produced during a tick, flushed by the simulation.
///
/// Engines get one through their step context so they can publish state
/// without touching the transport.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: Vec<Outbound>,
}

impl Outbox {
    /// Create an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for every peer.
    pub fn send(&mut self, throttle: bool, message: Message) {
        self.send_to_type(Roles::all(), throttle, message);
    }

    /// Queue a message for peers matching `roles`.
    pub fn send_to_type(&mut self, roles: Roles, throttle: bool, message: Message) {
        self.queue.push(Outbound {
            roles,
            throttle,
            message,
        });
    }

    /// Queue a prepared outbound message.
    #[inline]
    pub fn push(&mut self, outbound: Outbound) {
        self.queue.push(outbound);
    }

    /// Take everything queued so far.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Outbound> {
        self.queue.drain(..)
    }

    /// Number of queued messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
