//! Periodic value pushes.
//!
//! The scheduler is driven once per tick with the elapsed duration. Each
//! registration accumulates time and fires when the accumulator reaches its
//! interval. The interval is subtracted rather than the accumulator being
//! zeroed, so jitter does not turn into drift.

use crate::node::{Owner, ValueRef};
use crate::role::Roles;
use std::time::Duration;
use tracing::{debug, trace};

/// Handle to one scheduled push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

/// A registration that came due this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledPush {
    /// Registration that fired.
    pub id: RegistrationId,
    /// Value to snapshot.
    pub target: ValueRef,
    /// Roles to deliver the snapshot to.
    pub roles: Roles,
}

#[derive(Debug)]
struct Registration {
    id: RegistrationId,
    target: ValueRef,
    roles: Roles,
    /// Zero means disabled.
    interval_us: u64,
    accumulated_us: u64,
}

/// Tracks every periodic push registration of one process.
#[derive(Debug, Default)]
pub struct ValueScheduler {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl ValueScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a periodic push of `target` to `roles` every
    /// `interval_ms`. Intervals `<= 0` are recorded but never fire.
    ///
    /// Registrations are independent: scheduling the same value twice
    /// yields two pushes per period.
    pub fn schedule(&mut self, target: ValueRef, interval_ms: i32, roles: Roles) -> RegistrationId {
        let id = RegistrationId(self.next_id);
        self.next_id += 1;
        let interval_us = u64::try_from(interval_ms).unwrap_or(0) * 1000;
        debug!(value = %target, interval_ms, roles = ?roles, "schedule get");
        self.registrations.push(Registration {
            id,
            target,
            roles,
            interval_us,
            accumulated_us: 0,
        });
        id
    }

    /// Like [`schedule`](Self::schedule), but first drops any registration
    /// for the same value and roles. Used for wire-level `get` requests so
    /// that repeating a request changes the interval instead of stacking.
    pub fn reschedule(&mut self, target: ValueRef, interval_ms: i32, roles: Roles) -> RegistrationId {
        self.registrations
            .retain(|r| !(r.target == target && r.roles == roles));
        self.schedule(target, interval_ms, roles)
    }

    /// Remove one registration. Returns whether it existed.
    pub fn cancel(&mut self, id: RegistrationId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        before != self.registrations.len()
    }

    /// Remove every registration on `target`. Returns how many were removed.
    pub fn cancel_value(&mut self, target: &ValueRef) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| &r.target != target);
        before - self.registrations.len()
    }

    /// Remove every registration on values owned by `owner`.
    pub fn cancel_owner(&mut self, owner: &Owner) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| &r.target.owner != owner);
        let removed = before - self.registrations.len();
        if removed > 0 {
            trace!(owner = %owner, removed, "cancelled scheduled gets");
        }
        removed
    }

    /// Advance every registration by `elapsed` and return those that came
    /// due, in registration order. A registration fires once for every
    /// whole interval accumulated, keeping the remainder, so an interval
    /// shorter than the tick still fires at its own rate.
    pub fn on_tick(&mut self, elapsed: Duration) -> Vec<ScheduledPush> {
        let elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let mut due = Vec::new();
        for r in &mut self.registrations {
            if r.interval_us == 0 {
                continue;
            }
            r.accumulated_us = r.accumulated_us.saturating_add(elapsed_us);
            while r.accumulated_us >= r.interval_us {
                r.accumulated_us -= r.interval_us;
                due.push(ScheduledPush {
                    id: r.id,
                    target: r.target.clone(),
                    roles: r.roles,
                });
            }
        }
        due
    }

    /// Number of registrations on `target`.
    pub fn count_for(&self, target: &ValueRef) -> usize {
        self.registrations.iter().filter(|r| &r.target == target).count()
    }

    /// Total number of registrations.
    #[inline]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is scheduled.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
