//! The tick cycle.
//!
//! ```text
//! ┌────────────────────── tick budget ──────────────────────┐
//! │ drain transport ──► engine.step (once) ──► scheduled gets │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Draining stops when the transport is empty or the budget is spent.
//! A self-timed process blocks on the transport for whatever remains of
//! the tick, so an idle loop sleeps instead of spinning; a process whose
//! engine paces itself only polls.

use super::Simulation;
use crate::engine::{Engine, StepContext};
use crate::peer::Outbound;
use crate::transport::Transport;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Completed ticks.
    pub ticks: u64,
    /// Datagrams received.
    pub messages: u64,
    /// Datagrams dropped: undecodable, unknown path, bad arguments,
    /// failed creation.
    pub rejected: u64,
    /// Ticks whose drain phase ran out of budget with messages possibly
    /// still queued.
    pub overruns: u64,
    /// Messages handled in the last tick.
    pub last_drained: u64,
    /// Wall time of the last tick.
    pub last_tick: Duration,
}

impl<E: Engine, T: Transport> Simulation<E, T> {
    /// Run the engine's `initialize` hook.
    ///
    /// # Errors
    ///
    /// The engine's failure.
    pub fn initialize(&mut self) -> Result<(), crate::error::EngineError> {
        self.engine.initialize()
    }

    /// Run one tick: drain messages within the budget, step the engine
    /// exactly once, then push scheduled values.
    pub fn tick(&mut self) {
        let start = Instant::now();
        let drained = self.drain(start);

        self.engine.step(StepContext {
            scene: &mut self.scene,
            outbox: &mut self.outbox,
            role: self.role,
            tick: self.tick,
            frame: self.frame,
        });
        self.flush();

        for push in self.scheduler.on_tick(self.tick) {
            match self.snapshot(&push.target) {
                Some(msg) => self.outbox.push(Outbound::to_type(push.roles, msg)),
                None => trace!(value = %push.target, "scheduled value vanished"),
            }
        }
        self.flush();

        self.frame += 1;
        self.stats.ticks += 1;
        self.stats.last_drained = drained;
        self.stats.last_tick = start.elapsed();
    }

    fn drain(&mut self, start: Instant) -> u64 {
        let mut drained = 0;
        loop {
            let remaining = self.tick.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                self.stats.overruns += 1;
                trace!(role = %self.role, drained, "tick budget spent");
                break;
            }
            let wait = if self.self_timed { remaining } else { Duration::ZERO };
            match self.transport.recv_timeout(wait) {
                Ok(Some(packet)) => {
                    drained += 1;
                    self.handle_packet(packet);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(role = %self.role, error = %e, "transport receive failed");
                    break;
                }
            }
        }
        drained
    }

    /// Tear down: announce departure, then run the engine's `shutdown`
    /// hook.
    pub fn finish(&mut self) {
        self.announce_departure();
        self.engine.shutdown();
    }
}
