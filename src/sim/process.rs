//! Process: a simulation running on its own worker thread.
//!
//! ```text
//! caller                         worker "dimple-<role>"
//!   │ spawn ──────────────────────► wait for simulation
//!   │ hand over Simulation ───────► initialize()
//!   │ ◄──────────────── ready ───── (or the engine's error)
//!   │                               loop { tick() } until shutdown
//!   │ stop ─────── shutdown flag ─► finish()
//!   │ ◄──────── join: Simulation ── return
//! ```
//!
//! The simulation is moved across only after the thread exists, so a
//! failed spawn leaves it with the caller, who gets a degraded process
//! that ticks synchronously on request.

use super::{Simulation, TickStats};
use crate::engine::Engine;
use crate::error::{EngineError, StartError};
use crate::role::Role;
use crate::transport::Transport;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long `spawn` waits for the engine's `initialize` hook.
const INIT_TIMEOUT: Duration = Duration::from_secs(3);

/// Lifecycle of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LoopState {
    /// Built, nothing running.
    Created = 0,
    /// Worker started, engine initializing.
    Initializing = 1,
    /// Ticking.
    Running = 2,
    /// Shutdown requested, finishing the current tick.
    Stopping = 3,
    /// Worker exited.
    Stopped = 4,
}

impl LoopState {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Created,
            1 => Self::Initializing,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Counters published by the worker after every tick.
#[derive(Debug, Default)]
struct Shared {
    state: AtomicU8,
    ticks: AtomicU64,
    messages: AtomicU64,
    rejected: AtomicU64,
    overruns: AtomicU64,
    last_drained: AtomicU64,
    last_tick_ns: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: LoopState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> LoopState {
        LoopState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn publish(&self, stats: &TickStats) {
        self.ticks.store(stats.ticks, Ordering::Relaxed);
        self.messages.store(stats.messages, Ordering::Relaxed);
        self.rejected.store(stats.rejected, Ordering::Relaxed);
        self.overruns.store(stats.overruns, Ordering::Relaxed);
        self.last_drained.store(stats.last_drained, Ordering::Relaxed);
        let ns = u64::try_from(stats.last_tick.as_nanos()).unwrap_or(u64::MAX);
        self.last_tick_ns.store(ns, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TickStats {
        TickStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            last_drained: self.last_drained.load(Ordering::Relaxed),
            last_tick: Duration::from_nanos(self.last_tick_ns.load(Ordering::Relaxed)),
        }
    }
}

/// A simulation and the thread that runs it.
pub struct Process<E: Engine, T: Transport> {
    role: Role,
    /// Worker thread; yields the simulation back when joined.
    handle: Option<JoinHandle<Option<Simulation<E, T>>>>,
    /// Flag to signal shutdown.
    shutdown: Arc<AtomicBool>,
    shared: Arc<Shared>,
    /// The simulation, when no worker owns it.
    local: Option<Simulation<E, T>>,
}

impl<E: Engine, T: Transport> Process<E, T> {
    /// Start `sim` on a worker thread named `dimple-<role>` and wait for
    /// its engine to initialize.
    ///
    /// If the thread cannot be spawned the process is returned degraded:
    /// [`is_started`](Self::is_started) is false and
    /// [`tick_once`](Self::tick_once) drives it.
    ///
    /// # Errors
    ///
    /// [`StartError::Initialize`] if the engine's `initialize` hook fails,
    /// [`StartError::Timeout`] if it does not finish within 3 seconds,
    /// [`StartError::Spawn`] if the worker exits before taking the
    /// simulation.
    pub fn spawn(sim: Simulation<E, T>) -> Result<Self, StartError> {
        let role = sim.role();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shared = Arc::new(Shared::default());

        let (sim_tx, sim_rx) = bounded::<Simulation<E, T>>(1);
        let (ready_tx, ready_rx) = bounded::<Result<(), EngineError>>(1);

        let spawned = {
            let shutdown = Arc::clone(&shutdown);
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("dimple-{role}"))
                .spawn(move || Self::run_loop(&sim_rx, &ready_tx, &shutdown, &shared))
        };

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                warn!(role = %role, error = %e, "worker thread not started, running degraded");
                return Ok(Self::degraded(sim));
            }
        };
        shared.set_state(LoopState::Initializing);
        if sim_tx.send(sim).is_err() {
            return Err(StartError::Spawn(io::Error::other("worker exited before start")));
        }

        let mut process = Self {
            role,
            handle: Some(handle),
            shutdown,
            shared,
            local: None,
        };
        match ready_rx.recv_timeout(INIT_TIMEOUT) {
            Ok(Ok(())) => {
                info!(role = %role, "process running");
                Ok(process)
            }
            Ok(Err(e)) => {
                process.join();
                Err(StartError::Initialize(e))
            }
            Err(_) => {
                // The worker keeps going until initialize returns; it then
                // sees the flag and exits. Don't block on it.
                process.shutdown.store(true, Ordering::Relaxed);
                process.handle.take();
                Err(StartError::Timeout)
            }
        }
    }

    /// A process with no worker. The caller ticks it with
    /// [`tick_once`](Self::tick_once).
    pub fn degraded(sim: Simulation<E, T>) -> Self {
        Self {
            role: sim.role(),
            handle: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            shared: Arc::new(Shared::default()),
            local: Some(sim),
        }
    }

    fn run_loop(
        sim_rx: &Receiver<Simulation<E, T>>,
        ready_tx: &Sender<Result<(), EngineError>>,
        shutdown: &AtomicBool,
        shared: &Shared,
    ) -> Option<Simulation<E, T>> {
        let mut sim = sim_rx.recv().ok()?;

        if let Err(e) = sim.initialize() {
            warn!(role = %sim.role(), error = %e, "initialize failed");
            let _ = ready_tx.send(Err(e));
            shared.set_state(LoopState::Stopped);
            return Some(sim);
        }
        shared.set_state(LoopState::Running);
        let _ = ready_tx.send(Ok(()));

        while !shutdown.load(Ordering::Relaxed) {
            sim.tick();
            shared.publish(sim.stats());
        }

        shared.set_state(LoopState::Stopping);
        debug!(role = %sim.role(), frames = sim.frame(), "worker stopping");
        sim.finish();
        shared.set_state(LoopState::Stopped);
        Some(sim)
    }

    /// Role of the simulation.
    #[inline]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Whether a worker thread runs the loop.
    #[inline]
    pub const fn is_started(&self) -> bool {
        self.handle.is_some()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        self.shared.state()
    }

    /// Counters as of the last completed tick.
    pub fn stats(&self) -> TickStats {
        match &self.local {
            Some(sim) => *sim.stats(),
            None => self.shared.snapshot(),
        }
    }

    /// Run one tick synchronously. Only a degraded process can; returns
    /// false otherwise.
    pub fn tick_once(&mut self) -> bool {
        match &mut self.local {
            Some(sim) => {
                sim.tick();
                true
            }
            None => false,
        }
    }

    /// The simulation, if no worker owns it.
    pub fn simulation(&mut self) -> Option<&mut Simulation<E, T>> {
        self.local.as_mut()
    }

    /// Signal the worker to stop. Takes effect at the next tick boundary.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stop the worker, wait for it, and take the simulation back.
    ///
    /// A degraded process is finished in place.
    pub fn stop(mut self) -> Option<Simulation<E, T>> {
        if let Some(mut sim) = self.local.take() {
            sim.finish();
            return Some(sim);
        }
        self.join()
    }

    fn join(&mut self) -> Option<Simulation<E, T>> {
        self.shutdown();
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(sim) => sim,
            Err(_) => {
                warn!(role = %self.role, "worker panicked");
                self.shared.set_state(LoopState::Stopped);
                None
            }
        }
    }
}

impl<E: Engine, T: Transport> Drop for Process<E, T> {
    fn drop(&mut self) {
        self.join();
    }
}
