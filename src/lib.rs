//! # Dimple
//!
//! A mesh of cooperating real-time simulation processes kept in sync by
//! small datagrams.
//!
//! Each process has one role (physics, haptics, visual, interface) and
//! runs its own fixed-rate loop. Processes share a scene by exchanging
//! OSC messages: the interface creates objects and broadcasts the
//! canonical `create`, every role builds its own engine-side handle, and
//! property values flow between roles through on-change forwards and
//! scheduled gets.
//!
//! ## Core Concepts
//!
//! - **Nodes and dispatch**: everything is addressable by path; inbound
//!   messages are routed by exact path and type-checked against a signature
//! - **Values**: typed properties that know where their changes go
//! - **Peers**: selective broadcast by role bitmask
//! - **Tick loop**: drain within the budget, step once, push scheduled values
//!
//! ## Example
//!
//! ```
//! use dimple::{LocalHub, PassiveEngine, ProcessConfig, Role, ShapeKind, ShapeRequest, Simulation};
//!
//! let hub = LocalHub::new(64);
//! let config = ProcessConfig::new(Role::Physics, "physics");
//! let mut sim = Simulation::new(config, PassiveEngine::new(), hub.bind("physics").unwrap()).unwrap();
//!
//! sim.create_shape(ShapeRequest::new(ShapeKind::Sphere, "ball1")).unwrap();
//! assert!(sim.dispatcher().contains("/world/ball1/position"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod node;
pub mod peer;
pub mod protocol;
pub mod role;
pub mod scene;
pub mod sim;
pub mod transport;
pub mod value;

// Re-exports for convenience
pub use config::{PeerConfig, ProcessConfig, PublishConfig};
pub use engine::{Engine, JointBuilder, Mirror, PassiveEngine, ShapeBuilder, StepContext};
pub use error::{ConfigError, CreateError, DecodeError, DispatchError, EngineError, Error, Result, StartError, TransportError};
pub use factory::{EntityKind, JointKind, JointRequest, ShapeKind, ShapeRequest};
pub use node::{Dispatcher, Node, Owner, ValueRef};
pub use peer::{Outbound, Outbox, Peer, PeerRegistry};
pub use protocol::{Arg, Message, Signature, TypeTag};
pub use role::{Role, Roles};
pub use scene::{Constraint, Object, Scene};
pub use sim::{LoopState, Process, Simulation, TickStats};
pub use transport::{Address, LocalHub, LocalTransport, Packet, Transport, UdpTransport};
pub use value::{Property, Value, ValueData, ValueScheduler, Vec3};
