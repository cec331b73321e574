//! Simulation: the per-process actor.
//!
//! A [`Simulation`] owns everything one process knows: the method table,
//! the scene, the root values, the peer list, the value scheduler, the
//! engine and the transport. Nothing else touches that state, so none of
//! it is locked. Each [`tick`](Simulation::tick) drains inbound messages
//! within the tick budget, steps the engine once, then flushes scheduled
//! value pushes.
//!
//! [`Process`] runs a simulation on its own worker thread.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | `handlers` | message dispatch, value set/get, push, world methods |
//! | `entities` | object and constraint creation and teardown |
//! | `tick` | the tick cycle and [`TickStats`] |
//! | `process` | [`Process`], [`LoopState`] |

mod entities;
mod handlers;
mod process;
mod tick;

pub use process::{LoopState, Process};
pub use tick::TickStats;

use crate::config::{ProcessConfig, PublishConfig};
use crate::engine::Engine;
use crate::error::{ConfigError, DispatchError};
use crate::factory::EntityKind;
use crate::node::{Dispatcher, Handler, Node, Owner, ValueRef, WorldMethod};
use crate::peer::{Outbound, Outbox, PeerRegistry};
use crate::protocol::Message;
use crate::role::{Role, Roles};
use crate::scene::{properties, Scene};
use crate::transport::{Address, Transport};
use crate::value::{Property, ValueData, ValueKindTag, ValueScheduler};
use std::time::Duration;
use tracing::info;

/// One simulation process.
pub struct Simulation<E: Engine, T: Transport> {
    role: Role,
    tick: Duration,
    self_timed: bool,
    root: Node,
    creation_audience: Roles,
    publish: Vec<PublishConfig>,
    dispatcher: Dispatcher,
    scene: Scene<E::Body, E::Joint>,
    world: Vec<Property>,
    peers: PeerRegistry,
    scheduler: ValueScheduler,
    outbox: Outbox,
    engine: E,
    transport: T,
    stats: TickStats,
    frame: u64,
    /// Sender of the message being dispatched, if it came off the wire.
    source: Option<Address>,
}

impl<E: Engine, T: Transport> Simulation<E, T> {
    /// Create a simulation from `config`, registering the root methods,
    /// the factories, the root values and the configured peers.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid.
    pub fn new(config: ProcessConfig, engine: E, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;
        let root = Node::root(&config.name);
        let world = properties::world_properties(&root, config.role);

        let mut sim = Self {
            role: config.role,
            tick: config.tick(),
            self_timed: config.self_timed,
            creation_audience: config.creation_audience(),
            publish: config.publish.clone(),
            dispatcher: Dispatcher::new(),
            scene: Scene::new(),
            world,
            peers: PeerRegistry::new(config.throttle),
            scheduler: ValueScheduler::new(),
            outbox: Outbox::new(),
            engine,
            transport,
            stats: TickStats::default(),
            frame: 0,
            source: None,
            root,
        };
        sim.install()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        for peer in &config.peers {
            sim.peers.add(peer.to_peer());
        }

        info!(
            role = %sim.role,
            root = %sim.root,
            address = %sim.transport.local_address(),
            tick = ?sim.tick,
            peers = sim.peers.len(),
            "simulation created"
        );
        Ok(sim)
    }

    fn install(&mut self) -> Result<(), DispatchError> {
        self.dispatcher.attach_destroy(&self.root, Owner::Root)?;
        for method in WorldMethod::ALL {
            self.dispatcher
                .register(&self.root, method.name(), method.signature(), Handler::World(method))?;
        }
        for kind in EntityKind::all() {
            let factory = self.root.child(kind.name(), "factory");
            self.dispatcher
                .register(&factory, "create", kind.signature(), Handler::Create(kind))?;
            self.dispatcher
                .attach_destroy(&factory, Owner::Factory(kind.name()))?;
        }
        register_values(&mut self.dispatcher, &self.root, &Owner::Root, &self.world)
    }

    /// This process's role.
    #[inline]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Nominal tick length.
    #[inline]
    pub const fn tick_period(&self) -> Duration {
        self.tick
    }

    /// Root node.
    #[inline]
    pub const fn root(&self) -> &Node {
        &self.root
    }

    /// Object and constraint registries.
    #[inline]
    pub const fn scene(&self) -> &Scene<E::Body, E::Joint> {
        &self.scene
    }

    /// Peer list.
    #[inline]
    pub const fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    /// Peer list, mutably.
    #[inline]
    pub fn peers_mut(&mut self) -> &mut PeerRegistry {
        &mut self.peers
    }

    /// Value scheduler.
    #[inline]
    pub const fn scheduler(&self) -> &ValueScheduler {
        &self.scheduler
    }

    /// Method table.
    #[inline]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The engine.
    #[inline]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// The engine, mutably.
    #[inline]
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Address peers reach this process at.
    #[inline]
    pub fn local_address(&self) -> &Address {
        self.transport.local_address()
    }

    /// Counters.
    #[inline]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Completed ticks.
    #[inline]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Roles that receive canonical create events.
    #[inline]
    pub const fn creation_audience(&self) -> Roles {
        self.creation_audience
    }

    /// Broadcast `message` to every peer, now.
    ///
    /// Returns the number of peers it was handed to.
    pub fn send(&mut self, throttle: bool, message: Message) -> usize {
        self.send_to_type(Roles::all(), throttle, message)
    }

    /// Broadcast `message` to peers whose roles intersect `roles`, now.
    ///
    /// Returns the number of peers it was handed to.
    pub fn send_to_type(&mut self, roles: Roles, throttle: bool, message: Message) -> usize {
        let mut out = Outbound::to_type(roles, message);
        out.throttle = throttle;
        self.peers.deliver(&mut self.transport, self.tick, &out)
    }

    /// Deliver everything queued in the outbox.
    fn flush(&mut self) {
        for out in self.outbox.drain() {
            self.peers.deliver(&mut self.transport, self.tick, &out);
        }
    }

    /// Current state of a value. `<vector>/magnitude` names the length of
    /// a vector value.
    pub fn value(&self, target: &ValueRef) -> Option<ValueData> {
        let (base, magnitude) = split_magnitude(&target.property);
        let property = self.property(&target.owner, base)?;
        if magnitude {
            property.as_vector().map(|v| ValueData::Scalar(v.magnitude()))
        } else {
            Some(property.data())
        }
    }

    fn property(&self, owner: &Owner, name: &str) -> Option<&Property> {
        match owner {
            Owner::Root => self.world.iter().find(|p| p.name() == name),
            Owner::Object(n) => self.scene.object(n)?.property(name),
            Owner::Constraint(n) => self.scene.constraint(n)?.property(name),
            Owner::Factory(_) => None,
        }
    }

    /// Schedule a periodic push of `target` to `roles`. Returns `None` if
    /// the value does not exist.
    pub fn schedule_get(
        &mut self,
        target: ValueRef,
        interval_ms: i32,
        roles: Roles,
    ) -> Option<crate::value::RegistrationId> {
        let (base, _) = split_magnitude(&target.property);
        self.property(&target.owner, base)?;
        Some(self.scheduler.schedule(target, interval_ms, roles))
    }
}

/// Split `velocity/magnitude` into `("velocity", true)`.
fn split_magnitude(property: &str) -> (&str, bool) {
    property
        .strip_suffix("/magnitude")
        .map_or((property, false), |base| (base, true))
}

/// Register set/get methods for each value under `owner_node`.
fn register_values(
    dispatcher: &mut Dispatcher,
    owner_node: &Node,
    owner: &Owner,
    values: &[Property],
) -> Result<(), DispatchError> {
    for value in values {
        let node = owner_node.child(value.name(), "value");
        let target = ValueRef::new(owner.clone(), value.name());
        dispatcher.register(&node, "", value.signature(), Handler::SetValue(target.clone()))?;
        dispatcher.register(&node, "get", "|i", Handler::GetValue(target.clone()))?;
        if value.kind() == ValueKindTag::Vector {
            let magnitude = node.child("magnitude", "value");
            dispatcher.register(&magnitude, "", "f", Handler::SetMagnitude(target))?;
            dispatcher.register(
                &magnitude,
                "get",
                "|i",
                Handler::GetValue(ValueRef::new(owner.clone(), format!("{}/magnitude", value.name()))),
            )?;
        }
    }
    Ok(())
}
