//! Message dispatch.
//!
//! Resolve a message against the method table, then interpret the
//! [`Handler`] against state the simulation owns.

use super::{split_magnitude, Simulation};
use crate::engine::Engine;
use crate::error::{DispatchError, Error};
use crate::factory::{EntityKind, JointRequest, ShapeRequest};
use crate::node::{Handler, Owner, Routed, ValueRef, WorldMethod};
use crate::peer::{Outbound, Peer};
use crate::protocol::{Arg, Message};
use crate::role::{Role, Roles};
use crate::scene::properties;
use crate::transport::{Address, Packet, Transport};
use crate::value::{ValueData, Vec3};
use tracing::{debug, info, trace, warn};

/// The arguments did not fit the parsed request even though the
/// signature check passed.
fn malformed(msg: &Message, signature: &str) -> DispatchError {
    DispatchError::Arity {
        path: msg.path.clone(),
        expected: signature.to_string(),
        actual: msg.args.len(),
    }
}

impl<E: Engine, T: Transport> Simulation<E, T> {
    /// Decode and dispatch one datagram.
    ///
    /// Failures are logged and counted, never returned: a bad message must
    /// not disturb the tick loop.
    pub fn handle_packet(&mut self, packet: Packet) {
        self.stats.messages += 1;
        let msg = match Message::decode(&packet.bytes) {
            Ok(msg) => msg,
            Err(e) => {
                self.stats.rejected += 1;
                warn!(from = %packet.from, error = %e, "undecodable datagram");
                return;
            }
        };
        if let Err(e) = self.handle_from(&msg, Some(packet.from)) {
            self.stats.rejected += 1;
            match e {
                Error::Dispatch(DispatchError::NoSuchMethod(_)) => {
                    debug!(role = %self.role, error = %e, "message dropped");
                }
                _ => warn!(role = %self.role, message = %msg, error = %e, "message rejected"),
            }
        }
    }

    /// Dispatch a message that did not come off the wire.
    ///
    /// # Errors
    ///
    /// Returns the lookup, signature or creation failure.
    pub fn handle(&mut self, msg: &Message) -> Result<(), Error> {
        self.handle_from(msg, None)
    }

    fn handle_from(&mut self, msg: &Message, from: Option<Address>) -> Result<(), Error> {
        self.source = from;
        let result = self.dispatch(msg);
        self.source = None;
        self.flush();
        result
    }

    fn dispatch(&mut self, msg: &Message) -> Result<(), Error> {
        let Routed { handler, args } = self.dispatcher.resolve(msg)?;
        trace!(role = %self.role, message = %msg, "dispatch");

        match handler {
            Handler::Create(EntityKind::Shape(kind)) => {
                let request =
                    ShapeRequest::from_args(kind, &args).ok_or_else(|| malformed(msg, kind.signature()))?;
                self.create_shape(request)?;
            }
            Handler::Create(EntityKind::Joint(kind)) => {
                let request =
                    JointRequest::from_args(kind, &args).ok_or_else(|| malformed(msg, kind.signature()))?;
                self.create_joint(request)?;
            }
            Handler::Destroy(owner) => self.on_destroy(&owner),
            Handler::SetValue(target) => self.on_set(&target, &args),
            Handler::GetValue(target) => self.on_get(target, &args, msg),
            Handler::SetMagnitude(target) => {
                let length = args.first().and_then(Arg::as_f64).unwrap_or(0.0);
                self.set_magnitude(&target, length);
            }
            Handler::Push(object) => self.on_push(&object, &args, msg),
            Handler::World(method) => self.on_world(method, &args),
        }
        Ok(())
    }

    fn on_destroy(&mut self, owner: &Owner) {
        match owner {
            Owner::Root => {
                self.clear();
            }
            Owner::Factory(kind) => warn!(factory = kind, "factories cannot be destroyed"),
            Owner::Object(name) => {
                self.destroy_object(name);
            }
            Owner::Constraint(name) => {
                self.destroy_constraint(name);
            }
        }
    }

    fn on_set(&mut self, target: &ValueRef, args: &[Arg]) {
        let Some(kind) = self.property(&target.owner, &target.property).map(|p| p.kind()) else {
            warn!(value = %target, "set on a value that no longer exists");
            return;
        };
        match ValueData::from_args(kind, args) {
            Some(data) => {
                self.set_value(target, data);
            }
            None => debug!(value = %target, "set with unusable arguments"),
        }
    }

    /// Store `data` into a value, tell the engine, and queue the change
    /// push if the value forwards. Returns whether the value exists.
    pub fn set_value(&mut self, target: &ValueRef, data: ValueData) -> bool {
        let name = target.property.as_str();
        let out = match &target.owner {
            Owner::Root => {
                let Some(property) = self.world.iter_mut().find(|p| p.name() == name) else {
                    return false;
                };
                let out = property.set_data(data, false);
                self.engine.set_world_property(name, &property.data());
                out
            }
            Owner::Object(object) => {
                let Some(object) = self.scene.object_mut(object) else {
                    return false;
                };
                let (body, props) = object.parts_mut();
                let Some(property) = props.iter_mut().find(|p| p.name() == name) else {
                    return false;
                };
                let out = property.set_data(data, false);
                self.engine.set_object_property(body, name, &property.data());
                out
            }
            Owner::Constraint(constraint) => {
                let Some(constraint) = self.scene.constraint_mut(constraint) else {
                    return false;
                };
                let (joint, props) = constraint.parts_mut();
                let Some(property) = props.iter_mut().find(|p| p.name() == name) else {
                    return false;
                };
                let out = property.set_data(data, false);
                self.engine.set_joint_property(joint, name, &property.data());
                out
            }
            Owner::Factory(_) => return false,
        };
        if let Some(out) = out {
            self.outbox.push(out);
        }
        true
    }

    /// Rescale a vector value to `length`, keeping its direction. A zero
    /// vector stays zero.
    pub fn set_magnitude(&mut self, target: &ValueRef, length: f64) -> bool {
        let Some(current) = self
            .property(&target.owner, &target.property)
            .and_then(|p| p.as_vector())
            .map(|v| *v.get())
        else {
            return false;
        };
        self.set_value(target, ValueData::Vector(current.with_length(length)))
    }

    fn on_get(&mut self, target: ValueRef, args: &[Arg], msg: &Message) {
        if self.role == Role::Interface {
            let authority = properties::authority(&target.property);
            trace!(value = %target, authority = %authority, "get forwarded");
            self.outbox
                .push(Outbound::to_type(authority.bit(), msg.clone()));
            return;
        }

        match args.first().and_then(Arg::as_i32) {
            None => {
                if let Some(reply) = self.snapshot(&target) {
                    self.outbox.push(Outbound::to_type(Roles::CLIENT, reply));
                }
            }
            Some(0) => {
                let cancelled = self.scheduler.cancel_value(&target);
                debug!(value = %target, cancelled, "get cancelled");
            }
            Some(interval) if interval > 0 => {
                self.scheduler.reschedule(target, interval, Roles::CLIENT);
            }
            Some(interval) => debug!(value = %target, interval, "disabled get ignored"),
        }
    }

    /// Refresh a value from the engine and build the message carrying it.
    pub(super) fn snapshot(&mut self, target: &ValueRef) -> Option<Message> {
        let (base, magnitude) = split_magnitude(&target.property);
        self.refresh(&target.owner, base);
        let property = self.property(&target.owner, base)?;
        if magnitude {
            property.as_vector().map(|v| v.magnitude_snapshot())
        } else {
            Some(property.snapshot())
        }
    }

    fn refresh(&mut self, owner: &Owner, name: &str) {
        let fresh = match owner {
            Owner::Object(object) => self
                .scene
                .object(object)
                .and_then(|o| self.engine.object_property(o.body(), name)),
            Owner::Constraint(constraint) => self
                .scene
                .constraint(constraint)
                .and_then(|c| self.engine.joint_property(c.joint(), name)),
            Owner::Root | Owner::Factory(_) => None,
        };
        let Some(fresh) = fresh else { return };
        let property = match owner {
            Owner::Object(object) => self.scene.object_mut(object).and_then(|o| o.property_mut(name)),
            Owner::Constraint(constraint) => self
                .scene
                .constraint_mut(constraint)
                .and_then(|c| c.property_mut(name)),
            Owner::Root | Owner::Factory(_) => None,
        };
        if let Some(property) = property {
            property.set_data(fresh, true);
        }
    }

    fn on_push(&mut self, object: &str, args: &[Arg], msg: &Message) {
        if self.role != Role::Physics {
            self.outbox
                .push(Outbound::to_type(Roles::PHYSICS, msg.clone()));
            return;
        }
        let at = |i: usize| args.get(i).and_then(Arg::as_f64).unwrap_or(0.0);
        let force = Vec3::new(at(0), at(1), at(2));
        let offset = Vec3::new(at(3), at(4), at(5));
        match self.scene.object_mut(object) {
            Some(o) => self.engine.push(o.body_mut(), force, offset),
            None => warn!(object, "push on an object that no longer exists"),
        }
    }

    fn on_world(&mut self, method: WorldMethod, args: &[Arg]) {
        let text = |i: usize| args.get(i).and_then(Arg::as_str);
        match method {
            WorldMethod::Clear => {
                self.clear();
            }
            WorldMethod::AddReceiver => {
                let Some(source) = self.source.clone() else {
                    warn!("add_receiver without a source address");
                    return;
                };
                self.add_receiver(text(0), source);
            }
            WorldMethod::AddReceiverUrl => {
                if let Some(url) = text(1) {
                    self.add_receiver(text(0), Address::new(url));
                }
            }
            WorldMethod::RemoveReceiver => match self.source.clone() {
                Some(source) => {
                    self.peers.remove(&source);
                }
                None => warn!("remove_receiver without a source address"),
            },
        }
    }

    fn add_receiver(&mut self, role: Option<&str>, address: Address) {
        match role.map(str::parse::<Role>) {
            Some(Ok(role)) => {
                if self.peers.add(Peer::new(address.clone(), role.bit(), role.default_tick())) {
                    info!(role = %role, address = %address, "receiver registered");
                }
            }
            Some(Err(e)) => warn!(error = %e, address = %address, "add_receiver rejected"),
            None => warn!(address = %address, "add_receiver without a role"),
        }
    }

    /// Tell every peer this process is leaving. The interface has no
    /// entry in anyone's registry and stays silent.
    pub fn announce_departure(&mut self) {
        if self.role == Role::Interface {
            return;
        }
        let msg = Message::new(self.root.method_path(WorldMethod::RemoveReceiver.name()))
            .arg(self.role.as_str());
        self.send(false, msg);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ProcessConfig;
    use crate::engine::PassiveEngine;
    use crate::factory::{ShapeKind, ShapeRequest};
    use crate::node::{Owner, ValueRef};
    use crate::protocol::{Arg, Message};
    use crate::role::Role;
    use crate::sim::Simulation;
    use crate::transport::{Address, LocalHub, LocalTransport, Transport};
    use crate::value::{ValueData, Vec3};
    use std::time::Duration;

    fn sim(hub: &LocalHub, role: Role, peers: &[(Role, &str)]) -> Simulation<PassiveEngine, LocalTransport> {
        let mut config = ProcessConfig::new(role, role.as_str());
        for (peer_role, addr) in peers {
            config = config.with_peer(*peer_role, *addr);
        }
        Simulation::new(config, PassiveEngine::new(), hub.bind(role.as_str()).unwrap()).unwrap()
    }

    fn drain(t: &mut LocalTransport) -> Vec<Message> {
        let mut out = Vec::new();
        while let Some(p) = t.recv_timeout(Duration::ZERO).unwrap() {
            out.push(Message::decode(&p.bytes).unwrap());
        }
        out
    }

    #[test]
    fn test_interface_set_forwards_everywhere() {
        let hub = LocalHub::new(64);
        let mut visual = hub.bind("visual").unwrap();
        let mut ui = sim(&hub, Role::Interface, &[(Role::Visual, "visual")]);
        ui.create_shape(ShapeRequest::new(ShapeKind::Sphere, "ball1")).unwrap();
        drain(&mut visual);

        ui.handle(&Message::new("/world/ball1/color").arg(1.0f32).arg(0.0f32).arg(0.0f32))
            .unwrap();
        let got = drain(&mut visual);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path, "/world/ball1/color");
    }

    #[test]
    fn test_physics_set_stays_local_and_reaches_engine() {
        let hub = LocalHub::new(64);
        let mut visual = hub.bind("visual").unwrap();
        let mut physics = sim(&hub, Role::Physics, &[(Role::Visual, "visual")]);
        physics.create_shape(ShapeRequest::new(ShapeKind::Sphere, "ball1")).unwrap();
        drain(&mut visual);

        physics
            .handle(&Message::new("/world/ball1/mass").arg(2.5f32))
            .unwrap();
        assert!(drain(&mut visual).is_empty());
        let body = physics.scene().object("ball1").unwrap().body();
        assert_eq!(body.values.get("mass"), Some(&ValueData::Scalar(2.5)));
    }

    #[test]
    fn test_interface_get_forwarded_to_authority() {
        let hub = LocalHub::new(64);
        let mut physics = hub.bind("physics").unwrap();
        let mut visual = hub.bind("visual").unwrap();
        let mut ui = sim(&hub, Role::Interface, &[(Role::Physics, "physics"), (Role::Visual, "visual")]);
        ui.create_shape(ShapeRequest::new(ShapeKind::Sphere, "ball1")).unwrap();
        drain(&mut physics);
        drain(&mut visual);

        ui.handle(&Message::new("/world/ball1/position/get").arg(10)).unwrap();
        ui.handle(&Message::new("/world/ball1/color/get")).unwrap();
        let to_physics = drain(&mut physics);
        let to_visual = drain(&mut visual);
        assert_eq!(to_physics.len(), 1);
        assert_eq!(to_physics[0].args, vec![Arg::Int(10)]);
        assert_eq!(to_visual.len(), 1);
        assert_eq!(to_visual[0].path, "/world/ball1/color/get");
    }

    #[test]
    fn test_get_interval_schedules_and_zero_cancels() {
        let hub = LocalHub::new(64);
        let mut physics = sim(&hub, Role::Physics, &[]);
        physics.create_shape(ShapeRequest::new(ShapeKind::Sphere, "ball1")).unwrap();
        let target = ValueRef::new(Owner::Object("ball1".into()), "position");

        physics.handle(&Message::new("/world/ball1/position/get").arg(10)).unwrap();
        physics.handle(&Message::new("/world/ball1/position/get").arg(20)).unwrap();
        assert_eq!(physics.scheduler().count_for(&target), 1);

        physics.handle(&Message::new("/world/ball1/position/get").arg(0)).unwrap();
        assert_eq!(physics.scheduler().count_for(&target), 0);
    }

    #[test]
    fn test_one_shot_get_replies_to_clients() {
        let hub = LocalHub::new(64);
        let mut client = hub.bind("client").unwrap();
        let mut physics = sim(&hub, Role::Physics, &[(Role::Client, "client")]);
        physics
            .create_shape(ShapeRequest::new(ShapeKind::Sphere, "ball1").at(Vec3::new(3.0, 4.0, 0.0)))
            .unwrap();

        physics.handle(&Message::new("/world/ball1/position/magnitude/get")).unwrap();
        let got = drain(&mut client);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path, "/world/ball1/position/magnitude");
        assert_eq!(got[0].args[0].as_f64(), Some(5.0));
    }

    #[test]
    fn test_magnitude_rescales() {
        let hub = LocalHub::new(64);
        let mut physics = sim(&hub, Role::Physics, &[]);
        physics
            .create_shape(ShapeRequest::new(ShapeKind::Sphere, "ball1").at(Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();
        physics.handle(&Message::new("/world/ball1/position/magnitude").arg(5.0f32)).unwrap();
        let target = ValueRef::new(Owner::Object("ball1".into()), "position");
        assert_eq!(physics.value(&target), Some(ValueData::Vector(Vec3::new(0.0, 5.0, 0.0))));
    }

    #[test]
    fn test_push_applied_on_physics_forwarded_elsewhere() {
        let hub = LocalHub::new(64);
        let mut physics_inbox = hub.bind("physics").unwrap();
        let mut haptics = sim(&hub, Role::Haptics, &[(Role::Physics, "physics")]);
        haptics.create_shape(ShapeRequest::new(ShapeKind::Sphere, "ball1")).unwrap();
        let push = Message::new("/world/ball1/push")
            .arg(1.0f32)
            .arg(0.0f32)
            .arg(0.0f32)
            .arg(0.0f32)
            .arg(0.0f32)
            .arg(0.5f32);
        haptics.handle(&push).unwrap();
        assert_eq!(drain(&mut physics_inbox).len(), 1);

        let other = LocalHub::new(64);
        let mut physics = sim(&other, Role::Physics, &[]);
        physics.create_shape(ShapeRequest::new(ShapeKind::Sphere, "ball1")).unwrap();
        physics.handle(&push).unwrap();
        let impulses = &physics.scene().object("ball1").unwrap().body().impulses;
        assert_eq!(impulses, &[(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.5))]);
    }

    #[test]
    fn test_add_and_remove_receiver() {
        let hub = LocalHub::new(64);
        let mut physics = sim(&hub, Role::Physics, &[]);
        physics
            .handle(&Message::new("/world/add_receiver_url").arg("visual").arg("127.0.0.1:9"))
            .unwrap();
        physics
            .handle(&Message::new("/world/add_receiver_url").arg("visual").arg("127.0.0.1:9"))
            .unwrap();
        assert_eq!(physics.peers().len(), 1);

        physics
            .handle(&Message::new("/world/add_receiver_url").arg("audio").arg("x"))
            .unwrap();
        assert_eq!(physics.peers().len(), 1);

        // No source address for in-process calls.
        physics.handle(&Message::new("/world/remove_receiver").arg("visual")).unwrap();
        assert_eq!(physics.peers().len(), 1);
    }

    #[test]
    fn test_unknown_path_counts_as_rejected() {
        let hub = LocalHub::new(64);
        let mut sender = hub.bind("sender").unwrap();
        let mut physics = sim(&hub, Role::Physics, &[]);
        sender
            .send(&Address::new("physics"), &Message::new("/world/nothing").encode())
            .unwrap();
        sender.send(&Address::new("physics"), b"garbage").unwrap();
        physics.tick();
        assert_eq!(physics.stats().messages, 2);
        assert_eq!(physics.stats().rejected, 2);
    }
}
