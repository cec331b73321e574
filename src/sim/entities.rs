//! Object and constraint lifecycle.
//!
//! Creation validates, asks the engine for a handle, registers the
//! entity's methods, inserts it into the scene and, if this process has a
//! creation audience, broadcasts the canonical `create`. A failure at any
//! step leaves nothing behind. Destruction reverses every step.

use super::{register_values, Simulation};
use crate::engine::Engine;
use crate::error::{CreateError, DispatchError};
use crate::factory::{validate_name, JointRequest, ShapeRequest};
use crate::node::{Handler, Node, Owner, ValueRef};
use crate::peer::Outbound;
use crate::protocol::Message;
use crate::scene::{properties, Constraint, Object};
use crate::transport::Transport;
use crate::value::{Property, ValueData};
use tracing::{debug, info, warn};

impl<E: Engine, T: Transport> Simulation<E, T> {
    /// Create an object.
    ///
    /// # Errors
    ///
    /// [`CreateError::InvalidName`] or [`CreateError::DuplicateName`] for
    /// a bad name, [`CreateError::Engine`] if the engine refuses.
    pub fn create_shape(&mut self, request: ShapeRequest) -> Result<(), CreateError> {
        validate_name(&request.name)?;
        if self.scene.contains(&request.name) {
            return Err(CreateError::DuplicateName(request.name));
        }

        let body = self.engine.build_shape(&request)?;
        let node = self.root.child(&request.name, request.kind.name());
        let owner = Owner::Object(request.name.clone());
        let mut props = properties::object_properties(&node, request.kind, self.role);
        if let Some(position) = props.iter_mut().find(|p| p.name() == "position") {
            position.set_data(ValueData::Vector(request.position), true);
        }
        self.apply_publish_intervals(&mut props);

        if let Err(e) = self.register_entity(&node, &owner, &props, true) {
            self.dispatcher.unregister_node(node.path());
            self.engine.release_body(body);
            warn!(name = %request.name, error = %e, "object registration failed");
            return Err(CreateError::DuplicateName(request.name));
        }

        let published = published(&owner, &props);
        self.scene
            .insert_object(Object::new(node, request.kind, body, props));
        self.schedule_published(published);

        info!(role = %self.role, name = %request.name, kind = %request.kind, "object created");
        self.announce(request.to_message(self.root.path()));
        Ok(())
    }

    /// Create a constraint.
    ///
    /// # Errors
    ///
    /// As [`create_shape`](Self::create_shape), plus the endpoint
    /// resolution failures of [`JointRequest::resolve`].
    pub fn create_joint(&mut self, request: JointRequest) -> Result<(), CreateError> {
        validate_name(&request.name)?;
        if self.scene.contains(&request.name) {
            return Err(CreateError::DuplicateName(request.name));
        }

        let endpoints = request.resolve(|name| self.scene.contains_object(name))?;
        let joint = {
            let Some(object1) = self.scene.object(&endpoints.object1) else {
                return Err(CreateError::UnresolvedEndpoint {
                    name: request.name,
                    endpoint: endpoints.object1,
                });
            };
            let object2 = endpoints
                .object2
                .as_deref()
                .and_then(|name| self.scene.object(name));
            self.engine
                .build_joint(&request, object1.body(), object2.map(Object::body))?
        };

        let node = self.root.child(&request.name, request.kind.name());
        let owner = Owner::Constraint(request.name.clone());
        let props = properties::joint_properties(&node, request.kind, self.role);

        if let Err(e) = self.register_entity(&node, &owner, &props, false) {
            self.dispatcher.unregister_node(node.path());
            self.engine.release_joint(joint);
            warn!(name = %request.name, error = %e, "constraint registration failed");
            return Err(CreateError::DuplicateName(request.name));
        }

        let canonical = request.to_message(self.root.path(), &endpoints);
        self.scene.insert_constraint(Constraint::new(
            node,
            request.kind,
            endpoints.object1,
            endpoints.object2,
            joint,
            props,
        ));

        info!(role = %self.role, name = %request.name, kind = %request.kind, "constraint created");
        self.announce(canonical);
        Ok(())
    }

    fn register_entity(
        &mut self,
        node: &Node,
        owner: &Owner,
        props: &[Property],
        pushable: bool,
    ) -> Result<(), DispatchError> {
        self.dispatcher.attach_destroy(node, owner.clone())?;
        if pushable {
            self.dispatcher
                .register(node, "push", "ffffff", Handler::Push(node.name().to_string()))?;
        }
        register_values(&mut self.dispatcher, node, owner, props)
    }

    fn apply_publish_intervals(&self, props: &mut [Property]) {
        for publish in &self.publish {
            if let Some(p) = props.iter_mut().find(|p| p.name() == publish.property) {
                p.set_default_interval(publish.interval_ms);
            }
        }
    }

    fn schedule_published(&mut self, published: Vec<(ValueRef, i32)>) {
        for (target, interval) in published {
            let roles = self
                .publish
                .iter()
                .find(|p| p.property == target.property)
                .map(|p| p.roles.iter().copied().collect())
                .unwrap_or_default();
            self.scheduler.schedule(target, interval, roles);
        }
    }

    /// Destroy an object and every constraint attached to it. Returns
    /// whether the object existed.
    pub fn destroy_object(&mut self, name: &str) -> bool {
        let Some(removed) = self.scene.remove_object(name) else {
            debug!(name, "destroy of unknown object");
            return false;
        };
        for constraint in removed.constraints {
            self.release_constraint(constraint);
        }
        let path = removed.object.node().path().to_string();
        self.forget_node(&path);
        self.scheduler.cancel_owner(&Owner::Object(name.to_string()));
        self.engine.release_body(removed.object.into_body());

        info!(role = %self.role, name, "object destroyed");
        self.broadcast_removal(Message::new(format!("{path}/destroy")));
        true
    }

    /// Destroy a constraint. Returns whether it existed.
    pub fn destroy_constraint(&mut self, name: &str) -> bool {
        let Some(constraint) = self.scene.remove_constraint(name) else {
            debug!(name, "destroy of unknown constraint");
            return false;
        };
        let path = constraint.node().path().to_string();
        self.release_constraint(constraint);

        info!(role = %self.role, name, "constraint destroyed");
        self.broadcast_removal(Message::new(format!("{path}/destroy")));
        true
    }

    fn release_constraint(&mut self, constraint: Constraint<E::Joint>) {
        self.forget_node(constraint.node().path());
        self.scheduler
            .cancel_owner(&Owner::Constraint(constraint.name().to_string()));
        self.engine.release_joint(constraint.into_joint());
    }

    /// Destroy every object and constraint. Returns the number of objects
    /// removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.scene.clear();
        let count = removed.len();
        for entry in removed {
            for constraint in entry.constraints {
                self.release_constraint(constraint);
            }
            self.forget_node(entry.object.node().path());
            self.scheduler
                .cancel_owner(&Owner::Object(entry.object.name().to_string()));
            self.engine.release_body(entry.object.into_body());
        }

        info!(role = %self.role, objects = count, "scene cleared");
        // A clear from a peer is passed on only if it removed something.
        if count > 0 || self.source.is_none() {
            self.broadcast_removal(Message::new(self.root.method_path("clear")));
        }
        count
    }

    fn forget_node(&mut self, path: &str) {
        self.dispatcher.unregister_node(path);
        self.peers.forget_path(path);
    }

    /// Queue a destroy or clear event for every peer.
    fn broadcast_removal(&mut self, msg: Message) {
        self.outbox.push(Outbound::to_all(msg));
    }

    /// Queue `msg` for the creation audience, if there is one.
    fn announce(&mut self, msg: Message) {
        if !self.creation_audience.is_empty() {
            self.outbox
                .push(Outbound::to_type(self.creation_audience, msg));
        }
    }
}

/// Values of a new entity with a positive default interval.
fn published(owner: &Owner, props: &[Property]) -> Vec<(ValueRef, i32)> {
    props
        .iter()
        .filter(|p| p.default_interval_ms() > 0)
        .map(|p| (ValueRef::new(owner.clone(), p.name()), p.default_interval_ms()))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::config::{ProcessConfig, PublishConfig};
    use crate::engine::PassiveEngine;
    use crate::error::CreateError;
    use crate::factory::{JointKind, JointRequest, ShapeKind, ShapeRequest, WORLD};
    use crate::node::{Owner, ValueRef};
    use crate::protocol::Message;
    use crate::role::Role;
    use crate::sim::Simulation;
    use crate::transport::{Address, LocalHub, LocalTransport, Transport};
    use std::time::Duration;

    fn physics(hub: &LocalHub) -> Simulation<PassiveEngine, LocalTransport> {
        let config = ProcessConfig::new(Role::Physics, "physics");
        Simulation::new(config, PassiveEngine::new(), hub.bind("physics").unwrap()).unwrap()
    }

    fn sphere(name: &str) -> ShapeRequest {
        ShapeRequest::new(ShapeKind::Sphere, name)
    }

    #[test]
    fn test_create_registers_methods() {
        let hub = LocalHub::new(16);
        let mut sim = physics(&hub);
        sim.create_shape(sphere("ball1")).unwrap();
        for path in [
            "/world/ball1/destroy",
            "/world/ball1/push",
            "/world/ball1/position",
            "/world/ball1/position/get",
            "/world/ball1/velocity/magnitude",
            "/world/ball1/radius/get",
            "/world/ball1/friction/static",
        ] {
            assert!(sim.dispatcher().contains(path), "{path}");
        }
    }

    #[test]
    fn test_duplicate_and_reserved_names() {
        let hub = LocalHub::new(16);
        let mut sim = physics(&hub);
        sim.create_shape(sphere("ball1")).unwrap();
        assert_eq!(
            sim.create_shape(sphere("ball1")),
            Err(CreateError::DuplicateName("ball1".into()))
        );
        assert!(matches!(sim.create_shape(sphere("sphere")), Err(CreateError::InvalidName(_))));
        assert!(matches!(sim.create_shape(sphere("a/b")), Err(CreateError::InvalidName(_))));
        assert_eq!(sim.engine().built(), 1);
    }

    #[test]
    fn test_destroy_cascades_and_unregisters() {
        let hub = LocalHub::new(16);
        let mut sim = physics(&hub);
        sim.create_shape(sphere("a")).unwrap();
        sim.create_shape(sphere("b")).unwrap();
        sim.create_joint(JointRequest::new(JointKind::Ball, "ab", "a", "b")).unwrap();
        sim.create_joint(JointRequest::new(JointKind::Hinge, "aw", WORLD, "a")).unwrap();
        assert_eq!(sim.scene().constraint("aw").unwrap().object1(), "a");

        sim.handle(&Message::new("/world/a/destroy")).unwrap();
        assert_eq!(sim.scene().object_count(), 1);
        assert_eq!(sim.scene().constraint_count(), 0);
        assert!(!sim.dispatcher().contains("/world/a/position"));
        assert!(!sim.dispatcher().contains("/world/ab/destroy"));
        assert!(!sim.dispatcher().contains("/world/aw/torque"));
        assert!(sim.dispatcher().contains("/world/b/position"));

        // The name is free again.
        sim.create_shape(sphere("a")).unwrap();
    }

    #[test]
    fn test_joint_failures_leave_nothing() {
        let hub = LocalHub::new(16);
        let mut sim = physics(&hub);
        sim.create_shape(sphere("a")).unwrap();
        let before = sim.dispatcher().len();

        assert!(sim
            .create_joint(JointRequest::new(JointKind::Hinge, "h", WORLD, WORLD))
            .is_err());
        assert!(matches!(
            sim.create_joint(JointRequest::new(JointKind::Ball, "s", "a", "a")),
            Err(CreateError::SelfReference { .. })
        ));
        assert!(matches!(
            sim.create_joint(JointRequest::new(JointKind::Hinge2, "h2", "a", WORLD)),
            Err(CreateError::WorldNotAllowed(_))
        ));
        assert!(matches!(
            sim.create_joint(JointRequest::new(JointKind::Ball, "g", "a", "ghost")),
            Err(CreateError::UnresolvedEndpoint { .. })
        ));
        assert_eq!(sim.dispatcher().len(), before);
        assert_eq!(sim.scene().constraint_count(), 0);
    }

    #[test]
    fn test_clear_cancels_schedules() {
        let hub = LocalHub::new(16);
        let mut sim = physics(&hub);
        sim.create_shape(sphere("a")).unwrap();
        let target = ValueRef::new(Owner::Object("a".into()), "position");
        sim.schedule_get(target.clone(), 10, crate::role::Roles::CLIENT).unwrap();
        assert_eq!(sim.clear(), 1);
        assert_eq!(sim.scheduler().count_for(&target), 0);
        assert!(sim.scene().is_empty());
    }

    #[test]
    fn test_removals_reach_every_peer() {
        let hub = LocalHub::new(16);
        let mut visual = hub.bind("visual").unwrap();
        let config = ProcessConfig::new(Role::Physics, "physics")
            .with_peer(Role::Visual, "visual")
            .with_self_timed(false);
        let mut sim = Simulation::new(config, PassiveEngine::new(), hub.bind("physics").unwrap()).unwrap();
        let inbox = |t: &mut LocalTransport| {
            let mut paths = Vec::new();
            while let Some(p) = t.recv_timeout(Duration::ZERO).unwrap() {
                paths.push(Message::decode(&p.bytes).unwrap().path);
            }
            paths
        };

        sim.create_shape(sphere("ball1")).unwrap();
        assert!(inbox(&mut visual).is_empty());
        sim.handle(&Message::new("/world/ball1/destroy")).unwrap();
        assert_eq!(inbox(&mut visual), ["/world/ball1/destroy"]);

        // A local clear always goes out, even on an empty scene.
        sim.handle(&Message::new("/world/clear")).unwrap();
        assert_eq!(inbox(&mut visual), ["/world/clear"]);

        // A relayed clear that removes nothing stops here.
        visual
            .send(&Address::new("physics"), &Message::new("/world/clear").encode())
            .unwrap();
        sim.tick();
        assert_eq!(sim.stats().last_drained, 1);
        assert!(inbox(&mut visual).is_empty());
    }

    #[test]
    fn test_destroy_drops_throttle_history() {
        let hub = LocalHub::new(16);
        let _visual = hub.bind("visual").unwrap();
        let config = ProcessConfig::new(Role::Physics, "physics").with_peer(Role::Visual, "visual");
        let mut sim = Simulation::new(config, PassiveEngine::new(), hub.bind("physics").unwrap()).unwrap();
        sim.create_shape(sphere("a")).unwrap();
        sim.create_shape(sphere("b")).unwrap();

        let position = |name: &str| {
            Message::new(format!("/world/{name}/position"))
                .arg(0.0f32)
                .arg(0.0f32)
                .arg(0.0f32)
        };
        sim.send(true, position("a"));
        sim.send(true, position("b"));
        assert_eq!(sim.peers().throttle_entries(), 2);

        sim.destroy_object("a");
        assert_eq!(sim.peers().throttle_entries(), 1);
        sim.clear();
        assert_eq!(sim.peers().throttle_entries(), 0);
    }

    #[test]
    fn test_publish_config_schedules_new_objects() {
        let hub = LocalHub::new(16);
        let mut visual = hub.bind("visual").unwrap();
        let mut config = ProcessConfig::new(Role::Physics, "physics")
            .with_peer(Role::Visual, "visual")
            .with_tick(Duration::from_millis(1));
        config.publish.push(PublishConfig {
            property: "position".into(),
            interval_ms: 2,
            roles: vec![Role::Visual],
        });
        let mut sim = Simulation::new(config, PassiveEngine::new(), hub.bind("physics").unwrap()).unwrap();
        sim.create_shape(sphere("a")).unwrap();
        for _ in 0..4 {
            sim.tick();
        }

        let mut pushes = 0;
        while let Some(p) = visual.recv_timeout(Duration::ZERO).unwrap() {
            let msg = Message::decode(&p.bytes).unwrap();
            if msg.path == "/world/a/position" {
                pushes += 1;
            }
        }
        assert_eq!(pushes, 2);
    }
}
