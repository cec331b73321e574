//! End-to-end behavior of processes talking over an in-process hub.

mod common;

use common::{configured, drain, process, RecordingEngine};
use dimple::{
    Address, Arg, JointKind, LocalHub, Message, Owner, ProcessConfig, Role, Roles, Transport, ValueData, ValueRef,
    ValueScheduler, Vec3,
};
use std::time::Duration;

fn sphere_create(name: &str, x: f32, y: f32, z: f32) -> Message {
    Message::new("/world/sphere/create").arg(name).arg(x).arg(y).arg(z)
}

/// A joint `create` with every parameter zero.
fn joint_create(kind: JointKind, name: &str, endpoint1: &str, endpoint2: &str) -> Message {
    let msg = Message::new(format!("/world/{kind}/create"))
        .arg(name)
        .arg(endpoint1)
        .arg(endpoint2);
    (0..kind.param_count()).fold(msg, |msg, _| msg.arg(0.0f32))
}

#[test]
fn test_create_then_destroy_observed_by_audience() {
    let hub = LocalHub::new(64);
    let mut physics = hub.bind("physics").unwrap();
    let mut haptics = hub.bind("haptics").unwrap();
    let mut client = hub.bind("client").unwrap();
    let mut ui = process(&hub, Role::Interface, &[Role::Physics, Role::Haptics, Role::Client]);

    ui.handle(&sphere_create("ball1", 1.0, 2.0, 3.0)).unwrap();
    assert!(ui.scene().contains_object("ball1"));
    assert_eq!(ui.scene().object_count(), 1);

    for inbox in [&mut physics, &mut haptics] {
        let got = drain(inbox);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path, "/world/sphere/create");
        assert_eq!(got[0].args[0], Arg::from("ball1"));
        assert_eq!(got[0].args.len(), 4);
    }
    // Clients are not part of the creation audience.
    assert!(drain(&mut client).is_empty());

    ui.handle(&Message::new("/world/ball1/destroy")).unwrap();
    assert!(ui.scene().is_empty());
    for inbox in [&mut physics, &mut haptics] {
        let got = drain(inbox);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path, "/world/ball1/destroy");
    }
    assert_eq!(ui.engine().released, ["ball1"]);
}

#[test]
fn test_destroy_on_simulation_role_notifies_peers() {
    let hub = LocalHub::new(64);
    let mut visual = hub.bind("visual").unwrap();
    let mut physics = process(&hub, Role::Physics, &[Role::Visual]);

    physics.handle(&sphere_create("ball1", 0.0, 0.0, 0.0)).unwrap();
    drain(&mut visual);

    physics.handle(&Message::new("/world/ball1/destroy")).unwrap();
    let got = drain(&mut visual);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].path, "/world/ball1/destroy");
    assert!(got[0].args.is_empty());
}

#[test]
fn test_relayed_destroy_settles() {
    let hub = LocalHub::new(64);
    let mut physics = process(&hub, Role::Physics, &[Role::Visual]);
    let mut visual = process(&hub, Role::Visual, &[Role::Physics]);
    for sim in [&mut physics, &mut visual] {
        sim.handle(&sphere_create("ball1", 0.0, 0.0, 0.0)).unwrap();
    }

    physics.handle(&Message::new("/world/ball1/destroy")).unwrap();
    visual.tick();
    assert!(visual.scene().is_empty());
    // The echo finds nothing left to destroy and is not relayed again.
    physics.tick();
    assert_eq!(physics.stats().rejected, 1);
    visual.tick();
    assert_eq!(visual.stats().messages, 1);
}

#[test]
fn test_scene_replicates_across_mesh() {
    let hub = LocalHub::new(256);
    let mut ui = process(&hub, Role::Interface, &[Role::Physics, Role::Visual]);
    let mut physics = process(&hub, Role::Physics, &[Role::Visual, Role::Interface]);
    let mut visual = process(&hub, Role::Visual, &[Role::Physics, Role::Interface]);

    ui.handle(&sphere_create("a", 0.0, 1.0, 0.0)).unwrap();
    ui.handle(&Message::new("/world/prism/create").arg("b")).unwrap();
    ui.handle(&joint_create(JointKind::Hinge, "h", "world", "b")).unwrap();
    ui.handle(&Message::new("/world/a/color").arg(1.0f32).arg(0.0f32).arg(0.0f32))
        .unwrap();
    physics.tick();
    visual.tick();

    for sim in [&physics, &visual] {
        assert!(sim.scene().contains_object("a"));
        assert!(sim.scene().contains_object("b"));
        let hinge = sim.scene().constraint("h").unwrap();
        assert_eq!(hinge.object1(), "b");
        assert_eq!(hinge.object2(), None);
    }
    assert_eq!(physics.engine().joints, [("h".to_string(), "b".to_string(), None)]);
    assert_eq!(
        visual.value(&ValueRef::new(Owner::Object("a".into()), "color")),
        Some(ValueData::Vector(Vec3::new(1.0, 0.0, 0.0)))
    );
    assert_eq!(
        physics.value(&ValueRef::new(Owner::Object("a".into()), "position")),
        Some(ValueData::Vector(Vec3::new(0.0, 1.0, 0.0)))
    );

    // Simulation roles do not rebroadcast what they receive.
    ui.tick();
    assert_eq!(ui.stats().messages, 0);

    ui.handle(&Message::new("/world/clear")).unwrap();
    physics.tick();
    visual.tick();
    assert!(physics.scene().is_empty());
    assert!(visual.scene().is_empty());
    assert!(!physics.dispatcher().contains("/world/a/position"));
}

#[test]
fn test_world_world_hinge_rejected() {
    let hub = LocalHub::new(16);
    let mut physics = process(&hub, Role::Physics, &[]);
    let before = physics.dispatcher().len();

    let msg = Message::new("/world/hinge/create")
        .arg("h1")
        .arg("world")
        .arg("world")
        .arg(0.0f32)
        .arg(0.0f32)
        .arg(0.0f32)
        .arg(0.0f32)
        .arg(0.0f32)
        .arg(1.0f32);
    assert!(physics.handle(&msg).is_err());
    assert!(physics.scene().is_empty());
    assert_eq!(physics.dispatcher().len(), before);
    assert!(physics.engine().joints.is_empty());
}

#[test]
fn test_world_first_endpoint_is_swapped() {
    let hub = LocalHub::new(16);
    let mut physics = process(&hub, Role::Physics, &[]);
    physics.handle(&sphere_create("ball1", 0.0, 0.0, 0.0)).unwrap();

    let anchored = JointKind::ALL
        .into_iter()
        .filter(|k| !k.requires_two_objects());
    for (i, kind) in anchored.enumerate() {
        let name = format!("j{i}");
        physics
            .handle(&joint_create(kind, &name, "world", "ball1"))
            .unwrap();
        let joint = physics.scene().constraint(&name).unwrap();
        assert_eq!(joint.object1(), "ball1", "{kind}");
        assert_eq!(joint.object2(), None, "{kind}");
    }
}

#[test]
fn test_self_referencing_constraint_rejected() {
    let hub = LocalHub::new(16);
    let mut physics = process(&hub, Role::Physics, &[]);
    physics.handle(&sphere_create("ball1", 0.0, 0.0, 0.0)).unwrap();
    let before = physics.dispatcher().len();

    assert!(physics
        .handle(&joint_create(JointKind::Ball, "j", "ball1", "ball1"))
        .is_err());
    assert!(physics
        .handle(&joint_create(JointKind::Fixed, "k", "ball1", "ball1"))
        .is_err());
    assert_eq!(physics.scene().constraint_count(), 0);
    assert_eq!(physics.dispatcher().len(), before);
    assert!(physics.scene().object("ball1").unwrap().constraints().is_empty());
}

#[test]
fn test_send_to_type_reaches_only_matching_roles() {
    let hub = LocalHub::new(16);
    let mut physics = hub.bind("physics").unwrap();
    let mut haptics = hub.bind("haptics").unwrap();
    let mut visual = hub.bind("visual").unwrap();
    let mut ui = process(&hub, Role::Interface, &[Role::Physics, Role::Haptics, Role::Visual]);

    let sent = ui.send_to_type(Roles::HAPTICS | Roles::VISUAL, false, Message::new("/world/probe"));
    assert_eq!(sent, 2);
    assert!(drain(&mut physics).is_empty());
    assert_eq!(drain(&mut haptics).len(), 1);
    assert_eq!(drain(&mut visual).len(), 1);

    assert_eq!(ui.send(false, Message::new("/world/probe")), 3);
    for inbox in [&mut physics, &mut haptics, &mut visual] {
        assert_eq!(drain(inbox).len(), 1);
    }
}

#[test]
fn test_throttled_send_respects_peer_rate() {
    let hub = LocalHub::new(64);
    let mut visual = hub.bind("visual").unwrap();
    let config = ProcessConfig::new(Role::Haptics, "haptics")
        .with_tick(Duration::from_millis(1))
        .with_peer(Role::Visual, "visual");
    let mut haptics = configured(&hub, config, RecordingEngine::default());

    for _ in 0..66 {
        haptics.send(true, Message::new("/world/ball1/position").arg(0.0f32).arg(0.0f32).arg(0.0f32));
    }
    // 33 ms visual tick against a 1 ms haptics tick.
    assert_eq!(drain(&mut visual).len(), 2);

    haptics.send(false, Message::new("/world/ball1/position").arg(0.0f32).arg(0.0f32).arg(0.0f32));
    assert_eq!(drain(&mut visual).len(), 1);
}

#[test]
fn test_scheduled_get_does_not_drift() {
    let mut scheduler = ValueScheduler::new();
    let target = ValueRef::new(Owner::Object("ball1".into()), "position");
    scheduler.schedule(target, 100, Roles::VISUAL);

    let tick = Duration::from_millis(1);
    let mut fired = 0;
    for elapsed_ms in 1..=10_000u64 {
        fired += scheduler.on_tick(tick).len();
        assert!(fired as u64 >= elapsed_ms / 100);
        assert!(fired as u64 <= elapsed_ms / 100 + 1);
    }
    assert_eq!(fired, 100);
}

#[test]
fn test_scheduled_get_pushes_over_the_wire() {
    let hub = LocalHub::new(64);
    let mut client = hub.bind("client").unwrap();
    let config = ProcessConfig::new(Role::Physics, "physics")
        .with_tick(Duration::from_millis(1))
        .with_self_timed(false)
        .with_peer(Role::Client, "client");
    let mut physics = configured(&hub, config, RecordingEngine::default());
    physics.handle(&sphere_create("ball1", 0.0, 0.0, 2.0)).unwrap();
    physics
        .handle(&Message::new("/world/ball1/position/get").arg(5))
        .unwrap();

    for _ in 0..20 {
        physics.tick();
    }
    let got = drain(&mut client);
    assert_eq!(got.len(), 4);
    assert!(got.iter().all(|m| m.path == "/world/ball1/position"));
    assert_eq!(got[0].args[2].as_f64(), Some(2.0));

    physics.handle(&Message::new("/world/ball1/destroy")).unwrap();
    assert!(physics.scheduler().is_empty());
}

#[test]
fn test_burst_steps_once_per_tick() {
    let hub = LocalHub::new(16_384);
    let mut ui = hub.bind("ui").unwrap();
    let config = ProcessConfig::new(Role::Physics, "physics")
        .with_tick(Duration::from_millis(1))
        .with_self_timed(false);
    let mut physics = configured(&hub, config, RecordingEngine::slow(Duration::from_micros(50)));

    let to = Address::new("physics");
    for i in 0..10_000 {
        let msg = Message::new("/world/sphere/create").arg(format!("s{i}"));
        ui.send(&to, &msg.encode()).unwrap();
    }

    physics.tick();
    let processed = physics.stats().last_drained;
    assert_eq!(physics.engine().steps, 1);
    assert!(processed > 0);
    assert!(processed < 10_000);
    assert_eq!(physics.stats().overruns, 1);
    assert_eq!(physics.scene().object_count() as u64, processed);

    // The rest waits for later ticks.
    physics.tick();
    assert_eq!(physics.engine().steps, 2);
    assert!(physics.scene().object_count() as u64 > processed);
}

#[test]
fn test_malformed_messages_do_not_disturb_the_loop() {
    let hub = LocalHub::new(64);
    let mut ui = hub.bind("ui").unwrap();
    let mut physics = process(&hub, Role::Physics, &[]);
    let to = Address::new("physics");

    ui.send(&to, b"\x00\x01junk").unwrap();
    ui.send(&to, &Message::new("/world/sphere/create").arg(1).encode()).unwrap();
    ui.send(&to, &Message::new("/world/ghost/position").encode()).unwrap();
    ui.send(&to, &sphere_create("ok", 0.0, 0.0, 0.0).encode()).unwrap();
    physics.tick();

    assert_eq!(physics.stats().messages, 4);
    assert_eq!(physics.stats().rejected, 3);
    assert_eq!(physics.engine().steps, 1);
    assert_eq!(physics.engine().shapes, ["ok"]);
}
