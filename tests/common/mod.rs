//! Shared fixtures for integration tests.

#![allow(dead_code)]

use dimple::{
    Engine, EngineError, JointBuilder, JointRequest, LocalHub, LocalTransport, Message, ProcessConfig, Role,
    ShapeBuilder, ShapeRequest, Simulation, StepContext, Transport, Vec3,
};
use std::time::{Duration, Instant};

/// Body handle of a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub name: String,
    pub position: Vec3,
}

/// An engine that records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub steps: u64,
    pub shapes: Vec<String>,
    pub joints: Vec<(String, String, Option<String>)>,
    pub released: Vec<String>,
    /// Busy time spent building each body.
    pub build_delay: Option<Duration>,
}

impl RecordingEngine {
    pub fn slow(build_delay: Duration) -> Self {
        Self {
            build_delay: Some(build_delay),
            ..Self::default()
        }
    }
}

impl ShapeBuilder for RecordingEngine {
    type Body = Body;

    fn build_shape(&mut self, request: &ShapeRequest) -> Result<Body, EngineError> {
        if let Some(delay) = self.build_delay {
            let start = Instant::now();
            while start.elapsed() < delay {
                std::hint::spin_loop();
            }
        }
        self.shapes.push(request.name.clone());
        Ok(Body {
            name: request.name.clone(),
            position: request.position,
        })
    }

    fn release_body(&mut self, body: Body) {
        self.released.push(body.name);
    }
}

impl JointBuilder for RecordingEngine {
    type Joint = String;

    fn build_joint(
        &mut self,
        request: &JointRequest,
        object1: &Body,
        object2: Option<&Body>,
    ) -> Result<String, EngineError> {
        self.joints.push((
            request.name.clone(),
            object1.name.clone(),
            object2.map(|b| b.name.clone()),
        ));
        Ok(request.name.clone())
    }

    fn release_joint(&mut self, joint: String) {
        self.released.push(joint);
    }
}

impl Engine for RecordingEngine {
    fn step(&mut self, _ctx: StepContext<'_, Body, String>) {
        self.steps += 1;
    }
}

pub type Sim = Simulation<RecordingEngine, LocalTransport>;

/// A process of `role` bound at its role name, with `peers` by role name.
pub fn process(hub: &LocalHub, role: Role, peers: &[Role]) -> Sim {
    let config = peers
        .iter()
        .fold(ProcessConfig::new(role, role.as_str()), |cfg, peer| {
            cfg.with_peer(*peer, peer.as_str())
        })
        .with_self_timed(false);
    configured(hub, config, RecordingEngine::default())
}

pub fn configured(hub: &LocalHub, config: ProcessConfig, engine: RecordingEngine) -> Sim {
    let transport = hub.bind(config.address.clone()).unwrap();
    Simulation::new(config, engine, transport).unwrap()
}

/// Everything currently queued on `transport`, decoded.
pub fn drain(transport: &mut LocalTransport) -> Vec<Message> {
    let mut out = Vec::new();
    while let Some(packet) = transport.recv_timeout(Duration::ZERO).unwrap() {
        out.push(Message::decode(&packet.bytes).unwrap());
    }
    out
}
