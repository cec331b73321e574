//! Engine capability traits.
//!
//! A role's external collaborator (physics solver, haptic renderer,
//! visual renderer) plugs in by implementing these traits. The generic
//! simulation owns every registry and calls the engine through narrow
//! hooks:
//!
//! - [`ShapeBuilder`] / [`JointBuilder`]: construct the engine-side
//!   handle for a new object or constraint
//! - [`Engine`]: lifecycle, the per-tick `step`, property setters and
//!   getters, impulses
//!
//! [`PassiveEngine`] is a collaborator that only mirrors state, used by the
//! interface role and headless processes.

mod passive;

pub use passive::{Mirror, PassiveEngine};

use crate::error::EngineError;
use crate::factory::{JointRequest, ShapeRequest};
use crate::peer::Outbox;
use crate::role::Role;
use crate::scene::Scene;
use crate::value::{ValueData, Vec3};
use std::time::Duration;

/// Builds the engine handle for a new object.
pub trait ShapeBuilder {
    /// Engine-side state of one object.
    type Body: Send + 'static;

    /// Construct a body for `request`.
    ///
    /// # Errors
    ///
    /// An [`EngineError`] aborts the creation; nothing is registered.
    fn build_shape(&mut self, request: &ShapeRequest) -> Result<Self::Body, EngineError>;

    /// Release a body whose object was destroyed.
    fn release_body(&mut self, body: Self::Body) {
        drop(body);
    }
}

/// Builds the engine handle for a new constraint.
pub trait JointBuilder: ShapeBuilder {
    /// Engine-side state of one constraint.
    type Joint: Send + 'static;

    /// Construct a joint for `request` between `object1` and `object2`
    /// (`None` is the world frame).
    ///
    /// # Errors
    ///
    /// An [`EngineError`] aborts the creation; nothing is registered.
    fn build_joint(
        &mut self,
        request: &JointRequest,
        object1: &Self::Body,
        object2: Option<&Self::Body>,
    ) -> Result<Self::Joint, EngineError>;

    /// Release a joint whose constraint was destroyed.
    fn release_joint(&mut self, joint: Self::Joint) {
        drop(joint);
    }
}

/// What `step` gets to work with.
pub struct StepContext<'a, B, J> {
    /// The process's scene.
    pub scene: &'a mut Scene<B, J>,
    /// Messages to broadcast after the step.
    pub outbox: &'a mut Outbox,
    /// Role of the process.
    pub role: Role,
    /// Nominal tick length.
    pub tick: Duration,
    /// Ticks completed before this one.
    pub frame: u64,
}

/// A role's external collaborator.
///
/// All hooks run on the simulation's worker thread, serialized with
/// message dispatch.
#[allow(unused_variables)]
pub trait Engine: JointBuilder + Send + 'static {
    /// Set up external state (open a world, a device). Runs once before
    /// the first tick.
    ///
    /// # Errors
    ///
    /// An [`EngineError`] aborts startup.
    fn initialize(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Advance one tick. Called exactly once per tick, after messages.
    fn step(&mut self, ctx: StepContext<'_, Self::Body, Self::Joint>);

    /// An object value changed.
    fn set_object_property(&mut self, body: &mut Self::Body, name: &str, value: &ValueData) {}

    /// Current engine-side state of an object value, for outbound gets.
    /// `None` means the stored value is current.
    fn object_property(&self, body: &Self::Body, name: &str) -> Option<ValueData> {
        None
    }

    /// A constraint value changed.
    fn set_joint_property(&mut self, joint: &mut Self::Joint, name: &str, value: &ValueData) {}

    /// Current engine-side state of a constraint value.
    fn joint_property(&self, joint: &Self::Joint, name: &str) -> Option<ValueData> {
        None
    }

    /// A root value (`gravity`, `collide`) changed.
    fn set_world_property(&mut self, name: &str, value: &ValueData) {}

    /// Apply an impulse `force` at `offset` from the body's origin.
    fn push(&mut self, body: &mut Self::Body, force: Vec3, offset: Vec3) {}

    /// Tear down external state. Runs once after the last tick.
    fn shutdown(&mut self) {}
}
