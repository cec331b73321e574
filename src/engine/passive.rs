//! An engine that only mirrors state.

use super::{Engine, JointBuilder, ShapeBuilder, StepContext};
use crate::error::EngineError;
use crate::factory::{JointRequest, ShapeRequest};
use crate::value::{ValueData, Vec3};
use std::collections::BTreeMap;

/// Engine handle of a [`PassiveEngine`]: the last value written to each
/// property, plus every impulse received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mirror {
    /// Values by property name.
    pub values: BTreeMap<String, ValueData>,
    /// `(force, offset)` pairs, oldest first.
    pub impulses: Vec<(Vec3, Vec3)>,
}

/// No external collaborator.
///
/// Bodies and joints are [`Mirror`]s. Used by the interface role, and by
/// any role running without its solver or renderer.
#[derive(Debug, Default)]
pub struct PassiveEngine {
    steps: u64,
    built: u64,
}

impl PassiveEngine {
    /// Create a passive engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed steps.
    #[inline]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of bodies and joints built.
    #[inline]
    pub const fn built(&self) -> u64 {
        self.built
    }
}

impl ShapeBuilder for PassiveEngine {
    type Body = Mirror;

    fn build_shape(&mut self, request: &ShapeRequest) -> Result<Mirror, EngineError> {
        self.built += 1;
        let mut mirror = Mirror::default();
        mirror
            .values
            .insert("position".into(), ValueData::Vector(request.position));
        Ok(mirror)
    }
}

impl JointBuilder for PassiveEngine {
    type Joint = Mirror;

    fn build_joint(
        &mut self,
        request: &JointRequest,
        _object1: &Mirror,
        _object2: Option<&Mirror>,
    ) -> Result<Mirror, EngineError> {
        self.built += 1;
        let mut mirror = Mirror::default();
        let geometry = [
            ("anchor", request.anchor()),
            ("axis1", request.axis1()),
            ("axis2", request.axis2()),
        ];
        for (name, v) in geometry {
            if let Some(v) = v {
                mirror.values.insert(name.into(), ValueData::Vector(v));
            }
        }
        Ok(mirror)
    }
}

impl Engine for PassiveEngine {
    fn step(&mut self, _ctx: StepContext<'_, Mirror, Mirror>) {
        self.steps += 1;
    }

    fn set_object_property(&mut self, body: &mut Mirror, name: &str, value: &ValueData) {
        body.values.insert(name.to_string(), value.clone());
    }

    fn object_property(&self, body: &Mirror, name: &str) -> Option<ValueData> {
        body.values.get(name).cloned()
    }

    fn set_joint_property(&mut self, joint: &mut Mirror, name: &str, value: &ValueData) {
        joint.values.insert(name.to_string(), value.clone());
    }

    fn joint_property(&self, joint: &Mirror, name: &str) -> Option<ValueData> {
        joint.values.get(name).cloned()
    }

    fn push(&mut self, body: &mut Mirror, force: Vec3, offset: Vec3) {
        body.impulses.push((force, offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{JointKind, ShapeKind, WORLD};

    #[test]
    fn test_mirror_records_creation_geometry() {
        let mut engine = PassiveEngine::new();
        let body = engine
            .build_shape(&ShapeRequest::new(ShapeKind::Sphere, "a").at(Vec3::new(1.0, 2.0, 3.0)))
            .unwrap();
        assert_eq!(
            engine.object_property(&body, "position"),
            Some(ValueData::Vector(Vec3::new(1.0, 2.0, 3.0)))
        );

        let req = JointRequest::new(JointKind::Hinge, "h", "a", WORLD).with_params(&[0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        let joint = engine.build_joint(&req, &body, None).unwrap();
        assert_eq!(joint.values.get("axis1"), Some(&ValueData::Vector(Vec3::new(1.0, 0.0, 0.0))));
        assert!(!joint.values.contains_key("axis2"));
        assert_eq!(engine.built(), 2);
    }
}
