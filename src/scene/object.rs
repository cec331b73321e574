//! Objects and constraints: generic entities wrapping an engine handle.

use crate::factory::{JointKind, ShapeKind};
use crate::node::Node;
use crate::value::{Property, Value, Vec3};

fn find<'a>(properties: &'a [Property], name: &str) -> Option<&'a Property> {
    properties.iter().find(|p| p.name() == name)
}

fn find_mut<'a>(properties: &'a mut [Property], name: &str) -> Option<&'a mut Property> {
    properties.iter_mut().find(|p| p.name() == name)
}

/// A body in the scene.
///
/// Owns its values and one engine handle `B` (physical body, haptic
/// proxy, mesh, ...). The handle is released with the object.
#[derive(Debug)]
pub struct Object<B> {
    node: Node,
    kind: ShapeKind,
    body: B,
    properties: Vec<Property>,
    constraints: Vec<String>,
}

impl<B> Object<B> {
    /// Create an object.
    pub fn new(node: Node, kind: ShapeKind, body: B, properties: Vec<Property>) -> Self {
        Self {
            node,
            kind,
            body,
            properties,
            constraints: Vec::new(),
        }
    }

    /// Name.
    #[inline]
    pub fn name(&self) -> &str {
        self.node.name()
    }

    /// Node (path, classname).
    #[inline]
    pub const fn node(&self) -> &Node {
        &self.node
    }

    /// Shape kind.
    #[inline]
    pub const fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Engine handle.
    #[inline]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Engine handle, mutably.
    #[inline]
    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// Split borrow: the handle plus the values.
    pub fn parts_mut(&mut self) -> (&mut B, &mut [Property]) {
        (&mut self.body, &mut self.properties)
    }

    /// All values.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Look up a value by name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        find(&self.properties, name)
    }

    /// Look up a value by name, mutably.
    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        find_mut(&mut self.properties, name)
    }

    /// The `position` value.
    pub fn position(&self) -> Option<&Value<Vec3>> {
        self.property("position").and_then(Property::as_vector)
    }

    /// Names of constraints attached to this object.
    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }

    pub(crate) fn link(&mut self, constraint: &str) {
        if !self.constraints.iter().any(|c| c == constraint) {
            self.constraints.push(constraint.to_string());
        }
    }

    pub(crate) fn unlink(&mut self, constraint: &str) {
        self.constraints.retain(|c| c != constraint);
    }

    /// Consume the object, returning its engine handle.
    pub fn into_body(self) -> B {
        self.body
    }
}

/// A joint between one object and another object or the world frame.
///
/// Invariant: `object1 != object2`.
#[derive(Debug)]
pub struct Constraint<J> {
    node: Node,
    kind: JointKind,
    object1: String,
    object2: Option<String>,
    joint: J,
    properties: Vec<Property>,
}

impl<J> Constraint<J> {
    /// Create a constraint.
    pub fn new(
        node: Node,
        kind: JointKind,
        object1: String,
        object2: Option<String>,
        joint: J,
        properties: Vec<Property>,
    ) -> Self {
        debug_assert_ne!(Some(&object1), object2.as_ref());
        Self {
            node,
            kind,
            object1,
            object2,
            joint,
            properties,
        }
    }

    /// Name.
    #[inline]
    pub fn name(&self) -> &str {
        self.node.name()
    }

    /// Node (path, classname).
    #[inline]
    pub const fn node(&self) -> &Node {
        &self.node
    }

    /// Joint kind.
    #[inline]
    pub const fn kind(&self) -> JointKind {
        self.kind
    }

    /// First endpoint; always a live object.
    #[inline]
    pub fn object1(&self) -> &str {
        &self.object1
    }

    /// Second endpoint; `None` means the world frame.
    #[inline]
    pub fn object2(&self) -> Option<&str> {
        self.object2.as_deref()
    }

    /// Whether `object` is one of the endpoints.
    pub fn touches(&self, object: &str) -> bool {
        self.object1 == object || self.object2.as_deref() == Some(object)
    }

    /// Engine handle.
    #[inline]
    pub const fn joint(&self) -> &J {
        &self.joint
    }

    /// Engine handle, mutably.
    #[inline]
    pub fn joint_mut(&mut self) -> &mut J {
        &mut self.joint
    }

    /// Split borrow: the handle plus the values.
    pub fn parts_mut(&mut self) -> (&mut J, &mut [Property]) {
        (&mut self.joint, &mut self.properties)
    }

    /// All values.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Look up a value by name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        find(&self.properties, name)
    }

    /// Look up a value by name, mutably.
    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        find_mut(&mut self.properties, name)
    }

    /// Consume the constraint, returning its engine handle.
    pub fn into_joint(self) -> J {
        self.joint
    }
}
