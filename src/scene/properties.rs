//! Property tables: which values each entity kind carries.

use crate::factory::{JointKind, ShapeKind};
use crate::node::Node;
use crate::role::{Role, Roles};
use crate::value::{Property, Value, Vec3};

/// Initial value of a property.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Init {
    Scalar(f64),
    Vector(f64, f64, f64),
    Text,
    Flag(bool),
}

const fn vector() -> Init {
    Init::Vector(0.0, 0.0, 0.0)
}

const OBJECT: &[(&str, Init)] = &[
    ("position", vector()),
    ("velocity", vector()),
    ("acceleration", vector()),
    ("force", vector()),
    ("color", vector()),
    ("mass", Init::Scalar(0.0)),
    ("density", Init::Scalar(100.0)),
    ("friction/static", Init::Scalar(1.0)),
    ("friction/dynamic", Init::Scalar(0.5)),
    ("collide", Init::Scalar(0.0)),
    ("visible", Init::Flag(true)),
    ("texture/image", Init::Text),
];

const SIZED: &[(&str, Init)] = &[("size", Init::Vector(0.01, 0.01, 0.01))];
const ROUND: &[(&str, Init)] = &[("radius", Init::Scalar(0.01))];

const HINGE: &[(&str, Init)] = &[("torque", Init::Scalar(0.0)), ("angle", Init::Scalar(0.0))];
const TWO_AXIS: &[(&str, Init)] = &[
    ("torque1", Init::Scalar(0.0)),
    ("torque2", Init::Scalar(0.0)),
    ("angle1", Init::Scalar(0.0)),
    ("angle2", Init::Scalar(0.0)),
];
const LINEAR: &[(&str, Init)] = &[("force", Init::Scalar(0.0)), ("position", Init::Scalar(0.0))];
const FREE: &[(&str, Init)] = &[("force", vector()), ("torque", vector())];

const WORLD: &[(&str, Init)] = &[("gravity", vector()), ("collide", Init::Scalar(0.0))];

/// The role that owns the truth for `property`.
///
/// Gets arriving at the interface are forwarded here.
pub fn authority(property: &str) -> Role {
    let base = property.strip_suffix("/magnitude").unwrap_or(property);
    match base {
        "color" | "visible" | "texture/image" => Role::Visual,
        p if p.starts_with("friction/") => Role::Haptics,
        _ => Role::Physics,
    }
}

/// Forward filter for values held by a process of `role`.
///
/// The interface is where edits originate, so its changes go to every
/// peer. Other roles only publish through scheduled gets.
pub const fn forward_filter(role: Role) -> Roles {
    match role {
        Role::Interface => Roles::all(),
        _ => Roles::empty(),
    }
}

fn build(owner: &Node, role: Role, tables: &[&[(&str, Init)]]) -> Vec<Property> {
    let forward = forward_filter(role);
    tables
        .iter()
        .flat_map(|t| t.iter())
        .map(|&(name, init)| match init {
            Init::Scalar(v) => Property::Scalar(Value::new(owner, name, v).forward_to(forward)),
            Init::Vector(x, y, z) => {
                Property::Vector(Value::new(owner, name, Vec3::new(x, y, z)).forward_to(forward))
            }
            Init::Text => Property::Text(Value::new(owner, name, String::new()).forward_to(forward)),
            Init::Flag(v) => Property::Flag(Value::new(owner, name, v).forward_to(forward)),
        })
        .collect()
}

/// Values carried by a body of `kind`.
pub fn object_properties(owner: &Node, kind: ShapeKind, role: Role) -> Vec<Property> {
    let extra = match kind {
        ShapeKind::Prism | ShapeKind::Mesh => SIZED,
        ShapeKind::Sphere => ROUND,
    };
    build(owner, role, &[OBJECT, extra])
}

/// Values carried by a joint of `kind`.
pub fn joint_properties(owner: &Node, kind: JointKind, role: Role) -> Vec<Property> {
    let table: &[(&str, Init)] = match kind {
        JointKind::Hinge => HINGE,
        JointKind::Hinge2 | JointKind::Universal => TWO_AXIS,
        JointKind::Slide | JointKind::Piston => LINEAR,
        JointKind::Free => FREE,
        JointKind::Ball | JointKind::Fixed => &[],
    };
    build(owner, role, &[table])
}

/// Values carried by the root.
pub fn world_properties(root: &Node, role: Role) -> Vec<Property> {
    build(root, role, &[WORLD])
}
