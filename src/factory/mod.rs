//! Entity factories: creatable kinds and their `create` requests.
//!
//! Each kind owns a factory node at `<root>/<kind>` with a single `create`
//! method. This module is role-agnostic: it parses and validates requests
//! and resolves joint endpoints. Construction is delegated to the engine
//! through [`ShapeBuilder`](crate::engine::ShapeBuilder) and
//! [`JointBuilder`](crate::engine::JointBuilder).
//!
//! | Module | Contents |
//! |---|---|
//! | [`shape`] | [`ShapeKind`], [`ShapeRequest`] |
//! | [`joint`] | [`JointKind`], [`JointRequest`], [`Endpoints`] |

pub mod joint;
pub mod shape;

pub use joint::{Endpoints, JointKind, JointRequest, WORLD};
pub use shape::{ShapeKind, ShapeRequest};

use crate::error::CreateError;
use crate::node::WorldMethod;
use std::fmt;

/// Any creatable kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A body.
    Shape(ShapeKind),
    /// A constraint between bodies.
    Joint(JointKind),
}

impl EntityKind {
    /// Every creatable kind, shapes first.
    pub fn all() -> impl Iterator<Item = Self> {
        ShapeKind::ALL
            .into_iter()
            .map(Self::Shape)
            .chain(JointKind::ALL.into_iter().map(Self::Joint))
    }

    /// Factory node name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Shape(k) => k.name(),
            Self::Joint(k) => k.name(),
        }
    }

    /// Signature of the `create` method.
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Shape(k) => k.signature(),
            Self::Joint(k) => k.signature(),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Names of root-level values.
pub const WORLD_VALUES: [&str; 2] = ["gravity", "collide"];

/// Check that `name` can be used as an entity name.
///
/// Names must be non-empty, must not contain `/`, and must not shadow a
/// factory, world method, world value, or the `world` endpoint token.
///
/// # Errors
///
/// [`CreateError::InvalidName`].
pub fn validate_name(name: &str) -> Result<(), CreateError> {
    let reserved = name == WORLD
        || EntityKind::all().any(|k| k.name() == name)
        || WorldMethod::ALL.iter().any(|m| m.name() == name)
        || WORLD_VALUES.contains(&name)
        || name == "destroy";
    if name.is_empty() || name.contains('/') || reserved {
        return Err(CreateError::InvalidName(name.to_string()));
    }
    Ok(())
}
