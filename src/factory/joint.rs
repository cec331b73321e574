//! Joints and endpoint resolution.
//!
//! A joint names two endpoints. Each token is either an object name or
//! [`WORLD`], the fixed frame. After resolution the sole real object, if
//! there is only one, is always `object1`.

use crate::error::CreateError;
use crate::protocol::{Arg, Message};
use crate::value::Vec3;
use std::fmt;

/// Endpoint token for the fixed world frame.
pub const WORLD: &str = "world";

/// Kinds of constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointKind {
    /// Ball-and-socket: anchor.
    Ball,
    /// Hinge: anchor, axis.
    Hinge,
    /// Two-axis hinge: anchor, axis1, axis2.
    Hinge2,
    /// Universal joint: anchor, axis1, axis2.
    Universal,
    /// Slider: axis.
    Slide,
    /// Piston: anchor, axis.
    Piston,
    /// Rigid attachment.
    Fixed,
    /// Unconstrained pair, used to apply forces between two bodies.
    Free,
}

impl JointKind {
    /// Every joint kind.
    pub const ALL: [Self; 8] = [
        Self::Ball,
        Self::Hinge,
        Self::Hinge2,
        Self::Universal,
        Self::Slide,
        Self::Piston,
        Self::Fixed,
        Self::Free,
    ];

    /// Factory name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ball => "ball",
            Self::Hinge => "hinge",
            Self::Hinge2 => "hinge2",
            Self::Universal => "universal",
            Self::Slide => "slide",
            Self::Piston => "piston",
            Self::Fixed => "fixed",
            Self::Free => "free",
        }
    }

    /// `create` signature: name, two endpoints, numeric parameters.
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Ball | Self::Slide => "sssfff",
            Self::Hinge | Self::Piston => "sssffffff",
            Self::Hinge2 | Self::Universal => "sssfffffffff",
            Self::Fixed | Self::Free => "sss",
        }
    }

    /// Number of numeric parameters.
    pub const fn param_count(self) -> usize {
        self.signature().len() - 3
    }

    /// Whether both endpoints must be real objects.
    pub const fn requires_two_objects(self) -> bool {
        matches!(self, Self::Hinge2 | Self::Free)
    }
}

impl fmt::Display for JointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Endpoints after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Always a live object.
    pub object1: String,
    /// `None` means anchored to the world frame.
    pub object2: Option<String>,
}

/// A parsed joint `create` request.
#[derive(Debug, Clone, PartialEq)]
pub struct JointRequest {
    /// Kind to build.
    pub kind: JointKind,
    /// Entity name.
    pub name: String,
    /// First endpoint token.
    pub endpoint1: String,
    /// Second endpoint token.
    pub endpoint2: String,
    /// Numeric parameters, `kind.param_count()` of them.
    pub params: Vec<f64>,
}

impl JointRequest {
    /// Create a request with zeroed parameters.
    pub fn new(
        kind: JointKind,
        name: impl Into<String>,
        endpoint1: impl Into<String>,
        endpoint2: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            endpoint1: endpoint1.into(),
            endpoint2: endpoint2.into(),
            params: vec![0.0; kind.param_count()],
        }
    }

    /// Set the parameters. Missing ones are zero, extras are ignored.
    #[must_use]
    pub fn with_params(mut self, params: &[f64]) -> Self {
        for (slot, value) in self.params.iter_mut().zip(params) {
            *slot = *value;
        }
        self
    }

    /// Parse type-checked `create` arguments.
    pub fn from_args(kind: JointKind, args: &[Arg]) -> Option<Self> {
        let text = |i: usize| args.get(i).and_then(Arg::as_str).map(str::to_string);
        let params: Vec<f64> = (0..kind.param_count())
            .map(|i| args.get(3 + i).and_then(Arg::as_f64).unwrap_or(0.0))
            .collect();
        Some(Self {
            kind,
            name: text(0)?,
            endpoint1: text(1)?,
            endpoint2: text(2)?,
            params,
        })
    }

    fn vec_at(&self, index: usize) -> Option<Vec3> {
        match self.params.get(index * 3..index * 3 + 3)? {
            [x, y, z] => Some(Vec3::new(*x, *y, *z)),
            _ => None,
        }
    }

    /// Anchor point, for kinds that have one.
    pub fn anchor(&self) -> Option<Vec3> {
        match self.kind {
            JointKind::Ball | JointKind::Hinge | JointKind::Hinge2 | JointKind::Universal | JointKind::Piston => {
                self.vec_at(0)
            }
            JointKind::Slide | JointKind::Fixed | JointKind::Free => None,
        }
    }

    /// First (or only) axis, for kinds that have one.
    pub fn axis1(&self) -> Option<Vec3> {
        match self.kind {
            JointKind::Slide => self.vec_at(0),
            JointKind::Hinge | JointKind::Hinge2 | JointKind::Universal | JointKind::Piston => self.vec_at(1),
            JointKind::Ball | JointKind::Fixed | JointKind::Free => None,
        }
    }

    /// Second axis, for two-axis kinds.
    pub fn axis2(&self) -> Option<Vec3> {
        match self.kind {
            JointKind::Hinge2 | JointKind::Universal => self.vec_at(2),
            _ => None,
        }
    }

    /// Resolve the endpoint tokens against the set of live objects.
    ///
    /// [`WORLD`] resolves to no object; any other token must name a live
    /// object. If only the second endpoint is real the two are swapped.
    ///
    /// # Errors
    ///
    /// - [`CreateError::UnresolvedEndpoint`] for an unknown object name, or
    ///   when both endpoints are the world
    /// - [`CreateError::SelfReference`] when both name the same object
    /// - [`CreateError::WorldNotAllowed`] when the kind needs two objects
    pub fn resolve(&self, exists: impl Fn(&str) -> bool) -> Result<Endpoints, CreateError> {
        let lookup = |token: &str| -> Result<Option<String>, CreateError> {
            if token == WORLD {
                Ok(None)
            } else if exists(token) {
                Ok(Some(token.to_string()))
            } else {
                Err(CreateError::UnresolvedEndpoint {
                    name: self.name.clone(),
                    endpoint: token.to_string(),
                })
            }
        };

        let endpoints = match (lookup(&self.endpoint1)?, lookup(&self.endpoint2)?) {
            (None, None) => {
                return Err(CreateError::UnresolvedEndpoint {
                    name: self.name.clone(),
                    endpoint: WORLD.to_string(),
                })
            }
            (None, Some(object)) => Endpoints {
                object1: object,
                object2: None,
            },
            (Some(object1), object2) => Endpoints { object1, object2 },
        };

        if endpoints.object2.as_deref() == Some(endpoints.object1.as_str()) {
            return Err(CreateError::SelfReference {
                name: self.name.clone(),
                object: endpoints.object1,
            });
        }
        if self.kind.requires_two_objects() && endpoints.object2.is_none() {
            return Err(CreateError::WorldNotAllowed(self.name.clone()));
        }
        Ok(endpoints)
    }

    /// The canonical `create` message for resolved `endpoints`.
    pub fn to_message(&self, root: &str, endpoints: &Endpoints) -> Message {
        let msg = Message::new(format!("{root}/{}/create", self.kind.name()))
            .arg(self.name.as_str())
            .arg(endpoints.object1.as_str())
            .arg(endpoints.object2.as_deref().unwrap_or(WORLD));
        self.params.iter().fold(msg, |msg, p| msg.arg(Arg::float(*p)))
    }
}
