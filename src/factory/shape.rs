//! Body shapes.

use crate::protocol::{Arg, Message};
use crate::value::Vec3;
use std::fmt;

/// Kinds of body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Box with a `size` vector.
    Prism,
    /// Ball with a `radius`.
    Sphere,
    /// Triangle mesh loaded from a file.
    Mesh,
}

impl ShapeKind {
    /// Every shape kind.
    pub const ALL: [Self; 3] = [Self::Prism, Self::Sphere, Self::Mesh];

    /// Factory name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Prism => "prism",
            Self::Sphere => "sphere",
            Self::Mesh => "mesh",
        }
    }

    /// `create` signature: name, (filename,) optional position.
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Prism | Self::Sphere => "s|fff",
            Self::Mesh => "ss|fff",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed shape `create` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRequest {
    /// Kind to build.
    pub kind: ShapeKind,
    /// Entity name.
    pub name: String,
    /// Mesh file, for [`ShapeKind::Mesh`].
    pub filename: Option<String>,
    /// Initial position; omitted components are zero.
    pub position: Vec3,
}

impl ShapeRequest {
    /// Create a request at the origin.
    pub fn new(kind: ShapeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            filename: None,
            position: Vec3::ZERO,
        }
    }

    /// Set the position.
    #[must_use]
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set the mesh file.
    #[must_use]
    pub fn with_file(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Parse type-checked `create` arguments. Returns `None` when a
    /// required string is missing.
    pub fn from_args(kind: ShapeKind, args: &[Arg]) -> Option<Self> {
        let name = args.first()?.as_str()?.to_string();
        let (filename, rest) = match kind {
            ShapeKind::Mesh => (Some(args.get(1)?.as_str()?.to_string()), &args[2..]),
            ShapeKind::Prism | ShapeKind::Sphere => (None, &args[1..]),
        };
        let coord = |i: usize| rest.get(i).and_then(Arg::as_f64).unwrap_or(0.0);
        Some(Self {
            kind,
            name,
            filename,
            position: Vec3::new(coord(0), coord(1), coord(2)),
        })
    }

    /// The canonical `create` message, with every field present.
    pub fn to_message(&self, root: &str) -> Message {
        let mut msg = Message::new(format!("{root}/{}/create", self.kind.name())).arg(self.name.as_str());
        if let Some(file) = &self.filename {
            msg = msg.arg(file.as_str());
        }
        msg.arg(Arg::float(self.position.x))
            .arg(Arg::float(self.position.y))
            .arg(Arg::float(self.position.z))
    }
}
