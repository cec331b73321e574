//! Addressable nodes and method dispatch.
//!
//! Every entity in a process (the root, factories, objects, constraints and
//! their values) is a [`Node`] with a hierarchical path. Nodes register
//! methods with the [`Dispatcher`]; inbound messages are routed by exact path.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`dispatch`] | [`Dispatcher`], [`Handler`], [`Routed`], [`WorldMethod`] |

pub mod dispatch;

pub use dispatch::{Dispatcher, Handler, Routed, WorldMethod};

use std::fmt;

/// A named, addressable entity.
///
/// Ownership flows from parent to child; a node only remembers its parent's
/// path, never a reference to the parent itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    name: String,
    classname: String,
    path: String,
    parent: Option<String>,
}

impl Node {
    /// Create a root node, e.g. `world` with path `/world`.
    pub fn root(name: &str) -> Self {
        Self {
            name: name.to_string(),
            classname: "simulation".to_string(),
            path: format!("/{name}"),
            parent: None,
        }
    }

    /// Create a child of this node.
    pub fn child(&self, name: &str, classname: &str) -> Self {
        Self {
            name: name.to_string(),
            classname: classname.to_string(),
            path: format!("{}/{name}", self.path),
            parent: Some(self.path.clone()),
        }
    }

    /// Leaf name, unique among siblings.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity kind tag.
    #[inline]
    pub fn classname(&self) -> &str {
        &self.classname
    }

    /// Full path, the join of all ancestor names.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path of the parent node, if any.
    #[inline]
    pub fn parent_path(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Address of a method on this node. The empty method addresses the
    /// node itself (used for value set messages).
    pub fn method_path(&self, method: &str) -> String {
        if method.is_empty() {
            self.path.clone()
        } else {
            format!("{}/{method}", self.path)
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// The node that owns a value or receives a `destroy`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    /// The process root.
    Root,
    /// A factory node, by entity kind name.
    Factory(&'static str),
    /// An object, by name.
    Object(String),
    /// A constraint, by name.
    Constraint(String),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("root"),
            Self::Factory(kind) => write!(f, "factory '{kind}'"),
            Self::Object(name) => write!(f, "object '{name}'"),
            Self::Constraint(name) => write!(f, "constraint '{name}'"),
        }
    }
}

/// Identity of a value: its owner plus property name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueRef {
    /// Owning node.
    pub owner: Owner,
    /// Property name relative to the owner, e.g. `friction/static`.
    pub property: String,
}

impl ValueRef {
    /// Create a value reference.
    pub fn new(owner: Owner, property: impl Into<String>) -> Self {
        Self {
            owner,
            property: property.into(),
        }
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.property)
    }
}
