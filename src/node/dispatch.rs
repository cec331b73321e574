//! Method table: exact-path lookup plus signature checking.
//!
//! Handlers are data, not closures. A [`Handler`] names the operation and
//! its target; the simulation interprets it against state it owns, which
//! keeps every mutation on the worker thread and every registry explicit.

use super::{Node, Owner, ValueRef};
use crate::error::DispatchError;
use crate::factory::EntityKind;
use crate::protocol::{Arg, Message, Signature};
use std::collections::HashMap;
use tracing::trace;

/// Root-level methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldMethod {
    /// Destroy every object.
    Clear,
    /// Register the message source as a peer of the given role.
    AddReceiver,
    /// Register an explicit address as a peer.
    AddReceiverUrl,
    /// Unregister the message source.
    RemoveReceiver,
}

impl WorldMethod {
    /// Every world method.
    pub const ALL: [Self; 4] = [
        Self::Clear,
        Self::AddReceiver,
        Self::AddReceiverUrl,
        Self::RemoveReceiver,
    ];

    /// Method name under the root.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::AddReceiver => "add_receiver",
            Self::AddReceiverUrl => "add_receiver_url",
            Self::RemoveReceiver => "remove_receiver",
        }
    }

    /// Argument signature.
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Clear => "",
            Self::AddReceiver | Self::RemoveReceiver => "s",
            Self::AddReceiverUrl => "ss",
        }
    }
}

/// What a registered method does when invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    /// Factory `create`.
    Create(EntityKind),
    /// Generic `destroy`.
    Destroy(Owner),
    /// Value push (`<value>`).
    SetValue(ValueRef),
    /// Value query (`<value>/get`). Also used for `<value>/magnitude/get`.
    GetValue(ValueRef),
    /// Vector rescale (`<value>/magnitude`).
    SetMagnitude(ValueRef),
    /// Impulse on an object (`<object>/push`).
    Push(String),
    /// Root-level method.
    World(WorldMethod),
}

/// A message that passed lookup and type checking.
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    /// The handler to run.
    pub handler: Handler,
    /// Arguments, coerced to the registered signature.
    pub args: Vec<Arg>,
}

#[derive(Debug)]
struct Method {
    signature: Signature,
    handler: Handler,
}

/// Per-process method table.
///
/// Invariant: at most one method per full path.
#[derive(Debug, Default)]
pub struct Dispatcher {
    methods: HashMap<String, Method>,
    by_node: HashMap<String, Vec<String>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` at `node/method`.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Duplicate`] if the path is taken,
    /// [`DispatchError::BadSignature`] if `signature` does not parse.
    pub fn register(
        &mut self,
        node: &Node,
        method: &str,
        signature: &str,
        handler: Handler,
    ) -> Result<(), DispatchError> {
        let path = node.method_path(method);
        if self.methods.contains_key(&path) {
            return Err(DispatchError::Duplicate(path));
        }
        let signature = Signature::parse(signature)?;
        trace!(path = %path, signature = %signature, "register");
        self.by_node
            .entry(node.path().to_string())
            .or_default()
            .push(path.clone());
        self.methods.insert(path, Method { signature, handler });
        Ok(())
    }

    /// Register the default `destroy` method on `node`.
    ///
    /// # Errors
    ///
    /// As [`register`](Self::register).
    pub fn attach_destroy(&mut self, node: &Node, owner: Owner) -> Result<(), DispatchError> {
        self.register(node, "destroy", "", Handler::Destroy(owner))
    }

    /// Remove every method registered by `node_path` or any of its
    /// descendants. Returns the number of methods removed.
    pub fn unregister_node(&mut self, node_path: &str) -> usize {
        let prefix = format!("{node_path}/");
        let nodes: Vec<String> = self
            .by_node
            .keys()
            .filter(|p| p.as_str() == node_path || p.starts_with(&prefix))
            .cloned()
            .collect();

        let mut removed = 0;
        for node in nodes {
            for path in self.by_node.remove(&node).unwrap_or_default() {
                if self.methods.remove(&path).is_some() {
                    removed += 1;
                }
            }
        }
        trace!(node = node_path, removed, "unregister");
        removed
    }

    /// Look up and type-check an inbound message.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoSuchMethod`] for unknown paths, or the signature
    /// check failure.
    pub fn resolve(&self, msg: &Message) -> Result<Routed, DispatchError> {
        let method = self
            .methods
            .get(&msg.path)
            .ok_or_else(|| DispatchError::NoSuchMethod(msg.path.clone()))?;
        let args = method.signature.check(&msg.path, &msg.args)?;
        Ok(Routed {
            handler: method.handler.clone(),
            args,
        })
    }

    /// Whether a method exists at `path`.
    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.methods.contains_key(path)
    }

    /// Number of registered methods.
    #[inline]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether no methods are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
