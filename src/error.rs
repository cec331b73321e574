//! Error types.
//!
//! Per-message failures ([`DecodeError`], [`DispatchError`], [`CreateError`])
//! are handled at the dispatch boundary: logged, counted, never propagated
//! into the tick loop. Only startup problems surface to the caller.

use crate::protocol::TypeTag;
use std::io;
use thiserror::Error;

/// A datagram that is not a well-formed message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The datagram ended in the middle of a field.
    #[error("datagram truncated at byte {0}")]
    Truncated(usize),
    /// A string field had no NUL terminator.
    #[error("unterminated string at byte {0}")]
    UnterminatedString(usize),
    /// A string field was not valid UTF-8.
    #[error("string at byte {0} is not valid UTF-8")]
    InvalidUtf8(usize),
    /// The address does not start with `/`.
    #[error("address '{0}' does not start with '/'")]
    BadAddress(String),
    /// The type-tag string is missing or does not start with `,`.
    #[error("missing type tag string")]
    MissingTypeTags,
    /// A type tag this codec does not understand.
    #[error("unsupported type tag '{0}'")]
    UnsupportedTag(char),
    /// Bundles are not part of the protocol.
    #[error("bundles are not supported")]
    Bundle,
}

/// A message that could not be delivered to a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Nothing is registered at this path.
    #[error("no method registered at '{0}'")]
    NoSuchMethod(String),
    /// A method is already registered at this path.
    #[error("method already registered at '{0}'")]
    Duplicate(String),
    /// Wrong number of arguments.
    #[error("'{path}' expects {expected} argument(s), got {actual}")]
    Arity {
        /// Method path.
        path: String,
        /// Human readable expectation, e.g. `1..=4`.
        expected: String,
        /// Number of arguments received.
        actual: usize,
    },
    /// An argument of the wrong type.
    #[error("'{path}' argument {index} expected '{expected}', got '{actual}'")]
    ArgType {
        /// Method path.
        path: String,
        /// Zero-based argument index.
        index: usize,
        /// Tag the signature asks for.
        expected: TypeTag,
        /// Tag that arrived.
        actual: TypeTag,
    },
    /// A type signature string that cannot be parsed.
    #[error("invalid type signature '{0}'")]
    BadSignature(String),
}

/// A factory request that could not be executed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    /// Neither endpoint of a joint names a live object.
    #[error("constraint '{name}': object '{endpoint}' not found")]
    UnresolvedEndpoint {
        /// Constraint name.
        name: String,
        /// The endpoint token that failed to resolve.
        endpoint: String,
    },
    /// Both endpoints resolve to the same object.
    #[error("constraint '{name}': both endpoints are '{object}'")]
    SelfReference {
        /// Constraint name.
        name: String,
        /// The object named twice.
        object: String,
    },
    /// This joint kind needs two real objects.
    #[error("constraint '{0}' cannot be anchored to the world")]
    WorldNotAllowed(String),
    /// An entity with this name already exists.
    #[error("an entity named '{0}' already exists")]
    DuplicateName(String),
    /// Names must be non-empty and must not contain `/`.
    #[error("invalid entity name '{0}'")]
    InvalidName(String),
    /// The role-specific construction hook failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Failure reported by a role-specific engine collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{role} engine: {message}")]
pub struct EngineError {
    /// Role of the engine that failed.
    pub role: &'static str,
    /// Description.
    pub message: String,
}

impl EngineError {
    /// Create a new engine error.
    pub fn new(role: &'static str, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
        }
    }
}

/// Transport failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket or channel I/O failed.
    #[error("transport I/O: {0}")]
    Io(#[from] io::Error),
    /// An address that cannot be parsed for this transport.
    #[error("invalid address '{0}'")]
    BadAddress(String),
    /// The local endpoint is already in use.
    #[error("address '{0}' already bound")]
    AddressInUse(String),
    /// The channel to the hub was closed.
    #[error("transport disconnected")]
    Disconnected,
}

/// Invalid process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("reading config: {0}")]
    Io(#[from] io::Error),
    /// The configuration file is not valid JSON for this schema.
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A semantic problem with an otherwise well-formed configuration.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Process startup failure.
#[derive(Debug, Error)]
pub enum StartError {
    /// The worker thread could not be spawned.
    #[error("spawning worker thread: {0}")]
    Spawn(#[source] io::Error),
    /// The engine's `initialize()` hook failed.
    #[error("initializing: {0}")]
    Initialize(#[from] EngineError),
    /// The worker did not signal readiness in time.
    #[error("timed out waiting for initialization")]
    Timeout,
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`DecodeError`].
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// See [`DispatchError`].
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// See [`CreateError`].
    #[error(transparent)]
    Create(#[from] CreateError),
    /// See [`EngineError`].
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// See [`TransportError`].
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// See [`StartError`].
    #[error(transparent)]
    Start(#[from] StartError),
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
