//! Process configuration.
//!
//! Topology is static: a process learns its role, address, tick length and
//! peers at startup. Loaded from JSON or built in code.
//!
//! ```json
//! {
//!   "role": "physics",
//!   "address": "127.0.0.1:7771",
//!   "peers": [
//!     { "role": "visual", "address": "127.0.0.1:7773" },
//!     { "role": "haptics", "address": "127.0.0.1:7772", "tick_ms": 1 }
//!   ]
//! }
//! ```

use crate::error::ConfigError;
use crate::peer::Peer;
use crate::role::{Role, Roles};
use crate::transport::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_name() -> String {
    "world".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_queue_capacity() -> usize {
    4096
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn millis(ms: f64) -> Result<Duration, ConfigError> {
    let nanos = (ms * 1e6).round();
    if !nanos.is_finite() || nanos < 1.0 || nanos > u64::MAX as f64 {
        return Err(ConfigError::Invalid(format!("tick of {ms} ms is not a positive duration")));
    }
    Ok(Duration::from_nanos(nanos as u64))
}

/// Another process this one broadcasts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerConfig {
    /// The peer's role.
    pub role: Role,
    /// Where to reach it.
    pub address: Address,
    /// The peer's tick length; defaults to its role's default.
    #[serde(default)]
    pub tick_ms: Option<f64>,
}

impl PeerConfig {
    /// Create a peer entry with its role's default tick.
    pub fn new(role: Role, address: impl Into<Address>) -> Self {
        Self {
            role,
            address: address.into(),
            tick_ms: None,
        }
    }

    /// The peer's tick length.
    pub fn tick(&self) -> Duration {
        self.tick_ms
            .and_then(|ms| millis(ms).ok())
            .unwrap_or_else(|| self.role.default_tick())
    }

    /// Registry snapshot of this peer.
    pub fn to_peer(&self) -> Peer {
        Peer::new(self.address.clone(), self.role.bit(), self.tick())
    }
}

/// Automatic periodic push set up for every new object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Object property, e.g. `position`.
    pub property: String,
    /// Interval in milliseconds.
    pub interval_ms: i32,
    /// Receiving roles.
    pub roles: Vec<Role>,
}

/// Configuration of one simulation process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// What this process simulates.
    pub role: Role,
    /// Name of the root node.
    #[serde(default = "default_name")]
    pub name: String,
    /// Local transport address.
    pub address: Address,
    /// Tick length; defaults to the role's default.
    #[serde(default)]
    pub tick_ms: Option<f64>,
    /// Whether the loop waits out the rest of the tick on the transport.
    /// A process whose engine paces itself (vsync) sets this to false and
    /// only polls.
    #[serde(default = "default_true")]
    pub self_timed: bool,
    /// Peers to broadcast to.
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    /// Queue depth of in-process transports.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Roles that receive canonical create events; defaults to
    /// the role's default audience.
    #[serde(default)]
    pub creation_audience: Option<Vec<Role>>,
    /// Enable the throttle policy for throttled sends.
    #[serde(default = "default_true")]
    pub throttle: bool,
    /// Periodic pushes scheduled on every new object.
    #[serde(default)]
    pub publish: Vec<PublishConfig>,
}

impl ProcessConfig {
    /// Configuration with defaults for `role` at `address`.
    pub fn new(role: Role, address: impl Into<Address>) -> Self {
        Self {
            role,
            name: default_name(),
            address: address.into(),
            tick_ms: None,
            self_timed: true,
            peers: Vec::new(),
            queue_capacity: default_queue_capacity(),
            creation_audience: None,
            throttle: true,
            publish: Vec::new(),
        }
    }

    /// Add a peer with its role's default tick.
    #[must_use]
    pub fn with_peer(mut self, role: Role, address: impl Into<Address>) -> Self {
        self.peers.push(PeerConfig::new(role, address));
        self
    }

    /// Set the tick length.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick_ms = Some(tick.as_secs_f64() * 1000.0);
        self
    }

    /// Set whether the loop blocks on the transport for the rest of a tick.
    #[must_use]
    pub fn with_self_timed(mut self, self_timed: bool) -> Self {
        self.self_timed = self_timed;
        self
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON, or a validation failure.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_json`](Self::from_json).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check semantic constraints.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for a non-positive tick, an invalid root
    /// name, or a peer at this process's own address.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ms) = self.tick_ms {
            millis(ms)?;
        }
        for peer in &self.peers {
            if let Some(ms) = peer.tick_ms {
                millis(ms)?;
            }
            if peer.address == self.address {
                return Err(ConfigError::Invalid(format!(
                    "peer {} is this process's own address",
                    peer.address
                )));
            }
        }
        if self.name.is_empty() || self.name.contains('/') {
            return Err(ConfigError::Invalid(format!("invalid root name '{}'", self.name)));
        }
        Ok(())
    }

    /// Tick length.
    pub fn tick(&self) -> Duration {
        self.tick_ms
            .and_then(|ms| millis(ms).ok())
            .unwrap_or_else(|| self.role.default_tick())
    }

    /// Roles that receive canonical create events.
    pub fn creation_audience(&self) -> Roles {
        self.creation_audience.as_ref().map_or_else(
            || self.role.default_creation_audience(),
            |roles| roles.iter().copied().collect(),
        )
    }
}
