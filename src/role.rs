//! Roles: what kind of simulation a process performs.
//!
//! A process has exactly one [`Role`]. Routing filters are [`Roles`] bitmasks,
//! so a peer matches a filter when their bits intersect.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

bitflags! {
    /// Role filter used for selective broadcast.
    ///
    /// # Example
    /// ```
    /// use dimple::Roles;
    /// let renderers = Roles::HAPTICS | Roles::VISUAL;
    /// assert!(renderers.intersects(Roles::VISUAL));
    /// ```
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Roles: u8 {
        /// Rigid-body physics engine.
        const PHYSICS = 0b0000_0001;
        /// Haptic rendering engine.
        const HAPTICS = 0b0000_0010;
        /// Visual renderer.
        const VISUAL = 0b0000_0100;
        /// Interactive front-end.
        const INTERFACE = 0b0000_1000;
        /// External observer that never runs a loop of its own.
        const CLIENT = 0b0001_0000;
        /// Every simulation role.
        const SIMULATIONS = Self::PHYSICS.bits()
            | Self::HAPTICS.bits()
            | Self::VISUAL.bits()
            | Self::INTERFACE.bits();
    }
}

/// The role of a single process or peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Rigid-body physics engine.
    Physics,
    /// Haptic rendering engine.
    Haptics,
    /// Visual renderer.
    Visual,
    /// Interactive front-end.
    Interface,
    /// External observer.
    Client,
}

impl Role {
    /// All roles that run a simulation loop, in startup order.
    pub const SIMULATIONS: [Self; 4] = [Self::Physics, Self::Haptics, Self::Visual, Self::Interface];

    /// The single bit for this role.
    #[inline]
    pub const fn bit(self) -> Roles {
        match self {
            Self::Physics => Roles::PHYSICS,
            Self::Haptics => Roles::HAPTICS,
            Self::Visual => Roles::VISUAL,
            Self::Interface => Roles::INTERFACE,
            Self::Client => Roles::CLIENT,
        }
    }

    /// Lowercase name used on the wire and in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Physics => "physics",
            Self::Haptics => "haptics",
            Self::Visual => "visual",
            Self::Interface => "interface",
            Self::Client => "client",
        }
    }

    /// Default tick length for a process of this role.
    ///
    /// Haptics needs ~1 kHz to feel stiff, physics runs at 100 Hz and the
    /// renderer at ~30 fps. The interface is purely message driven.
    pub const fn default_tick(self) -> Duration {
        match self {
            Self::Physics => Duration::from_millis(10),
            Self::Haptics => Duration::from_millis(1),
            Self::Visual => Duration::from_millis(33),
            Self::Interface | Self::Client => Duration::from_millis(1000),
        }
    }

    /// Roles that receive canonical creation and destruction events from a
    /// process of this role.
    ///
    /// Only the interface is authoritative for scene structure.
    pub const fn default_creation_audience(self) -> Roles {
        match self {
            Self::Interface => Roles::SIMULATIONS,
            _ => Roles::empty(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role name that is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "physics" => Ok(Self::Physics),
            "haptics" => Ok(Self::Haptics),
            "visual" => Ok(Self::Visual),
            "interface" => Ok(Self::Interface),
            "client" => Ok(Self::Client),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl From<Role> for Roles {
    #[inline]
    fn from(role: Role) -> Self {
        role.bit()
    }
}

impl FromIterator<Role> for Roles {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |acc, r| acc | r.bit())
    }
}
