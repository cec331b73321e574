//! Values: typed observable properties attached to nodes.
//!
//! A [`Value<T>`] holds the current state of one property and knows where
//! changes go. Setting it returns the [`Outbound`] message its forward
//! filter asks for; the caller decides when to deliver it. [`Property`]
//! erases the kind so objects can keep a heterogeneous list.
//!
//! | Kind | Rust type | Wire signature |
//! |---|---|---|
//! | scalar | `f64` | `f` |
//! | vector | [`Vec3`] | `fff` |
//! | string | `String` | `s` |
//! | flag | `bool` | `i` |

mod scheduler;

pub use scheduler::{RegistrationId, ScheduledPush, ValueScheduler};

use crate::node::Node;
use crate::peer::Outbound;
use crate::protocol::{Arg, Message};
use crate::role::Roles;
use std::fmt;

/// A 3-vector in double precision.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a vector.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length.
    #[inline]
    pub fn length(self) -> f64 {
        self.z.mul_add(self.z, self.x.mul_add(self.x, self.y * self.y)).sqrt()
    }

    /// This vector rescaled to `length`. The zero vector stays zero.
    #[must_use]
    pub fn with_length(self, length: f64) -> Self {
        let current = self.length();
        if current == 0.0 {
            return self;
        }
        let k = length / current;
        Self::new(self.x * k, self.y * k, self.z * k)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Kind of a value, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKindTag {
    /// One number.
    Scalar,
    /// Three numbers.
    Vector,
    /// One string.
    Text,
    /// On/off.
    Flag,
}

/// Kind-erased value data, as handed to engine hooks.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueData {
    /// One number.
    Scalar(f64),
    /// Three numbers.
    Vector(Vec3),
    /// One string.
    Text(String),
    /// On/off.
    Flag(bool),
}

impl ValueData {
    /// Kind of this data.
    pub const fn kind(&self) -> ValueKindTag {
        match self {
            Self::Scalar(_) => ValueKindTag::Scalar,
            Self::Vector(_) => ValueKindTag::Vector,
            Self::Text(_) => ValueKindTag::Text,
            Self::Flag(_) => ValueKindTag::Flag,
        }
    }

    /// Wire arguments carrying this data.
    pub fn to_args(&self) -> Vec<Arg> {
        match self {
            Self::Scalar(v) => v.to_args(),
            Self::Vector(v) => v.to_args(),
            Self::Text(v) => v.to_args(),
            Self::Flag(v) => v.to_args(),
        }
    }

    /// Parse `args` as data of `kind`.
    pub fn from_args(kind: ValueKindTag, args: &[Arg]) -> Option<Self> {
        Some(match kind {
            ValueKindTag::Scalar => Self::Scalar(f64::from_args(args)?),
            ValueKindTag::Vector => Self::Vector(Vec3::from_args(args)?),
            ValueKindTag::Text => Self::Text(String::from_args(args)?),
            ValueKindTag::Flag => Self::Flag(bool::from_args(args)?),
        })
    }
}

/// A Rust type that can be held by a [`Value`].
pub trait ValueKind: Clone + PartialEq + fmt::Debug + Send + 'static {
    /// Kind tag.
    const KIND: ValueKindTag;
    /// Wire signature of a set message.
    const SIGNATURE: &'static str;

    /// Encode as message arguments.
    fn to_args(&self) -> Vec<Arg>;
    /// Decode from already type-checked message arguments.
    fn from_args(args: &[Arg]) -> Option<Self>;
    /// Erase the kind.
    fn into_data(self) -> ValueData;
    /// Recover the kind, if `data` matches.
    fn from_data(data: ValueData) -> Option<Self>;
}

impl ValueKind for f64 {
    const KIND: ValueKindTag = ValueKindTag::Scalar;
    const SIGNATURE: &'static str = "f";

    fn to_args(&self) -> Vec<Arg> {
        vec![Arg::float(*self)]
    }

    fn from_args(args: &[Arg]) -> Option<Self> {
        args.first()?.as_f64()
    }

    fn into_data(self) -> ValueData {
        ValueData::Scalar(self)
    }

    fn from_data(data: ValueData) -> Option<Self> {
        match data {
            ValueData::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

impl ValueKind for Vec3 {
    const KIND: ValueKindTag = ValueKindTag::Vector;
    const SIGNATURE: &'static str = "fff";

    fn to_args(&self) -> Vec<Arg> {
        vec![Arg::float(self.x), Arg::float(self.y), Arg::float(self.z)]
    }

    fn from_args(args: &[Arg]) -> Option<Self> {
        match args {
            [x, y, z, ..] => Some(Self::new(x.as_f64()?, y.as_f64()?, z.as_f64()?)),
            _ => None,
        }
    }

    fn into_data(self) -> ValueData {
        ValueData::Vector(self)
    }

    fn from_data(data: ValueData) -> Option<Self> {
        match data {
            ValueData::Vector(v) => Some(v),
            _ => None,
        }
    }
}

impl ValueKind for String {
    const KIND: ValueKindTag = ValueKindTag::Text;
    const SIGNATURE: &'static str = "s";

    fn to_args(&self) -> Vec<Arg> {
        vec![Arg::Str(self.clone())]
    }

    fn from_args(args: &[Arg]) -> Option<Self> {
        args.first()?.as_str().map(str::to_string)
    }

    fn into_data(self) -> ValueData {
        ValueData::Text(self)
    }

    fn from_data(data: ValueData) -> Option<Self> {
        match data {
            ValueData::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl ValueKind for bool {
    const KIND: ValueKindTag = ValueKindTag::Flag;
    const SIGNATURE: &'static str = "i";

    fn to_args(&self) -> Vec<Arg> {
        vec![Arg::Int(i32::from(*self))]
    }

    fn from_args(args: &[Arg]) -> Option<Self> {
        args.first()?.as_i32().map(|v| v != 0)
    }

    fn into_data(self) -> ValueData {
        ValueData::Flag(self)
    }

    fn from_data(data: ValueData) -> Option<Self> {
        match data {
            ValueData::Flag(v) => Some(v),
            _ => None,
        }
    }
}

/// A named, typed, observable property.
///
/// # Example
/// ```
/// use dimple::{Node, Roles, Value, Vec3};
///
/// let ball = Node::root("world").child("ball1", "sphere");
/// let mut position = Value::new(&ball, "position", Vec3::ZERO).forward_to(Roles::all());
///
/// let out = position.set(Vec3::new(1.0, 2.0, 3.0)).unwrap();
/// assert_eq!(out.message.path, "/world/ball1/position");
/// ```
#[derive(Debug, Clone)]
pub struct Value<T: ValueKind> {
    name: String,
    path: String,
    current: T,
    forward: Roles,
    default_interval_ms: i32,
}

impl<T: ValueKind> Value<T> {
    /// Create a value named `name` under `owner`. It forwards nowhere and
    /// has no default interval until configured.
    pub fn new(owner: &Node, name: &str, initial: T) -> Self {
        Self {
            name: name.to_string(),
            path: owner.method_path(name),
            current: initial,
            forward: Roles::empty(),
            default_interval_ms: -1,
        }
    }

    /// Push changes to peers matching `roles`.
    #[must_use]
    pub fn forward_to(mut self, roles: Roles) -> Self {
        self.forward = roles;
        self
    }

    /// Interval used when a periodic push is scheduled without an explicit
    /// one. Negative disables it.
    #[must_use]
    pub fn with_interval(mut self, interval_ms: i32) -> Self {
        self.default_interval_ms = interval_ms;
        self
    }

    /// Property name relative to its owner.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current state.
    #[inline]
    pub const fn get(&self) -> &T {
        &self.current
    }

    /// On-change forward filter.
    #[inline]
    pub const fn forward(&self) -> Roles {
        self.forward
    }

    /// Default scheduling interval in milliseconds.
    #[inline]
    pub const fn default_interval_ms(&self) -> i32 {
        self.default_interval_ms
    }

    /// Update the value. Returns the change push, if this value forwards.
    pub fn set(&mut self, value: T) -> Option<Outbound> {
        self.current = value;
        if self.forward.is_empty() {
            None
        } else {
            Some(Outbound::to_type(self.forward, self.snapshot()))
        }
    }

    /// Update the value without forwarding.
    #[inline]
    pub fn set_quiet(&mut self, value: T) {
        self.current = value;
    }

    /// Message carrying the current value.
    pub fn snapshot(&self) -> Message {
        Message::with_args(self.path.clone(), self.current.to_args())
    }
}

impl Value<Vec3> {
    /// Length of the vector.
    #[inline]
    pub fn magnitude(&self) -> f64 {
        self.current.length()
    }

    /// Rescale the vector to `length`, forwarding like [`set`](Self::set).
    pub fn set_magnitude(&mut self, length: f64) -> Option<Outbound> {
        let scaled = self.current.with_length(length);
        self.set(scaled)
    }

    /// Message carrying the magnitude, addressed to `<value>/magnitude`.
    pub fn magnitude_snapshot(&self) -> Message {
        Message::new(format!("{}/magnitude", self.path)).arg(Arg::float(self.magnitude()))
    }
}

/// A [`Value`] of any kind.
#[derive(Debug, Clone)]
pub enum Property {
    /// Scalar value.
    Scalar(Value<f64>),
    /// Vector value.
    Vector(Value<Vec3>),
    /// String value.
    Text(Value<String>),
    /// Flag value.
    Flag(Value<bool>),
}

macro_rules! each {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            Property::Scalar($v) => $body,
            Property::Vector($v) => $body,
            Property::Text($v) => $body,
            Property::Flag($v) => $body,
        }
    };
}

impl Property {
    /// Property name.
    pub fn name(&self) -> &str {
        each!(self, v => v.name())
    }

    /// Full path.
    pub fn path(&self) -> &str {
        each!(self, v => v.path())
    }

    /// Kind of the held value.
    pub const fn kind(&self) -> ValueKindTag {
        match self {
            Self::Scalar(_) => ValueKindTag::Scalar,
            Self::Vector(_) => ValueKindTag::Vector,
            Self::Text(_) => ValueKindTag::Text,
            Self::Flag(_) => ValueKindTag::Flag,
        }
    }

    /// Wire signature of a set message.
    pub const fn signature(&self) -> &'static str {
        match self {
            Self::Scalar(_) => f64::SIGNATURE,
            Self::Vector(_) => Vec3::SIGNATURE,
            Self::Text(_) => String::SIGNATURE,
            Self::Flag(_) => bool::SIGNATURE,
        }
    }

    /// On-change forward filter.
    pub fn forward(&self) -> Roles {
        each!(self, v => v.forward())
    }

    /// Default scheduling interval in milliseconds.
    pub fn default_interval_ms(&self) -> i32 {
        each!(self, v => v.default_interval_ms())
    }

    /// Change the forward filter.
    pub fn set_forward(&mut self, roles: Roles) {
        each!(self, v => v.forward = roles);
    }

    /// Change the default interval.
    pub fn set_default_interval(&mut self, interval_ms: i32) {
        each!(self, v => v.default_interval_ms = interval_ms);
    }

    /// Current state, kind-erased.
    pub fn data(&self) -> ValueData {
        each!(self, v => v.get().clone().into_data())
    }

    /// Update from kind-erased data. Data of another kind is ignored.
    ///
    /// Returns the change push when `quiet` is false and the value forwards.
    pub fn set_data(&mut self, data: ValueData, quiet: bool) -> Option<Outbound> {
        fn apply<T: ValueKind>(v: &mut Value<T>, data: ValueData, quiet: bool) -> Option<Outbound> {
            let value = T::from_data(data)?;
            if quiet {
                v.set_quiet(value);
                None
            } else {
                v.set(value)
            }
        }
        each!(self, v => apply(v, data, quiet))
    }

    /// Message carrying the current value.
    pub fn snapshot(&self) -> Message {
        each!(self, v => v.snapshot())
    }

    /// The vector value, if this is one.
    pub const fn as_vector(&self) -> Option<&Value<Vec3>> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// The vector value, mutably, if this is one.
    pub fn as_vector_mut(&mut self) -> Option<&mut Value<Vec3>> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball() -> Node {
        Node::root("world").child("ball1", "sphere")
    }

    #[test]
    fn test_set_forwards_only_when_configured() {
        let mut quiet = Value::new(&ball(), "mass", 1.0);
        assert!(quiet.set(2.0).is_none());
        assert_eq!(*quiet.get(), 2.0);

        let mut loud = Value::new(&ball(), "mass", 1.0).forward_to(Roles::PHYSICS);
        let out = loud.set(3.0).unwrap();
        assert_eq!(out.roles, Roles::PHYSICS);
        assert_eq!(out.message, Message::new("/world/ball1/mass").arg(3.0f32));
    }

    #[test]
    fn test_set_quiet_never_forwards() {
        let mut v = Value::new(&ball(), "color", Vec3::ZERO).forward_to(Roles::all());
        v.set_quiet(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(*v.get(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_magnitude() {
        let mut v = Value::new(&ball(), "velocity", Vec3::new(3.0, 0.0, 4.0));
        assert_eq!(v.magnitude(), 5.0);
        v.set_magnitude(10.0);
        assert_eq!(*v.get(), Vec3::new(6.0, 0.0, 8.0));
        assert_eq!(
            v.magnitude_snapshot(),
            Message::new("/world/ball1/velocity/magnitude").arg(10.0f32)
        );

        let mut zero = Value::new(&ball(), "force", Vec3::ZERO);
        zero.set_magnitude(2.0);
        assert_eq!(*zero.get(), Vec3::ZERO);
    }

    #[test]
    fn test_property_set_data_matches_kind() {
        let mut p = Property::Scalar(Value::new(&ball(), "radius", 0.01));
        assert!(p.set_data(ValueData::Text("x".into()), false).is_none());
        assert_eq!(p.data(), ValueData::Scalar(0.01));

        p.set_data(ValueData::Scalar(0.5), true);
        assert_eq!(p.data(), ValueData::Scalar(0.5));
        assert_eq!(p.signature(), "f");
    }

    #[test]
    fn test_data_from_args() {
        let args = [Arg::Float(1.0), Arg::Float(2.0), Arg::Float(3.0)];
        assert_eq!(
            ValueData::from_args(ValueKindTag::Vector, &args),
            Some(ValueData::Vector(Vec3::new(1.0, 2.0, 3.0)))
        );
        assert_eq!(
            ValueData::from_args(ValueKindTag::Flag, &[Arg::Int(0)]),
            Some(ValueData::Flag(false))
        );
        assert!(ValueData::from_args(ValueKindTag::Text, &[Arg::Int(0)]).is_none());
    }
}
