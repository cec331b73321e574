//! Arguments: typed payload values and their one-letter tags.

use std::fmt;

/// Type tag of a single argument, as it appears in a type-tag string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// 32-bit integer (`i`).
    Int,
    /// 64-bit integer (`h`).
    Long,
    /// 32-bit float (`f`).
    Float,
    /// 64-bit float (`d`).
    Double,
    /// String (`s`).
    Str,
    /// Boolean true (`T`), no payload.
    True,
    /// Boolean false (`F`), no payload.
    False,
    /// Nil (`N`), no payload.
    Nil,
}

impl TypeTag {
    /// Parse a tag letter.
    pub const fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'i' => Self::Int,
            'h' => Self::Long,
            'f' => Self::Float,
            'd' => Self::Double,
            's' => Self::Str,
            'T' => Self::True,
            'F' => Self::False,
            'N' => Self::Nil,
            _ => return None,
        })
    }

    /// The tag letter.
    pub const fn as_char(self) -> char {
        match self {
            Self::Int => 'i',
            Self::Long => 'h',
            Self::Float => 'f',
            Self::Double => 'd',
            Self::Str => 's',
            Self::True => 'T',
            Self::False => 'F',
            Self::Nil => 'N',
        }
    }

    /// Whether values of this tag can stand in for a number.
    #[inline]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int | Self::Long | Self::Float | Self::Double | Self::True | Self::False
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A single message argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    Str(String),
    /// Boolean, encoded as a payload-less `T` or `F` tag.
    Bool(bool),
    /// Nil.
    Nil,
}

impl Arg {
    /// Build a 32-bit float argument from an `f64`.
    ///
    /// Simulation state is kept in double precision, the wire carries floats.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn float(value: f64) -> Self {
        Self::Float(value as f32)
    }

    /// The tag this argument is encoded with.
    pub const fn tag(&self) -> TypeTag {
        match self {
            Self::Int(_) => TypeTag::Int,
            Self::Long(_) => TypeTag::Long,
            Self::Float(_) => TypeTag::Float,
            Self::Double(_) => TypeTag::Double,
            Self::Str(_) => TypeTag::Str,
            Self::Bool(true) => TypeTag::True,
            Self::Bool(false) => TypeTag::False,
            Self::Nil => TypeTag::Nil,
        }
    }

    /// Numeric view of the argument, if it has one.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(f64::from(v)),
            Self::Long(v) => Some(v as f64),
            Self::Float(v) => Some(f64::from(v)),
            Self::Double(v) => Some(v),
            Self::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            Self::Str(_) | Self::Nil => None,
        }
    }

    /// Integer view of the argument; floats are truncated toward zero.
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Self::Int(v) => Some(v),
            Self::Long(v) => i32::try_from(v).ok(),
            Self::Float(v) => Some(v as i32),
            Self::Double(v) => Some(v as i32),
            Self::Bool(v) => Some(i32::from(v)),
            Self::Str(_) | Self::Nil => None,
        }
    }

    /// String view of the argument.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a numeric argument to the representation `tag` asks for.
    ///
    /// Returns `None` when the argument cannot be coerced (strings never
    /// coerce, and nothing coerces to a string).
    #[allow(clippy::cast_possible_truncation)]
    pub fn coerce(&self, tag: TypeTag) -> Option<Self> {
        if self.tag() == tag {
            return Some(self.clone());
        }
        if !self.tag().is_numeric() {
            return None;
        }
        let v = self.as_f64()?;
        Some(match tag {
            TypeTag::Int => Self::Int(self.as_i32()?),
            TypeTag::Long => Self::Long(v as i64),
            TypeTag::Float => Self::Float(v as f32),
            TypeTag::Double => Self::Double(v),
            TypeTag::True | TypeTag::False => Self::Bool(v != 0.0),
            TypeTag::Str | TypeTag::Nil => return None,
        })
    }
}

impl From<i32> for Arg {
    #[inline]
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Arg {
    #[inline]
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for Arg {
    #[inline]
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Arg {
    #[inline]
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Arg {
    #[inline]
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Arg {
    #[inline]
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Nil => f.write_str("nil"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_letters() {
        for c in ['i', 'h', 'f', 'd', 's', 'T', 'F', 'N'] {
            assert_eq!(TypeTag::from_char(c).unwrap().as_char(), c);
        }
        assert!(TypeTag::from_char('b').is_none());
    }

    #[test]
    fn test_int_coerces_to_float() {
        assert_eq!(Arg::Int(3).coerce(TypeTag::Float), Some(Arg::Float(3.0)));
        assert_eq!(Arg::Float(2.7).coerce(TypeTag::Int), Some(Arg::Int(2)));
        assert_eq!(Arg::Bool(true).coerce(TypeTag::Float), Some(Arg::Float(1.0)));
    }

    #[test]
    fn test_strings_never_coerce() {
        assert!(Arg::from("1.0").coerce(TypeTag::Float).is_none());
        assert!(Arg::Int(1).coerce(TypeTag::Str).is_none());
        assert!(Arg::Nil.coerce(TypeTag::Int).is_none());
    }

    #[test]
    fn test_long_out_of_range_for_int() {
        assert!(Arg::Long(i64::MAX).coerce(TypeTag::Int).is_none());
    }
}
