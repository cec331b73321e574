//! Type signatures: the argument shape a method accepts.
//!
//! A signature is written as a tag string with an optional tail after `|`:
//!
//! ```text
//! "sfff"      exactly one string and three numbers
//! "s|fff"     a name, then up to three numbers (missing ones are omitted)
//! "|i"        nothing, or one integer
//! ```

use super::arg::{Arg, TypeTag};
use crate::error::DispatchError;
use std::fmt;

/// The argument shape accepted by a registered method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    required: Vec<TypeTag>,
    optional: Vec<TypeTag>,
}

impl Signature {
    /// Signature of a method that takes no arguments.
    pub const fn empty() -> Self {
        Self {
            required: Vec::new(),
            optional: Vec::new(),
        }
    }

    /// Parse a signature string.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::BadSignature`] for unknown tag letters or
    /// more than one `|`.
    pub fn parse(text: &str) -> Result<Self, DispatchError> {
        let bad = || DispatchError::BadSignature(text.to_string());
        let mut parts = text.splitn(3, '|');
        let head = parts.next().unwrap_or("");
        let tail = parts.next().unwrap_or("");
        if parts.next().is_some() {
            return Err(bad());
        }
        let tags = |s: &str| -> Result<Vec<TypeTag>, DispatchError> {
            s.chars().map(|c| TypeTag::from_char(c).ok_or_else(bad)).collect()
        };
        Ok(Self {
            required: tags(head)?,
            optional: tags(tail)?,
        })
    }

    /// Minimum number of arguments.
    #[inline]
    pub fn min_args(&self) -> usize {
        self.required.len()
    }

    /// Maximum number of arguments.
    #[inline]
    pub fn max_args(&self) -> usize {
        self.required.len() + self.optional.len()
    }

    /// Check `args` against this signature, coercing numbers to the
    /// expected representation.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Arity`] when the count is out of range,
    /// [`DispatchError::ArgType`] for the first argument that cannot be
    /// coerced.
    pub fn check(&self, path: &str, args: &[Arg]) -> Result<Vec<Arg>, DispatchError> {
        if args.len() < self.min_args() || args.len() > self.max_args() {
            let expected = if self.optional.is_empty() {
                self.min_args().to_string()
            } else {
                format!("{}..={}", self.min_args(), self.max_args())
            };
            return Err(DispatchError::Arity {
                path: path.to_string(),
                expected,
                actual: args.len(),
            });
        }

        self.required
            .iter()
            .chain(self.optional.iter())
            .zip(args)
            .enumerate()
            .map(|(index, (&expected, arg))| {
                arg.coerce(expected).ok_or_else(|| DispatchError::ArgType {
                    path: path.to_string(),
                    index,
                    expected,
                    actual: arg.tag(),
                })
            })
            .collect()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tag in &self.required {
            write!(f, "{tag}")?;
        }
        if !self.optional.is_empty() {
            f.write_str("|")?;
            for tag in &self.optional {
                write!(f, "{tag}")?;
            }
        }
        Ok(())
    }
}
