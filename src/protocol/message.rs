//! Messages: an address path plus a list of typed arguments.

use super::arg::Arg;
use super::codec;
use crate::error::DecodeError;
use std::fmt;

/// A single addressed message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Address path, e.g. `/world/ball1/position`.
    pub path: String,
    /// Arguments in positional order.
    pub args: Vec<Arg>,
}

impl Message {
    /// Create a message with no arguments.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
        }
    }

    /// Create a message with the given arguments.
    pub fn with_args(path: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }

    /// Append one argument (builder style).
    #[must_use]
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The compact type-tag string, without the leading comma.
    pub fn type_tags(&self) -> String {
        self.args.iter().map(|a| a.tag().as_char()).collect()
    }

    /// Encode to a fresh datagram.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(codec::encoded_len(self));
        codec::encode_into(self, &mut out);
        out
    }

    /// Decode a datagram.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for malformed input.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        codec::decode(bytes)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ,{}", self.path, self.type_tags())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_tags() {
        let msg = Message::new("/world/sphere/create")
            .arg("ball1")
            .arg(1.0f32)
            .arg(2.0f32)
            .arg(3.0f32);
        assert_eq!(msg.type_tags(), "sfff");
        assert_eq!(msg.to_string(), "/world/sphere/create ,sfff \"ball1\" 1 2 3");
    }
}
