//! Protocol module: the addressed, typed messages exchanged between processes.
//!
//! This module contains:
//! - [`Arg`] / [`TypeTag`]: argument values and their tag letters
//! - [`Signature`]: the argument shape a registered method accepts
//! - [`Message`]: address path plus arguments
//! - [`codec`]: OSC 1.0 binary encoding

mod arg;
pub mod codec;
mod message;
mod signature;

pub use arg::{Arg, TypeTag};
pub use message::Message;
pub use signature::Signature;
