//! Wire codec: OSC 1.0 binary message layout.
//!
//! ```text
//! ┌──────────────────┬──────────────────┬────────────────────────────┐
//! │ address + NUL    │ ",tags" + NUL    │ arguments, big-endian      │
//! │ padded to 4      │ padded to 4      │ i/f: 4 bytes, h/d: 8 bytes │
//! │                  │                  │ s: NUL-terminated, pad 4   │
//! └──────────────────┴──────────────────┴────────────────────────────┘
//! ```
//!
//! `T`, `F` and `N` carry no payload. Output is accumulated into a caller
//! supplied buffer so a message is serialized once per broadcast.

use super::arg::{Arg, TypeTag};
use super::message::Message;
use crate::error::DecodeError;

/// Length of `s` once NUL-terminated and padded to a 4-byte boundary.
#[inline]
const fn padded_len(len: usize) -> usize {
    (len + 4) & !3
}

/// Number of bytes `msg` occupies on the wire.
pub fn encoded_len(msg: &Message) -> usize {
    let args: usize = msg
        .args
        .iter()
        .map(|a| match a {
            Arg::Int(_) | Arg::Float(_) => 4,
            Arg::Long(_) | Arg::Double(_) => 8,
            Arg::Str(s) => padded_len(s.len()),
            Arg::Bool(_) | Arg::Nil => 0,
        })
        .sum();
    padded_len(msg.path.len()) + padded_len(msg.args.len() + 1) + args
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    let pad = padded_len(s.len()) - s.len();
    out.extend(std::iter::repeat(0u8).take(pad));
}

/// Append the encoding of `msg` to `out`.
pub fn encode_into(msg: &Message, out: &mut Vec<u8>) {
    write_str(out, &msg.path);

    let mut tags = String::with_capacity(msg.args.len() + 1);
    tags.push(',');
    tags.extend(msg.args.iter().map(|a| a.tag().as_char()));
    write_str(out, &tags);

    for arg in &msg.args {
        match arg {
            Arg::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            Arg::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
            Arg::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
            Arg::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
            Arg::Str(s) => write_str(out, s),
            Arg::Bool(_) | Arg::Nil => {}
        }
    }
}

/// Cursor over an incoming datagram.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated(self.pos))?;
        self.pos = end;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        Ok(buf)
    }

    fn string(&mut self) -> Result<&'a str, DecodeError> {
        let start = self.pos;
        let rest = self.bytes.get(start..).ok_or(DecodeError::Truncated(start))?;
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::UnterminatedString(start))?;
        let end = start + padded_len(nul);
        if end > self.bytes.len() {
            return Err(DecodeError::Truncated(self.bytes.len()));
        }
        self.pos = end;
        std::str::from_utf8(&rest[..nul]).map_err(|_| DecodeError::InvalidUtf8(start))
    }
}

/// Decode one message.
///
/// # Errors
///
/// Returns a [`DecodeError`] for truncated or malformed datagrams, unknown
/// type tags and bundles.
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    let mut reader = Reader::new(bytes);
    let path = reader.string()?;
    if path == "#bundle" {
        return Err(DecodeError::Bundle);
    }
    if !path.starts_with('/') {
        return Err(DecodeError::BadAddress(path.to_string()));
    }

    // Some senders omit the tag string for argument-less messages.
    if reader.pos >= bytes.len() {
        return Ok(Message::new(path));
    }
    let tags = reader.string()?;
    let tags = tags.strip_prefix(',').ok_or(DecodeError::MissingTypeTags)?;

    let mut args = Vec::with_capacity(tags.len());
    for c in tags.chars() {
        let tag = TypeTag::from_char(c).ok_or(DecodeError::UnsupportedTag(c))?;
        let arg = match tag {
            TypeTag::Int => Arg::Int(i32::from_be_bytes(reader.take()?)),
            TypeTag::Long => Arg::Long(i64::from_be_bytes(reader.take()?)),
            TypeTag::Float => Arg::Float(f32::from_be_bytes(reader.take()?)),
            TypeTag::Double => Arg::Double(f64::from_be_bytes(reader.take()?)),
            TypeTag::Str => Arg::Str(reader.string()?.to_string()),
            TypeTag::True => Arg::Bool(true),
            TypeTag::False => Arg::Bool(false),
            TypeTag::Nil => Arg::Nil,
        };
        args.push(arg);
    }

    Ok(Message::with_args(path, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(padded_len(0), 4);
        assert_eq!(padded_len(3), 4);
        assert_eq!(padded_len(4), 8);
        assert_eq!(padded_len(7), 8);
    }

    #[test]
    fn test_known_bytes() {
        let msg = Message::new("/a").arg(1i32);
        let bytes = msg.encode();
        assert_eq!(
            bytes,
            vec![b'/', b'a', 0, 0, b',', b'i', 0, 0, 0, 0, 0, 1]
        );
        assert_eq!(bytes.len(), encoded_len(&msg));
    }

    #[test]
    fn test_mixed_arguments_decode() {
        let msg = Message::new("/world/hinge/create")
            .arg("h1")
            .arg("world")
            .arg(0.5f32)
            .arg(7i64)
            .arg(true)
            .arg(Arg::Double(-2.25))
            .arg(Arg::Nil);
        let decoded = decode(&msg.encode()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_missing_tag_string_means_no_args() {
        let decoded = decode(b"/world/clear\0\0\0\0").unwrap();
        assert_eq!(decoded, Message::new("/world/clear"));
    }

    #[test]
    fn test_truncated_argument() {
        let mut bytes = Message::new("/x").arg(1.0f32).encode();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(decode(&bytes), Err(DecodeError::Truncated(_))));
    }

    #[test]
    fn test_rejects_bundles_and_bad_addresses() {
        assert_eq!(decode(b"#bundle\0"), Err(DecodeError::Bundle));
        assert!(matches!(decode(b"abc\0"), Err(DecodeError::BadAddress(_))));
        assert!(matches!(
            decode(b"/x\0\0,b\0\0"),
            Err(DecodeError::UnsupportedTag('b'))
        ));
        assert!(matches!(
            decode(b"/x\0\0abc\0"),
            Err(DecodeError::MissingTypeTags)
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            decode(b"/abc"),
            Err(DecodeError::UnterminatedString(0))
        ));
    }
}
