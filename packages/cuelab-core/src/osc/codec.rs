//! OSC 1.0 binary message codec.
//!
//! Encodes and decodes the address-pattern/typed-argument datagrams spoken
//! by the remote devices. Pure functions, no I/O:
//!
//! - address: NUL-terminated string padded to a 4-byte boundary
//! - type tags: `,` followed by one tag per argument (`i`, `f`, `s`),
//!   NUL-terminated, padded to 4
//! - arguments: big-endian 4-byte int32/float32; strings NUL-terminated and
//!   padded to 4
//!
//! Only the three argument types the devices use are supported; a datagram
//! carrying any other tag is rejected with [`DecodeError::UnknownTypeTag`].

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// A single typed OSC argument.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    /// 32-bit big-endian signed integer (`i`).
    Int(i32),
    /// 32-bit big-endian IEEE float (`f`).
    Float(f32),
    /// NUL-terminated, 4-byte padded string (`s`).
    Str(String),
}

impl OscArg {
    fn type_tag(&self) -> u8 {
        match self {
            OscArg::Int(_) => b'i',
            OscArg::Float(_) => b'f',
            OscArg::Str(_) => b's',
        }
    }
}

impl From<i32> for OscArg {
    fn from(v: i32) -> Self {
        OscArg::Int(v)
    }
}

impl From<f32> for OscArg {
    fn from(v: f32) -> Self {
        OscArg::Float(v)
    }
}

impl From<&str> for OscArg {
    fn from(v: &str) -> Self {
        OscArg::Str(v.to_string())
    }
}

impl From<String> for OscArg {
    fn from(v: String) -> Self {
        OscArg::Str(v)
    }
}

/// A decoded (or to-be-encoded) OSC message: address plus ordered arguments.
///
/// Constructed fresh per send and decoded fresh per receive; never reused.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    /// Address pattern, always starting with `/`.
    pub addr: String,
    /// Ordered typed arguments.
    pub args: Vec<OscArg>,
}

impl OscMessage {
    /// Creates a message with no arguments.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument (builder style).
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OscArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Returns the first argument as an int, if present and of that type.
    #[must_use]
    pub fn int_arg(&self) -> Option<i32> {
        match self.args.first() {
            Some(OscArg::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the first argument as a float, if present and of that type.
    #[must_use]
    pub fn float_arg(&self) -> Option<f32> {
        match self.args.first() {
            Some(OscArg::Float(v)) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for OscMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.addr)?;
        for arg in &self.args {
            match arg {
                OscArg::Int(v) => write!(f, " {}", v)?,
                OscArg::Float(v) => write!(f, " {}", v)?,
                OscArg::Str(v) => write!(f, " \"{}\"", v)?,
            }
        }
        Ok(())
    }
}

/// Errors raised while decoding an inbound datagram.
///
/// Malformed datagrams are dropped and logged by the receiver; decoding
/// failures never tear down the receive loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Datagram shorter than its declared layout.
    #[error("datagram truncated at byte {0}")]
    Truncated(usize),

    /// Address does not start with `/`.
    #[error("address must start with '/': {0:?}")]
    BadAddress(String),

    /// Type tag string missing or not starting with `,`.
    #[error("missing or malformed type tag string")]
    BadTypeTags,

    /// A tag other than `i`, `f` or `s`.
    #[error("unsupported type tag '{0}'")]
    UnknownTypeTag(char),

    /// A string field is not valid UTF-8.
    #[error("string argument is not valid UTF-8")]
    BadUtf8,
}

/// Pads `buf` with NULs up to the next 4-byte boundary.
fn pad_to_4(buf: &mut BytesMut) {
    while buf.len() % 4 != 0 {
        buf.put_u8(0);
    }
}

/// Writes a NUL-terminated, 4-byte padded OSC string.
fn put_padded_str(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
    pad_to_4(buf);
}

/// Encodes a message into its OSC 1.0 wire form.
#[must_use]
pub fn encode(msg: &OscMessage) -> Bytes {
    let mut buf = BytesMut::with_capacity(64);

    put_padded_str(&mut buf, &msg.addr);

    let mut tags = BytesMut::with_capacity(msg.args.len() + 1);
    tags.put_u8(b',');
    for arg in &msg.args {
        tags.put_u8(arg.type_tag());
    }
    // Tags form an OSC string themselves
    buf.put_slice(&tags);
    buf.put_u8(0);
    pad_to_4(&mut buf);

    for arg in &msg.args {
        match arg {
            OscArg::Int(v) => buf.put_i32(*v),
            OscArg::Float(v) => buf.put_f32(*v),
            OscArg::Str(v) => put_padded_str(&mut buf, v),
        }
    }

    buf.freeze()
}

/// Reads a NUL-terminated padded OSC string starting at `pos`.
///
/// Returns the string and the position after its padding.
fn read_padded_str(data: &[u8], pos: usize) -> Result<(String, usize), DecodeError> {
    let rest = data.get(pos..).ok_or(DecodeError::Truncated(pos))?;
    let nul = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(DecodeError::Truncated(data.len()))?;
    let s = std::str::from_utf8(&rest[..nul])
        .map_err(|_| DecodeError::BadUtf8)?
        .to_string();
    // Consumed bytes include the NUL, rounded up to the 4-byte boundary
    let consumed = (nul + 1).div_ceil(4) * 4;
    if pos + consumed > data.len() {
        return Err(DecodeError::Truncated(data.len()));
    }
    Ok((s, pos + consumed))
}

/// Reads a big-endian 4-byte field starting at `pos`.
fn read_word(data: &[u8], pos: usize) -> Result<([u8; 4], usize), DecodeError> {
    let bytes = data
        .get(pos..pos + 4)
        .ok_or(DecodeError::Truncated(data.len()))?;
    Ok(([bytes[0], bytes[1], bytes[2], bytes[3]], pos + 4))
}

/// Decodes an OSC 1.0 datagram into a message.
pub fn decode(data: &[u8]) -> Result<OscMessage, DecodeError> {
    let (addr, pos) = read_padded_str(data, 0)?;
    if !addr.starts_with('/') {
        return Err(DecodeError::BadAddress(addr));
    }

    // A bare address with no type tag string is tolerated as a zero-arg
    // message; some senders omit the tags entirely.
    if pos >= data.len() {
        return Ok(OscMessage::new(addr));
    }

    let (tags, mut pos) = read_padded_str(data, pos)?;
    let tags = tags.strip_prefix(',').ok_or(DecodeError::BadTypeTags)?;

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        match tag {
            'i' => {
                let (word, next) = read_word(data, pos)?;
                args.push(OscArg::Int(i32::from_be_bytes(word)));
                pos = next;
            }
            'f' => {
                let (word, next) = read_word(data, pos)?;
                args.push(OscArg::Float(f32::from_be_bytes(word)));
                pos = next;
            }
            's' => {
                let (s, next) = read_padded_str(data, pos)?;
                args.push(OscArg::Str(s));
                pos = next;
            }
            other => return Err(DecodeError::UnknownTypeTag(other)),
        }
    }

    Ok(OscMessage { addr, args })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_pads_address_and_tags_to_four_bytes() {
        let wire = encode(&OscMessage::new("/play").arg(1));
        // "/play\0\0\0" + ",i\0\0" + int32
        assert_eq!(wire.len(), 8 + 4 + 4);
        assert_eq!(&wire[..8], b"/play\0\0\0");
        assert_eq!(&wire[8..12], b",i\0\0");
        assert_eq!(&wire[12..], &[0, 0, 0, 1]);
    }

    #[test]
    fn encode_address_ending_on_boundary_still_gets_nul() {
        // 3-char address: "/ab" + NUL lands exactly on the boundary
        let wire = encode(&OscMessage::new("/ab"));
        assert_eq!(&wire[..4], b"/ab\0");
        // 4-char address needs a full pad word for its terminator
        let wire = encode(&OscMessage::new("/abc"));
        assert_eq!(&wire[..8], b"/abc\0\0\0\0");
    }

    #[test]
    fn round_trip_mixed_args() {
        let msg = OscMessage::new("/cues/Bank-1/scenes/by_name/intro")
            .arg(7)
            .arg(0.25f32)
            .arg("stimulus a");
        assert_eq!(decode(&encode(&msg)).unwrap(), msg);
    }

    #[test]
    fn round_trip_no_args() {
        let msg = OscMessage::new("/help_request");
        assert_eq!(decode(&encode(&msg)).unwrap(), msg);
    }

    #[test]
    fn round_trip_negative_int_and_empty_string() {
        let msg = OscMessage::new("/action").arg(-40160).arg("");
        assert_eq!(decode(&encode(&msg)).unwrap(), msg);
    }

    #[test]
    fn decode_rejects_missing_slash() {
        let wire = encode(&OscMessage::new("play"));
        assert!(matches!(decode(&wire), Err(DecodeError::BadAddress(_))));
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        // Hand-build "/x" + ",b" + blob length
        let data = b"/x\0\0,b\0\0\0\0\0\x04";
        assert_eq!(decode(data), Err(DecodeError::UnknownTypeTag('b')));
    }

    #[test]
    fn decode_rejects_truncated_int() {
        let mut wire = encode(&OscMessage::new("/play").arg(1)).to_vec();
        wire.truncate(wire.len() - 2);
        assert!(matches!(decode(&wire), Err(DecodeError::Truncated(_))));
    }

    #[test]
    fn decode_rejects_unterminated_address() {
        assert!(matches!(
            decode(b"/pla"),
            Err(DecodeError::Truncated(_))
        ));
    }

    #[test]
    fn decode_tolerates_missing_type_tags() {
        // Address only, no tag string: zero-arg message
        let msg = decode(b"/stop\0\0\0").unwrap();
        assert_eq!(msg, OscMessage::new("/stop"));
    }

    #[test]
    fn decode_rejects_tags_without_comma() {
        assert_eq!(decode(b"/x\0\0if\0\0"), Err(DecodeError::BadTypeTags));
    }

    #[test]
    fn display_is_readable() {
        let msg = OscMessage::new("/track/3/mute").arg(0);
        assert_eq!(msg.to_string(), "/track/3/mute 0");
    }
}
