use bytes::{Buf, BufMut};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while decoding a wire payload.
///
/// Encoding is infallible; every decoding failure is surfaced through this
/// taxonomy so callers can tell a truncated buffer apart from a payload
/// produced by an incompatible peer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("payload truncated: wanted {wanted} byte(s), {remaining} left")]
    UnexpectedEof { wanted: usize, remaining: usize },
    #[error("invalid length prefix: {0}")]
    InvalidLength(i32),
    #[error("string bytes are not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid boolean byte: {0:#04x}")]
    InvalidBool(u8),
    #[error("unknown {kind} variant: {name:?}")]
    UnknownEnum { kind: &'static str, name: String },
    #[error("absent string where a value is required")]
    AbsentString,
}

/// A value that can be written to the wire. Writing never fails.
pub trait WireEncode {
    fn encode<B: BufMut>(&self, buf: &mut B);

    /// Encodes into a fresh buffer. Convenience for handlers and tests.
    fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

/// A value that can be read back from the wire.
pub trait WireDecode: Sized {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError>;

    /// Decodes from a byte slice, ignoring any trailing bytes.
    fn from_wire(mut bytes: &[u8]) -> Result<Self, CodecError> {
        Self::decode(&mut bytes)
    }
}

fn ensure<B: Buf>(buf: &B, wanted: usize) -> Result<(), CodecError> {
    if buf.remaining() < wanted {
        return Err(CodecError::UnexpectedEof {
            wanted,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

// ============================================================
// PRIMITIVES
// ============================================================

pub fn put_u8<B: BufMut>(buf: &mut B, value: u8) {
    buf.put_u8(value);
}

pub fn get_u8<B: Buf>(buf: &mut B) -> Result<u8, CodecError> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn put_i32<B: BufMut>(buf: &mut B, value: i32) {
    buf.put_i32(value);
}

pub fn get_i32<B: Buf>(buf: &mut B) -> Result<i32, CodecError> {
    ensure(buf, 4)?;
    Ok(buf.get_i32())
}

pub fn put_i64<B: BufMut>(buf: &mut B, value: i64) {
    buf.put_i64(value);
}

pub fn get_i64<B: Buf>(buf: &mut B) -> Result<i64, CodecError> {
    ensure(buf, 8)?;
    Ok(buf.get_i64())
}

pub fn put_bool<B: BufMut>(buf: &mut B, value: bool) {
    buf.put_u8(value as u8);
}

pub fn get_bool<B: Buf>(buf: &mut B) -> Result<bool, CodecError> {
    match get_u8(buf)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::InvalidBool(other)),
    }
}

/// Writes a string as `i32` length + UTF-8 bytes; `None` becomes the `-1` sentinel.
pub fn put_opt_str<B: BufMut>(buf: &mut B, value: Option<&str>) {
    match value {
        Some(s) => {
            buf.put_i32(s.len() as i32);
            buf.put_slice(s.as_bytes());
        }
        None => buf.put_i32(-1),
    }
}

pub fn put_str<B: BufMut>(buf: &mut B, value: &str) {
    put_opt_str(buf, Some(value));
}

pub fn get_opt_str<B: Buf>(buf: &mut B) -> Result<Option<String>, CodecError> {
    let len = get_i32(buf)?;
    if len == -1 {
        return Ok(None);
    }
    if len < 0 {
        return Err(CodecError::InvalidLength(len));
    }

    let len = len as usize;
    ensure(buf, len)?;
    let bytes = buf.copy_to_bytes(len);
    let s = String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)?;
    Ok(Some(s))
}

pub fn get_str<B: Buf>(buf: &mut B) -> Result<String, CodecError> {
    get_opt_str(buf)?.ok_or(CodecError::AbsentString)
}

// ============================================================
// CONTAINERS
// ============================================================

/// Writes a map as `i32` entry count + concatenated `(K, V)` pairs.
///
/// Entries go out in the map's iteration order; decoders never depend on it.
pub fn put_map<B, K, V>(buf: &mut B, map: &BTreeMap<K, V>)
where
    B: BufMut,
    K: WireEncode,
    V: WireEncode,
{
    buf.put_i32(map.len() as i32);
    for (key, value) in map {
        key.encode(buf);
        value.encode(buf);
    }
}

pub fn get_map<B, K, V>(buf: &mut B) -> Result<BTreeMap<K, V>, CodecError>
where
    B: Buf,
    K: WireDecode + Ord,
    V: WireDecode,
{
    let count = get_i32(buf)?;
    if count < 0 {
        return Err(CodecError::InvalidLength(count));
    }

    let mut map = BTreeMap::new();
    for _ in 0..count {
        let key = K::decode(buf)?;
        let value = V::decode(buf)?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Writes a list as `i32` element count + concatenated elements.
pub fn put_list<B, T>(buf: &mut B, list: &[T])
where
    B: BufMut,
    T: WireEncode,
{
    buf.put_i32(list.len() as i32);
    for item in list {
        item.encode(buf);
    }
}

pub fn get_list<B, T>(buf: &mut B) -> Result<Vec<T>, CodecError>
where
    B: Buf,
    T: WireDecode,
{
    let count = get_i32(buf)?;
    if count < 0 {
        return Err(CodecError::InvalidLength(count));
    }

    let mut list = Vec::new();
    for _ in 0..count {
        list.push(T::decode(buf)?);
    }
    Ok(list)
}

impl WireEncode for String {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_str(buf, self);
    }
}

impl WireDecode for String {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        get_str(buf)
    }
}

impl WireEncode for i64 {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_i64(buf, *self);
    }
}

impl WireDecode for i64 {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        get_i64(buf)
    }
}

impl WireEncode for bool {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_bool(buf, *self);
    }
}

impl WireDecode for bool {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        get_bool(buf)
    }
}
