//! Key-variant polymorphism.
//!
//! A database is fixed, at open time, to exactly one key shape: unsigned
//! 32-bit integer, unsigned 64-bit integer, or a byte string. Rather than
//! carry a runtime discriminator through the hot read/write path, each
//! shape gets its own concrete [`Cabinet<K>`](crate::engine::Cabinet)
//! instantiation, and `K` itself only needs to know how to serialize,
//! parse, and hash itself.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

/// Capability set a key type must implement to back a [`Cabinet`](crate::engine::Cabinet).
pub trait KeyCodec: Eq + std::hash::Hash + Clone + fmt::Debug + Send + Sync + 'static {
    /// Append this key's on-disk representation to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    /// Parse one key from `r`. Returns `Ok(None)` on a clean EOF before any
    /// byte of the key is read (a torn trailing record ends here); returns
    /// `Err` for a short read that started consuming bytes.
    fn decode(r: &mut impl Read) -> io::Result<Option<Self>>
    where
        Self: Sized;
}

impl KeyCodec for u32 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn decode(r: &mut impl Read) -> io::Result<Option<Self>> {
        let mut buf = [0u8; 4];
        match read_exact_or_eof(r, &mut buf)? {
            true => Ok(Some(u32::from_le_bytes(buf))),
            false => Ok(None),
        }
    }
}

impl KeyCodec for u64 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn decode(r: &mut impl Read) -> io::Result<Option<Self>> {
        let mut buf = [0u8; 8];
        match read_exact_or_eof(r, &mut buf)? {
            true => Ok(Some(u64::from_le_bytes(buf))),
            false => Ok(None),
        }
    }
}

/// A variable-length byte string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringKey(
    /// Raw key bytes.
    pub Vec<u8>,
);

impl From<&str> for StringKey {
    fn from(s: &str) -> Self {
        StringKey(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for StringKey {
    fn from(v: Vec<u8>) -> Self {
        StringKey(v)
    }
}

impl KeyCodec for StringKey {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.0.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.0);
    }

    fn decode(r: &mut impl Read) -> io::Result<Option<Self>> {
        let mut len_buf = [0u8; 4];
        if !read_exact_or_eof(r, &mut len_buf)? {
            return Ok(None);
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut bytes = vec![0u8; len];
        r.read_exact(&mut bytes)?;
        Ok(Some(StringKey(bytes)))
    }
}

/// Reads `buf.len()` bytes, returning `Ok(false)` iff zero bytes were
/// available (a clean EOF at a record boundary) and `Err`/`Ok(true)`
/// otherwise. A short, non-empty read is reported as an `UnexpectedEof`
/// error rather than folded into the "clean EOF" case, so torn writes that
/// start mid-key are distinguishable from the expected end-of-log case by
/// callers that want to (the index replay in `engine` treats both as "stop
/// here": a partial trailing record is silently ignored).
fn read_exact_or_eof(r: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    let mut read = 0;
    while read < buf.len() {
        match r.read(&mut buf[read..]) {
            Ok(0) => {
                if read == 0 {
                    return Ok(false);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "torn record in index log",
                ));
            }
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// The key shape a database was created with, persisted in its meta file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum KeyType {
    /// Unsigned 32-bit integer keys.
    I32,
    /// Unsigned 64-bit integer keys.
    I64,
    /// Variable-length byte string keys.
    #[serde(rename = "STRING")]
    String,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeyType::I32 => "I32",
            KeyType::I64 => "I64",
            KeyType::String => "STRING",
        };
        f.write_str(s)
    }
}

impl FromStr for KeyType {
    type Err = crate::CabinetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "I32" => Ok(KeyType::I32),
            "I64" => Ok(KeyType::I64),
            "STRING" => Ok(KeyType::String),
            other => Err(crate::CabinetError::FileCorrupt(format!(
                "unknown key type {:?} in meta file",
                other
            ))),
        }
    }
}
