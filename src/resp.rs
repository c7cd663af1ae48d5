//! Wire request/response types for the RPC surface.
//!
//! Framed as newline-delimited JSON: a
//! `serde_json::Deserializer::from_reader(..).into_iter::<Request>()`
//! stream over a `TcpStream`, covering a multi-database, typed-key,
//! batch-capable surface.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::key::KeyType;

/// A key value carried over the wire, tagged by variant so the server can
/// route it to the right `Cabinet<K>` instantiation without the client
/// needing to know the database's static type ahead of time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyArg {
    /// Unsigned 32-bit integer key.
    U32(u32),
    /// Unsigned 64-bit integer key.
    U64(u64),
    /// Byte string key.
    Bytes(Vec<u8>),
}

/// Snapshot of one database's metadata and size counters, returned by
/// `GetDbInfo` and `GetServerInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbInfo {
    /// Key variant the database was created with.
    pub key_type: KeyType,
    /// Reserved compression flag from the meta file.
    pub compressed: bool,
    /// `|orig| + |ins| - |del|`.
    pub entry_count: usize,
    /// Sum of value sizes of all live keys.
    pub data_bytes: u64,
    /// Byte length of the data log.
    pub data_file_size: u64,
}

/// One request frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    /// Liveness check.
    Ping,
    /// Metadata + counters for every open database.
    GetServerInfo,
    /// Create a new database.
    Create {
        /// Database name.
        name: String,
        /// Key variant to create it with.
        key_type: KeyType,
        /// Reserved compression flag.
        compressed: bool,
    },
    /// Remove a database's contents (directory and meta file are kept).
    Drop {
        /// Database name.
        name: String,
    },
    /// Trigger compaction.
    Compact {
        /// Database name.
        name: String,
    },
    /// Trigger a flush.
    Flush {
        /// Database name.
        name: String,
    },
    /// Fetch one database's metadata and counters.
    GetDbInfo {
        /// Database name.
        name: String,
    },
    /// Fetch one value.
    Get {
        /// Database name.
        name: String,
        /// Key to look up.
        key: KeyArg,
    },
    /// Store one value.
    Set {
        /// Database name.
        name: String,
        /// Key to write.
        key: KeyArg,
        /// Value bytes.
        value: Vec<u8>,
    },
    /// Delete one key.
    Delete {
        /// Database name.
        name: String,
        /// Key to delete.
        key: KeyArg,
    },
    /// Fetch many values in one round trip.
    BatchGet {
        /// Database name.
        name: String,
        /// Keys to look up, in order.
        keys: Vec<KeyArg>,
    },
    /// Store many values in one round trip. `keys` and `values` are
    /// zipped positionally.
    BatchSet {
        /// Database name.
        name: String,
        /// Keys to write, in order.
        keys: Vec<KeyArg>,
        /// Values to write, zipped positionally with `keys`.
        values: Vec<Vec<u8>>,
    },
    /// Delete many keys in one round trip.
    BatchDelete {
        /// Database name.
        name: String,
        /// Keys to delete, in order.
        keys: Vec<KeyArg>,
    },
}

/// One response frame. A single enum covers every request kind; callers
/// match the variant they expect and treat any other as a protocol error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    /// Reply to `Ping`.
    Pong,
    /// Reply to `GetServerInfo`.
    ServerInfo(HashMap<String, DbInfo>),
    /// Reply to `Create`/`Drop`/`Compact`/`Flush`/`Set`/`Delete`/
    /// `BatchSet`/`BatchDelete` on success.
    Ok,
    /// Reply to `GetDbInfo`.
    Info(DbInfo),
    /// Reply to `Get`.
    Value(Option<Vec<u8>>),
    /// Reply to `BatchGet`.
    Values(Vec<Option<Vec<u8>>>),
    /// Any request failed; carries the error's `Display` text.
    Err(String),
}
