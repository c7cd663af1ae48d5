//! A thin synchronous RPC client: one TCP connection per [`CabinetClient`],
//! one request per round trip, with a leading database-name argument on
//! every call and typed keys on the wire.

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};

use serde::Deserialize;
use serde_json::Deserializer;

use crate::resp::{DbInfo, KeyArg, Request, Response};
use crate::{CabinetError, Result};
use std::collections::HashMap;

/// Connected client for the Cabinet RPC surface.
pub struct CabinetClient {
    reader: Deserializer<serde_json::de::IoRead<BufReader<TcpStream>>>,
    writer: BufWriter<TcpStream>,
}

impl CabinetClient {
    /// Connects to a `cabinetd` instance at `addr`.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let writer = BufWriter::new(stream.try_clone()?);
        let reader = Deserializer::from_reader(BufReader::new(stream));
        Ok(CabinetClient { reader, writer })
    }

    fn call(&mut self, req: Request) -> Result<Response> {
        serde_json::to_writer(&mut self.writer, &req)?;
        self.writer.flush()?;
        Response::deserialize(&mut self.reader).map_err(CabinetError::from)
    }

    /// `Ping() -> "pong"`.
    pub fn ping(&mut self) -> Result<()> {
        match self.call(Request::Ping)? {
            Response::Pong => Ok(()),
            unexpected => Err(protocol_error(unexpected)),
        }
    }

    /// Metadata + counters for every open database.
    pub fn server_info(&mut self) -> Result<HashMap<String, DbInfo>> {
        match self.call(Request::GetServerInfo)? {
            Response::ServerInfo(info) => Ok(info),
            unexpected => Err(protocol_error(unexpected)),
        }
    }

    /// Creates a new database.
    pub fn create(&mut self, name: &str, key_type: crate::key::KeyType, compressed: bool) -> Result<()> {
        self.expect_ok(Request::Create {
            name: name.to_string(),
            key_type,
            compressed,
        })
    }

    /// Drops (clears) a database.
    pub fn drop_db(&mut self, name: &str) -> Result<()> {
        self.expect_ok(Request::Drop {
            name: name.to_string(),
        })
    }

    /// Triggers compaction on a database.
    pub fn compact(&mut self, name: &str) -> Result<()> {
        self.expect_ok(Request::Compact {
            name: name.to_string(),
        })
    }

    /// Triggers a flush on a database.
    pub fn flush(&mut self, name: &str) -> Result<()> {
        self.expect_ok(Request::Flush {
            name: name.to_string(),
        })
    }

    /// Fetches one database's metadata and counters.
    pub fn get_db_info(&mut self, name: &str) -> Result<DbInfo> {
        match self.call(Request::GetDbInfo {
            name: name.to_string(),
        })? {
            Response::Info(info) => Ok(info),
            unexpected => Err(protocol_error(unexpected)),
        }
    }

    /// Fetches one value.
    pub fn get(&mut self, name: &str, key: KeyArg) -> Result<Option<Vec<u8>>> {
        match self.call(Request::Get {
            name: name.to_string(),
            key,
        })? {
            Response::Value(v) => Ok(v),
            unexpected => Err(protocol_error(unexpected)),
        }
    }

    /// Stores one value.
    pub fn set(&mut self, name: &str, key: KeyArg, value: Vec<u8>) -> Result<()> {
        self.expect_ok(Request::Set {
            name: name.to_string(),
            key,
            value,
        })
    }

    /// Deletes one key.
    pub fn delete(&mut self, name: &str, key: KeyArg) -> Result<()> {
        self.expect_ok(Request::Delete {
            name: name.to_string(),
            key,
        })
    }

    /// Fetches many values in one round trip.
    pub fn batch_get(&mut self, name: &str, keys: Vec<KeyArg>) -> Result<Vec<Option<Vec<u8>>>> {
        match self.call(Request::BatchGet {
            name: name.to_string(),
            keys,
        })? {
            Response::Values(vs) => Ok(vs),
            unexpected => Err(protocol_error(unexpected)),
        }
    }

    /// Stores many values in one round trip.
    pub fn batch_set(&mut self, name: &str, keys: Vec<KeyArg>, values: Vec<Vec<u8>>) -> Result<()> {
        self.expect_ok(Request::BatchSet {
            name: name.to_string(),
            keys,
            values,
        })
    }

    /// Deletes many keys in one round trip.
    pub fn batch_delete(&mut self, name: &str, keys: Vec<KeyArg>) -> Result<()> {
        self.expect_ok(Request::BatchDelete {
            name: name.to_string(),
            keys,
        })
    }

    fn expect_ok(&mut self, req: Request) -> Result<()> {
        match self.call(req)? {
            Response::Ok => Ok(()),
            unexpected => Err(protocol_error(unexpected)),
        }
    }
}

fn protocol_error(resp: Response) -> CabinetError {
    match resp {
        Response::Err(msg) => CabinetError::Other(msg),
        other => CabinetError::Other(format!("unexpected response: {:?}", other)),
    }
}
