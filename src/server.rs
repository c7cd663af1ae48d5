//! The Cabinet RPC server: accepts TCP connections and dispatches each
//! request against the [`Registry`], multiplexing named databases and
//! handing each connection off to a worker pool so concurrent RPCs run
//! on parallel OS threads rather than one at a time on the accept loop.

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info};
use serde_json::Deserializer;

use crate::meta::Meta;
use crate::registry::Registry;
use crate::resp::{Request, Response};
use crate::thread_pool::ThreadPool;
use crate::Result;

/// The RPC server, parameterized over the worker pool implementation used
/// to dispatch connections.
pub struct CabinetServer<P: ThreadPool> {
    registry: Arc<Registry>,
    pool: P,
    shutdown: Arc<AtomicBool>,
}

impl<P: ThreadPool> CabinetServer<P> {
    /// Builds a server over `registry`, dispatching connections onto
    /// `pool`.
    pub fn new(registry: Registry, pool: P) -> Self {
        CabinetServer {
            registry: Arc::new(registry),
            pool,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A clone of the shutdown flag; a signal handler installed by the
    /// binary flips this to request a graceful stop: the accept loop
    /// stops taking new connections and exits once the flag is set.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Accepts connections on `addr`, dispatching each to the worker
    /// pool, until the shutdown flag is set.
    pub fn run<A: ToSocketAddrs>(self, addr: A) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        for stream in listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("shutdown requested, no longer accepting connections");
                break;
            }
            match stream {
                Ok(stream) => {
                    stream.set_nonblocking(false)?;
                    let registry = Arc::clone(&self.registry);
                    self.pool.spawn(move || {
                        if let Err(e) = handle_stream(&registry, stream) {
                            error!("error serving client: {}", e);
                        }
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(20));
                }
                Err(e) => error!("connection failed: {}", e),
            }
        }
        Ok(())
    }
}

fn handle_stream(registry: &Registry, stream: TcpStream) -> Result<()> {
    let peer_addr = stream.peer_addr()?;
    let reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);
    let req_deserializer = Deserializer::from_reader(reader).into_iter::<Request>();

    macro_rules! send_resp {
        ($resp:expr) => {{
            let resp = $resp;
            serde_json::to_writer(&mut writer, &resp)?;
            writer.flush()?;
            debug!("response sent to {}: {:?}", peer_addr, resp);
        }};
    }

    for req in req_deserializer {
        let req = req?;
        debug!("request from {}: {:?}", peer_addr, req);
        send_resp!(dispatch(registry, req));
    }
    Ok(())
}

fn dispatch(registry: &Registry, req: Request) -> Response {
    match handle(registry, req) {
        Ok(resp) => resp,
        Err(e) => Response::Err(e.to_string()),
    }
}

fn handle(registry: &Registry, req: Request) -> Result<Response> {
    match req {
        Request::Ping => Ok(Response::Pong),
        Request::GetServerInfo => Ok(Response::ServerInfo(registry.server_info())),
        Request::Create {
            name,
            key_type,
            compressed,
        } => {
            registry.create(&name, Meta::new(key_type, compressed))?;
            Ok(Response::Ok)
        }
        Request::Drop { name } => {
            registry.drop_db(&name)?;
            Ok(Response::Ok)
        }
        Request::Compact { name } => {
            registry.with_exclusive(&name, |c| c.compact())?;
            Ok(Response::Ok)
        }
        Request::Flush { name } => {
            registry.with_exclusive(&name, |c| c.flush())?;
            Ok(Response::Ok)
        }
        Request::GetDbInfo { name } => {
            let info = registry.with_shared(&name, |c| Ok(c.info()))?;
            Ok(Response::Info(info))
        }
        Request::Get { name, key } => {
            let value = registry.with_shared(&name, |c| c.get(&key))?;
            Ok(Response::Value(value))
        }
        Request::Set { name, key, value } => {
            registry.with_exclusive(&name, |c| c.set(&key, &value))?;
            Ok(Response::Ok)
        }
        Request::Delete { name, key } => {
            registry.with_exclusive(&name, |c| c.delete(&key))?;
            Ok(Response::Ok)
        }
        Request::BatchGet { name, keys } => {
            let values = registry.with_shared(&name, |c| {
                keys.iter().map(|k| c.get(k)).collect::<Result<Vec<_>>>()
            })?;
            Ok(Response::Values(values))
        }
        Request::BatchSet { name, keys, values } => {
            registry.with_exclusive(&name, |c| {
                for (k, v) in keys.iter().zip(values.iter()) {
                    c.set(k, v)?;
                }
                Ok(())
            })?;
            Ok(Response::Ok)
        }
        Request::BatchDelete { name, keys } => {
            registry.with_exclusive(&name, |c| {
                for k in &keys {
                    c.delete(k)?;
                }
                Ok(())
            })?;
            Ok(Response::Ok)
        }
    }
}
