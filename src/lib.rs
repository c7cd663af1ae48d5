#![deny(missing_docs)]
//! Cabinet: an embedded, append-only key/value storage engine with an
//! in-memory index, exposed by a network service that multiplexes many
//! named databases.

pub mod block;
pub mod client;
pub mod engine;
mod error;
pub mod key;
pub mod meta;
pub mod pidfile;
pub mod registry;
pub mod resp;
pub mod server;
pub mod thread_pool;

pub use client::CabinetClient;
pub use engine::Cabinet;
pub use error::{CabinetError, Result};
pub use registry::Registry;
pub use server::CabinetServer;

use std::path::PathBuf;

/// Default data root for `cabinetd`, used when `--data-root` is omitted.
pub fn default_data_root() -> PathBuf {
    let mut dir = std::env::current_dir().unwrap();
    dir.push("data/cabinet");
    dir
}
