use std::net::SocketAddr;
use std::process::exit;

use clap::{Parser, Subcommand};
use log::{error, LevelFilter};

use cabinet::key::KeyType;
use cabinet::resp::KeyArg;
use cabinet::{CabinetClient, Result};

const DEFAULT_ADDR: &str = "127.0.0.1:4000";

/// `cabinet-cli`: a thin client for exercising a running `cabinetd`.
#[derive(Parser)]
#[clap(author, version, about)]
#[clap(propagate_version = true)]
struct CliArgs {
    /// Subcommand.
    #[clap(subcommand)]
    command: Commands,
    /// Server address, default is 127.0.0.1:4000.
    #[clap(short, long, global = true, value_parser)]
    addr: Option<SocketAddr>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a new database.
    Create {
        /// Database name.
        name: String,
        /// Key type: i32, i64, or string.
        #[clap(long, value_parser = ["i32", "i64", "string"])]
        key_type: String,
    },
    /// Drop (clear) a database.
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
    /// Print a database's metadata and counters.
    Info {
        /// Database name.
        name: String,
    },
    /// Get a value. The key is parsed as the given integer type, or taken
    /// as a raw UTF-8 string otherwise.
    Get {
        /// Database name.
        name: String,
        /// Key.
        key: String,
        /// Key type: i32, i64, or string.
        #[clap(long, default_value = "string")]
        key_type: String,
    },
    /// Set a value.
    Set {
        /// Database name.
        name: String,
        /// Key.
        key: String,
        /// Value.
        value: String,
        /// Key type: i32, i64, or string.
        #[clap(long, default_value = "string")]
        key_type: String,
    },
    /// Delete a key.
    Delete {
        /// Database name.
        name: String,
        /// Key.
        key: String,
        /// Key type: i32, i64, or string.
        #[clap(long, default_value = "string")]
        key_type: String,
    },
}

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    if let Err(e) = run() {
        error!("{}", e);
        exit(1);
    }
}

fn parse_key(raw: &str, key_type: &str) -> Result<KeyArg> {
    match key_type {
        "i32" => Ok(KeyArg::U32(raw.parse().map_err(|_| {
            cabinet::CabinetError::BadDbName(format!("{:?} is not a valid u32 key", raw))
        })?)),
        "i64" => Ok(KeyArg::U64(raw.parse().map_err(|_| {
            cabinet::CabinetError::BadDbName(format!("{:?} is not a valid u64 key", raw))
        })?)),
        _ => Ok(KeyArg::Bytes(raw.as_bytes().to_vec())),
    }
}

fn run() -> Result<()> {
    let cli = CliArgs::parse();
    let addr = cli.addr.unwrap_or(DEFAULT_ADDR.parse().unwrap());
    let mut client = CabinetClient::connect(addr)?;

    match cli.command {
        Commands::Create { name, key_type } => {
            let key_type = match key_type.as_str() {
                "i32" => KeyType::I32,
                "i64" => KeyType::I64,
                _ => KeyType::String,
            };
            client.create(&name, key_type, false)?;
        }
        Commands::Drop { name } => client.drop_db(&name)?,
        Commands::Compact { name } => client.compact(&name)?,
        Commands::Flush { name } => client.flush(&name)?,
        Commands::Info { name } => {
            let info = client.get_db_info(&name)?;
            println!("{:?}", info);
        }
        Commands::Get {
            name,
            key,
            key_type,
        } => {
            let key = parse_key(&key, &key_type)?;
            match client.get(&name, key)? {
                Some(value) => println!("{}", String::from_utf8_lossy(&value)),
                None => println!("Key not found"),
            }
        }
        Commands::Set {
            name,
            key,
            value,
            key_type,
        } => {
            let key = parse_key(&key, &key_type)?;
            client.set(&name, key, value.into_bytes())?;
        }
        Commands::Delete {
            name,
            key,
            key_type,
        } => {
            let key = parse_key(&key, &key_type)?;
            client.delete(&name, key)?;
        }
    }

    Ok(())
}
