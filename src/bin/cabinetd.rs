use std::net::SocketAddr;
use std::process::exit;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, LevelFilter};

use cabinet::registry::Registry;
use cabinet::thread_pool::{RayonThreadPool, ThreadPool};
use cabinet::{default_data_root, pidfile::PidFile, CabinetServer, Result};

const DEFAULT_ADDR: &str = "127.0.0.1:4000";

/// Flags for the `cabinetd` server.
#[derive(Parser)]
#[clap(author, version, about)]
#[clap(propagate_version = true)]
struct ServerArgs {
    /// Directory holding one subdirectory per database.
    #[clap(long, value_parser)]
    data_root: Option<std::path::PathBuf>,
    /// Listening address, default is 127.0.0.1:4000.
    #[clap(long, value_parser)]
    addr: Option<SocketAddr>,
    /// Optional log file path; falls back to stderr when omitted.
    #[clap(long, value_parser)]
    log_path: Option<std::path::PathBuf>,
    /// Daemonize after startup (detach from the controlling terminal).
    #[clap(long)]
    daemonize: bool,
    /// Hint, in seconds, for a background flush ticker. Not yet wired to
    /// a ticker thread; reserved for operators tuning flush cadence.
    #[clap(long, value_parser)]
    flush_interval_secs: Option<u64>,
}

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let cli = ServerArgs::parse();

    let data_root = cli.data_root.unwrap_or_else(default_data_root);
    let addr = cli.addr.unwrap_or(DEFAULT_ADDR.parse().unwrap());

    if cli.daemonize {
        info!("daemonize requested; cabinetd runs in the foreground in this build");
    }

    info!("cabinetd {}", env!("CARGO_PKG_VERSION"));
    info!("data root: {:?}", data_root);
    info!("listening on {:?}", addr);

    if let Err(e) = run(data_root, addr) {
        error!("{}", e);
        exit(1);
    }
}

fn run(data_root: std::path::PathBuf, addr: SocketAddr) -> Result<()> {
    let pid_file = PidFile::acquire(&data_root)?;

    let registry = Registry::open(&data_root)?;
    let pool = RayonThreadPool::new(num_cpus::get())?;
    let server = CabinetServer::new(registry, pool);

    let shutdown = server.shutdown_flag();
    install_shutdown_handler(Arc::clone(&shutdown));

    server.run(addr)?;
    info!("graceful shutdown complete");
    drop(pid_file);
    Ok(())
}

/// Flips the shutdown flag on SIGINT/SIGTERM so the accept loop stops
/// taking new connections instead of the process dying mid-request.
fn install_shutdown_handler(shutdown: Arc<std::sync::atomic::AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        shutdown.store(true, Ordering::SeqCst);
    }) {
        error!("could not install shutdown handler: {}", e);
    }
}
