//! PID lock file discipline: one cabinetd process at a time may own a
//! given data root. A non-empty `cabinetd.pid` at startup means a prior
//! process exited without cleaning up and the operator must look into it.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::{CabinetError, Result};

/// Name of the PID lock file inside a data root.
pub const PID_FILE_NAME: &str = "cabinetd.pid";

/// Guard owning the PID lock file; truncates it to empty on drop so a
/// clean shutdown doesn't look like a crash to the next startup.
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Acquires the lock file under `data_root`, refusing to start if it
    /// already exists and is non-empty.
    pub fn acquire(data_root: impl AsRef<Path>) -> Result<Self> {
        let path = data_root.as_ref().join(PID_FILE_NAME);

        if let Ok(metadata) = fs::metadata(&path) {
            if metadata.len() > 0 {
                return Err(CabinetError::StartupLocked(path));
            }
            warn!("found empty stale pid file at {:?}, reusing it", path);
        }

        fs::write(&path, std::process::id().to_string())
            .map_err(|e| CabinetError::write(&path, e))?;

        Ok(PidFile { path })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::write(&self.path, b"") {
            warn!("could not clear pid file {:?} on shutdown: {}", self.path, e);
        }
    }
}
