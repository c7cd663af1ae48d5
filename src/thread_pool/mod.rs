//! The worker pool a [`crate::CabinetServer`] hands accepted connections
//! off to, so a slow client or a long-running `Compact` on one database
//! doesn't stall RPCs against another. Kept as a trait, rather than a bare
//! type alias over [`RayonThreadPool`], so the server stays generic over
//! the dispatch strategy even though only one implementation ships today.

use crate::Result;

mod rayon;

pub use self::rayon::RayonThreadPool;

/// A pool of worker threads a server can hand connection-handling jobs to.
pub trait ThreadPool {
    /// Creates a new thread pool, immediately spawning the specified number
    /// of threads.
    ///
    /// Returns an error if any thread fails to spawn. All previously-spawned
    /// threads are terminated.
    fn new(num_threads: usize) -> Result<Self>
    where
        Self: Sized;
    /// Spawns a function into the thread pool.
    ///
    /// Spawning always succeeds, but if the function panics the pool keeps
    /// serving other connections on its remaining threads — one client's
    /// malformed request must not take the whole server down.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}
