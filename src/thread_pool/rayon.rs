//! The pool `cabinetd` actually dispatches connections onto: a thin wrapper
//! over `rayon::ThreadPool` sized to the machine's core count by the
//! caller, giving each accepted connection its own worker while capping
//! total concurrency.

use crate::CabinetError;

use super::ThreadPool;

/// A fixed-size pool of worker threads backed by `rayon`.
pub struct RayonThreadPool(rayon::ThreadPool);

impl ThreadPool for RayonThreadPool {
    fn new(num_threads: usize) -> crate::Result<Self>
    where
        Self: Sized,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .panic_handler(|panic| log::error!("worker thread panicked: {:?}", panic))
            .build()
            .map_err(|e| CabinetError::Other(e.to_string()))?;

        Ok(RayonThreadPool(pool))
    }

    /// Hands one connection's request loop to a worker thread. A panic
    /// while handling one client (a malformed request slipping past
    /// deserialization, say) unwinds only that job; the pool keeps the
    /// rest of its threads serving other connections.
    fn spawn<OP>(&self, job: OP)
    where
        OP: FnOnce() + Send + 'static,
    {
        self.0.spawn(job)
    }
}

impl RayonThreadPool {
    /// Runs a scoped closure on this pool, for callers — such as a
    /// `Compact` sweeping multiple databases — that need structured
    /// fork-join parallelism rather than a fire-and-forget job.
    pub fn scope<'a, OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce(&rayon::Scope<'a>) -> R + Send,
        R: Send,
    {
        self.0.scope(op)
    }
}
