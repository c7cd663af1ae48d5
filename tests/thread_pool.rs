use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cabinet::{thread_pool::*, Result};
use crossbeam_utils::sync::WaitGroup;

/// Simulates a burst of connections each issuing a batch of RPCs against
/// a shared counter, the way concurrent clients hammering one database
/// would serialize through its writes.
fn handle_connections(pool: &RayonThreadPool) {
    const CONNECTIONS: usize = 20;
    const REQUESTS_PER_CONNECTION: usize = 1000;

    let wg = WaitGroup::new();
    let requests_served = Arc::new(AtomicUsize::new(0));

    for _ in 0..CONNECTIONS {
        let requests_served = Arc::clone(&requests_served);
        let wg = wg.clone();
        pool.spawn(move || {
            for _ in 0..REQUESTS_PER_CONNECTION {
                requests_served.fetch_add(1, Ordering::SeqCst);
            }
            drop(wg);
        })
    }

    wg.wait();
    assert_eq!(
        requests_served.load(Ordering::SeqCst),
        CONNECTIONS * REQUESTS_PER_CONNECTION
    );
}

#[test]
fn pool_dispatches_every_connection() -> Result<()> {
    let pool = RayonThreadPool::new(4)?;
    handle_connections(&pool);
    Ok(())
}

#[test]
fn pool_serializes_writes_through_a_shared_handle() -> Result<()> {
    const CONNECTIONS: usize = 20;

    let pool = RayonThreadPool::new(4)?;
    let entry_count = Arc::new(Mutex::new(0));

    (0..CONNECTIONS).for_each(|_| {
        let entry_count = entry_count.clone();
        pool.spawn(move || {
            let mut count = entry_count.lock().unwrap();
            *count += 1;
        })
    });
    drop(pool);

    assert_eq!(*entry_count.lock().unwrap(), CONNECTIONS);
    Ok(())
}

#[test]
fn scoped_compact_sweep_joins_before_returning() -> Result<()> {
    const DATABASES: usize = 20;

    let pool = RayonThreadPool::new(4)?;
    let compacted = Arc::new(Mutex::new(0));

    (0..DATABASES).for_each(|_| {
        let compacted = compacted.clone();
        pool.scope(move |_| {
            let mut count = compacted.lock().unwrap();
            *count += 1;
        })
    });

    assert_eq!(*compacted.lock().unwrap(), DATABASES);
    Ok(())
}

#[test]
fn a_panicking_handler_does_not_take_down_the_pool() -> Result<()> {
    const FAILING_REQUESTS: usize = 1000;

    let pool = RayonThreadPool::new(4)?;
    for _ in 0..FAILING_REQUESTS {
        pool.spawn(move || {
            // Suppresses the flood of panic messages this test would
            // otherwise print to the console.
            panic_control::disable_hook_in_current_thread();
            panic!("simulated malformed request");
        })
    }

    handle_connections(&pool);
    Ok(())
}
