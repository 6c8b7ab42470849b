use crate::scheduler::scheduler::Shared;
use crate::scheduler::worker::Worker;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

/// The scheduler's worker threads.
///
/// Join handles live behind a mutex so they can be drained during shutdown.
#[derive(Debug)]
pub(super) struct ThreadPool {
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl ThreadPool {
    /// Spawns one worker per queue. Workers start scanning immediately.
    pub(super) fn spawn(shared: &Arc<Shared>) -> ThreadPool {
        let handles = (0..shared.queues.len())
            .map(|index| spawn_worker_thread(Arc::clone(shared), index))
            .collect();

        ThreadPool {
            handles: Mutex::new(handles),
        }
    }

    /// Joins every worker. Called with the stop flag already latched.
    pub(super) fn join_all(&self) {
        let mut handles = self.handles.lock();
        for handle in handles.drain(..) {
            let name = handle.thread().name().unwrap_or("<unnamed>").to_string();
            if handle.join().is_err() {
                // Task panics are caught inside the worker loop, so a
                // panicked thread means the loop itself failed.
                eprintln!("spindle worker thread {name} panicked");
            }
        }
    }
}

fn spawn_worker_thread(shared: Arc<Shared>, index: usize) -> thread::JoinHandle<()> {
    let mut builder = thread::Builder::new().name(shared.cfg.thread_name.name(index));

    if let Some(stack_size) = shared.cfg.thread_stack_size {
        builder = builder.stack_size(stack_size);
    }

    builder
        .spawn(move || Worker::new(shared, index).run())
        .expect("failed to spawn worker thread")
}
