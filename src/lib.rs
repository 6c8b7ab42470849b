//! A multi-priority work-stealing task scheduler.
//!
//! `spindle` runs short, independent closures on a fixed pool of worker
//! threads. Each worker owns a [`queue::WorkQueue`]: four [`deque::WorkDeque`]
//! lanes, one per [`Priority`]. Submissions are dispatched round-robin
//! across the queues; a worker whose own lanes are empty steals from its
//! peers, highest priority first. Dropping the [`Scheduler`] drains the
//! queued work and joins every worker.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let scheduler = spindle::Builder::new().worker_threads(2).try_build()?;
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! for _ in 0..100 {
//!     let counter = Arc::clone(&counter);
//!     scheduler.schedule(move || {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!     });
//! }
//!
//! // Dropping the scheduler waits for the queues to drain.
//! drop(scheduler);
//! assert_eq!(counter.load(Ordering::Relaxed), 100);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Tasks have no return values and no completion signal; callers observe
//! completion through their own shared state, as above.

pub mod deque;

pub mod priority;
pub use priority::Priority;

pub mod queue;

pub mod registry;
pub use registry::{get_system_scheduler, set_system_scheduler};

pub mod scheduler;
pub use scheduler::{Builder, Schedule, Scheduler};

pub mod task;
pub use task::Task;

mod topology;

/// Enqueue a closure on the process-wide scheduler at [`Priority::Normal`].
pub fn schedule<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    schedule_with_priority(f, Priority::default());
}

/// Enqueue a closure on the process-wide scheduler at the given priority.
pub fn schedule_with_priority<F>(f: F, priority: Priority)
where
    F: FnOnce() + Send + 'static,
{
    get_system_scheduler(Priority::default()).schedule_task(Task::new(f), priority);
}
