//! Work-stealing scheduler: round-robin dispatch of submitted tasks across
//! per-worker multi-priority queues, with stealing on a miss.

use crate::priority::Priority;
use crate::task::Task;
use std::sync::Arc;

// Public API
pub mod config;
pub use config::Builder;

pub mod scheduler;
pub use scheduler::Scheduler;

mod pool;

mod worker;


/// The submission contract.
///
/// [`Scheduler`] is the in-process implementation; an embedding application
/// may install an alternative (for example one that routes onto a host
/// dispatch facility) via [`crate::set_system_scheduler`]. Implementations
/// must not block and must not panic through any of these methods; a task
/// submitted after [`Schedule::set_stopped`] is dropped silently.
pub trait Schedule: Send + Sync {
    /// Enqueue a task at the given priority.
    fn schedule_task(&self, task: Task, priority: Priority);

    /// Deliver an opaque error to the scheduler's error sink.
    fn set_error(&self, error: anyhow::Error);

    /// Latch shutdown. Idempotent; queued tasks still drain.
    fn set_stopped(&self);

    /// Current worker count.
    fn active_thread_count(&self) -> u32;

    /// The scheduler's nominal priority. Advisory only; per-task priorities
    /// are unaffected.
    fn priority(&self) -> Priority;

    fn set_priority(&self, priority: Priority);

    /// Decompose the range `[0, n)` into chunks and submit each chunk as one
    /// task invoking `task_fn(i)` for every `i` it covers.
    ///
    /// The chunk count is `max(active_thread_count * 8, n)` (clamped to at
    /// least 1) and chunk sizes differ by at most one; empty chunks are
    /// skipped. Each chunk task goes through [`Schedule::schedule_task`] and
    /// is dispatched like any other submission.
    fn bulk_schedule(&self, n: u32, task_fn: Arc<dyn Fn(u32) + Send + Sync>, priority: Priority) {
        let active = self.active_thread_count();
        let num_chunks = (active * 8).max(n).max(1);
        let chunk_size = n / num_chunks;
        let remainder = n % num_chunks;

        for chunk in 0..num_chunks {
            let start = chunk * chunk_size + chunk.min(remainder);
            let end = start + chunk_size + u32::from(chunk < remainder);
            if start < end {
                let task_fn = Arc::clone(&task_fn);
                self.schedule_task(
                    Task::new(move || {
                        for i in start..end {
                            task_fn(i);
                        }
                    }),
                    priority,
                );
            }
        }
    }
}
