use crate::priority::Priority;
use crate::queue::WorkQueue;
use crate::scheduler::Schedule;
use crate::scheduler::config::SchedulerConfig;
use crate::scheduler::pool::ThreadPool;
use crate::task::Task;
use crate::topology;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};

/// State shared between the scheduler façade and its workers.
///
/// The scheduler strictly outlives the workers: its drop joins every worker
/// thread before the queue array is released.
#[derive(Debug)]
pub(super) struct Shared {
    /// One multi-priority queue per worker, indexed by worker.
    pub(super) queues: Box<[WorkQueue]>,

    /// Round-robin dispatch counter.
    pub(super) next_queue: AtomicUsize,

    /// Once set, `schedule_task` drops submissions and workers exit as soon
    /// as every queue has drained.
    pub(super) stop: AtomicBool,

    /// Workers currently in their idle back-off.
    pub(super) idle_count: AtomicU32,

    /// Workers currently running. Fixed at the pool size for the scheduler's
    /// lifetime.
    pub(super) active_threads: AtomicU32,

    /// NUMA node assigned to each worker, round-robin over the host's nodes.
    pub(super) numa_nodes: Box<[usize]>,

    pub(super) cfg: SchedulerConfig,
}

impl Shared {
    pub(super) fn all_queues_empty(&self) -> bool {
        self.queues.iter().all(WorkQueue::is_empty)
    }

    /// The error sink: one human-readable line on standard error.
    pub(super) fn report_error(&self, error: &anyhow::Error) {
        eprintln!("spindle scheduler error: {error:#}");
    }
}

/// A fixed pool of worker threads executing submitted tasks.
///
/// Submission never blocks: `schedule_task` picks a victim queue round-robin
/// and pushes; the queue's worker pops it, or an idle peer steals it.
/// Dropping the scheduler latches shutdown, lets the already-queued work
/// drain, and joins every worker.
#[derive(Debug)]
pub struct Scheduler {
    shared: Arc<Shared>,
    pool: ThreadPool,

    /// Nominal priority (advisory).
    priority: AtomicU8,

    /// Pool sizing bounds. Both equal the worker count; the pool neither
    /// grows nor shrinks.
    min_threads: u32,
    max_threads: u32,
}

impl Scheduler {
    /// Allocates the queues, assigns NUMA nodes and spawns the workers.
    pub(super) fn start(cfg: SchedulerConfig) -> Scheduler {
        let threads = cfg.worker_threads;
        let nodes = topology::numa_node_count();
        let priority = AtomicU8::new(cfg.priority.index() as u8);

        let shared = Arc::new(Shared {
            queues: (0..threads).map(|_| WorkQueue::new()).collect(),
            next_queue: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
            idle_count: AtomicU32::new(0),
            active_threads: AtomicU32::new(threads as u32),
            numa_nodes: (0..threads).map(|i| i % nodes).collect(),
            cfg,
        });
        let pool = ThreadPool::spawn(&shared);

        Scheduler {
            shared,
            pool,
            priority,
            min_threads: threads as u32,
            max_threads: threads as u32,
        }
    }

    /// Enqueue a closure at [`Priority::Normal`].
    pub fn schedule<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_task(Task::new(f), Priority::default());
    }

    /// Enqueue a closure at the given priority.
    pub fn schedule_with_priority<F>(&self, f: F, priority: Priority)
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_task(Task::new(f), priority);
    }

    /// Submit `f(i)` for every `i` in `[0, n)`, decomposed into chunk tasks.
    ///
    /// See [`Schedule::bulk_schedule`] for the decomposition.
    pub fn bulk<F>(&self, n: u32, f: F, priority: Priority)
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.bulk_schedule(n, Arc::new(f), priority);
    }

    /// The fixed `(min, max)` worker bounds; currently both equal the pool
    /// size.
    pub fn thread_limits(&self) -> (u32, u32) {
        (self.min_threads, self.max_threads)
    }
}

impl Schedule for Scheduler {
    fn schedule_task(&self, task: Task, priority: Priority) {
        if self.shared.stop.load(Ordering::Relaxed) {
            tracing::debug!("task submitted after shutdown, dropping");
            return;
        }

        let queues = &self.shared.queues;
        let mut chosen = self.shared.next_queue.fetch_add(1, Ordering::Relaxed) % queues.len();
        // Skip forward over quarantined queues.
        while !queues[chosen].is_active() {
            chosen = (chosen + 1) % queues.len();
        }
        queues[chosen].push(priority, task);
    }

    fn set_error(&self, error: anyhow::Error) {
        self.shared.report_error(&error);
    }

    fn set_stopped(&self) {
        if !self.shared.stop.swap(true, Ordering::Relaxed) {
            eprintln!("spindle scheduler: execution stopped");
        }
    }

    fn active_thread_count(&self) -> u32 {
        self.shared.active_threads.load(Ordering::Relaxed)
    }

    fn priority(&self) -> Priority {
        Priority::from_index(self.priority.load(Ordering::Relaxed))
    }

    fn set_priority(&self, priority: Priority) {
        self.priority.store(priority.index() as u8, Ordering::Relaxed);
    }
}

/// All schedulers compare equal: any instance is an interchangeable
/// dispatcher for any other.
impl PartialEq for Scheduler {
    fn eq(&self, _other: &Scheduler) -> bool {
        true
    }
}

impl Eq for Scheduler {}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        // Workers only exit once every queue is empty, so this join is the
        // drain barrier.
        self.pool.join_all();
    }
}

// Test-only hooks.
#[cfg(test)]
impl Scheduler {
    /// Push directly onto one worker's queue, bypassing round-robin.
    pub(crate) fn schedule_to(&self, queue: usize, task: Task, priority: Priority) {
        self.shared.queues[queue].push(priority, task);
    }

    pub(crate) fn queue_len(&self, queue: usize) -> usize {
        self.shared.queues[queue].len()
    }

    pub(crate) fn deactivate_queue(&self, queue: usize) {
        self.shared.queues[queue].deactivate();
    }

    pub(crate) fn idle_count(&self) -> u32 {
        self.shared.idle_count.load(Ordering::Relaxed)
    }
}
