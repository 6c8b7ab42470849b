//! Per-worker multi-priority work queue.

use crate::deque::WorkDeque;
use crate::priority::Priority;
use crate::task::Task;
use std::sync::atomic::{AtomicBool, Ordering};

/// A bundle of one work-stealing deque per priority level, owned by a single
/// worker, plus a quarantine flag.
///
/// Both the owner's `pop` and a thief's `steal` scan lanes from `Critical`
/// down to `Low`, so higher-priority work always wins the next dispatch
/// decision. Within a lane the owner sees LIFO order and thieves see FIFO
/// order; there is no ordering across lanes beyond the priority scan.
pub struct WorkQueue {
    lanes: [WorkDeque<Task>; Priority::COUNT],
    /// Once false, nothing is ever pushed here again; draining the lanes is
    /// still permitted.
    active: AtomicBool,
}

impl WorkQueue {
    pub fn new() -> WorkQueue {
        WorkQueue {
            lanes: std::array::from_fn(|_| WorkDeque::new()),
            active: AtomicBool::new(true),
        }
    }

    /// Enqueue a task on the lane for `priority`. Owner side of the lane's
    /// deque.
    pub fn push(&self, priority: Priority, task: Task) {
        self.lanes[priority.index()].push(task);
    }

    /// Take the next task by descending priority. Owner only.
    pub fn pop(&self) -> Option<Task> {
        self.lanes.iter().rev().find_map(WorkDeque::pop)
    }

    /// Steal the next task by descending priority. Any thread.
    pub fn steal(&self) -> Option<Task> {
        self.lanes.iter().rev().find_map(WorkDeque::steal)
    }

    /// Approximate task count across all lanes.
    pub fn len(&self) -> usize {
        self.lanes.iter().map(WorkDeque::len).sum()
    }

    /// Approximate emptiness across all lanes.
    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(WorkDeque::is_empty)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Quarantine the queue: dispatch skips it from now on.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Relaxed);
    }
}

impl Default for WorkQueue {
    fn default() -> WorkQueue {
        WorkQueue::new()
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("len", &self.len())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    assert_impl_all!(WorkQueue: Send, Sync);

    fn marker(order: &Arc<parking_lot::Mutex<Vec<&'static str>>>, name: &'static str) -> Task {
        let order = Arc::clone(order);
        Task::new(move || order.lock().push(name))
    }

    #[test]
    fn pop_prefers_higher_priorities() {
        let queue = WorkQueue::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        queue.push(Priority::Low, marker(&order, "low"));
        queue.push(Priority::Critical, marker(&order, "critical"));
        queue.push(Priority::Normal, marker(&order, "normal"));
        queue.push(Priority::High, marker(&order, "high"));

        while let Some(task) = queue.pop() {
            task.run();
        }
        assert_eq!(*order.lock(), vec!["critical", "high", "normal", "low"]);
    }

    #[test]
    fn steal_prefers_higher_priorities() {
        let queue = WorkQueue::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        queue.push(Priority::Normal, marker(&order, "normal"));
        queue.push(Priority::Critical, marker(&order, "critical"));

        while let Some(task) = queue.steal() {
            task.run();
        }
        assert_eq!(*order.lock(), vec!["critical", "normal"]);
    }

    #[test]
    fn same_lane_pop_is_lifo_and_steal_is_fifo() {
        let queue = WorkQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for i in 0..4 {
            let counter = Arc::clone(&counter);
            queue.push(
                Priority::Normal,
                Task::new(move || {
                    counter.store(i, Ordering::Relaxed);
                }),
            );
        }

        queue.pop().expect("lane has tasks").run();
        assert_eq!(counter.load(Ordering::Relaxed), 3, "owner takes the newest");

        queue.steal().expect("lane has tasks").run();
        assert_eq!(counter.load(Ordering::Relaxed), 0, "thief takes the oldest");
    }

    #[test]
    fn len_aggregates_all_lanes() {
        let queue = WorkQueue::new();
        assert!(queue.is_empty());

        for priority in Priority::ALL {
            queue.push(priority, Task::new(|| {}));
        }
        assert_eq!(queue.len(), 4);
        assert!(!queue.is_empty());

        while queue.pop().is_some() {}
        assert!(queue.is_empty());
    }

    #[test]
    fn deactivate_latches_and_still_drains() {
        let queue = WorkQueue::new();
        assert!(queue.is_active());

        queue.push(Priority::Normal, Task::new(|| {}));
        queue.deactivate();
        assert!(!queue.is_active());

        // A quarantined queue still drains.
        assert!(queue.pop().is_some());
        assert!(queue.is_empty());
    }
}
