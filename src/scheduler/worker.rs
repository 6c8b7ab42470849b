use crate::scheduler::scheduler::Shared;
use crate::task::Task;
use anyhow::anyhow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

/// A worker thread's loop state. Owns the pop side of `queues[index]`; every
/// other queue is a steal victim.
pub(super) struct Worker {
    shared: Arc<Shared>,
    index: usize,
    numa_node: usize,

    /// Peer queue indices, reshuffled before every steal sweep so victim
    /// order differs across workers and across sweeps.
    steal_order: Vec<usize>,
    rng: fastrand::Rng,
}

impl Worker {
    pub(super) fn new(shared: Arc<Shared>, index: usize) -> Worker {
        let steal_order = (0..shared.queues.len()).filter(|&i| i != index).collect();
        let numa_node = shared.numa_nodes[index];

        Worker {
            shared,
            index,
            numa_node,
            steal_order,
            // Seeded from entropy, once per worker thread.
            rng: fastrand::Rng::new(),
        }
    }

    pub(super) fn run(mut self) {
        tracing::debug!(
            worker = self.index,
            numa_node = self.numa_node,
            "worker started"
        );

        loop {
            if let Some(task) = self.find_task() {
                self.run_task(task);
                continue;
            }

            // Idle back-off. The sleep trades a little wake-up latency for
            // not coordinating a wakeup on the submission fast path.
            self.shared.idle_count.fetch_add(1, Ordering::Relaxed);
            thread::sleep(self.shared.cfg.idle_sleep);
            self.shared.idle_count.fetch_sub(1, Ordering::Relaxed);

            // Exit only once shutdown is latched *and* every queue has
            // drained, ours included.
            if self.shared.stop.load(Ordering::Relaxed) && self.shared.all_queues_empty() {
                tracing::debug!(worker = self.index, "worker exiting");
                return;
            }
        }
    }

    fn find_task(&mut self) -> Option<Task> {
        // 1. Our own queue, highest priority lane first.
        if let Some(task) = self.shared.queues[self.index].pop() {
            return Some(task);
        }

        // 2. Sweep the peers in a fresh random order, skipping quarantined
        //    queues, and take the first successful steal.
        self.rng.shuffle(&mut self.steal_order);
        for &victim in &self.steal_order {
            let queue = &self.shared.queues[victim];
            if !queue.is_active() {
                continue;
            }
            if let Some(task) = queue.steal() {
                return Some(task);
            }
        }

        None
    }

    /// Run one task, keeping the worker alive across task panics.
    fn run_task(&self, task: Task) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            let msg = panic_message(&payload);
            self.shared
                .report_error(&anyhow!("task panicked on worker {}: {msg}", self.index));
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string payload>".to_string()
    }
}
