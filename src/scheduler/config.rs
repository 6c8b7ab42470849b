use crate::priority::Priority;
use crate::scheduler::Scheduler;
use crate::topology;
use anyhow::{Result, anyhow};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How long an idle worker sleeps between scans of its own and its peers'
/// queues. A tuning knob, not a contract: short enough that wake-up latency
/// stays in the microseconds, long enough that idle cores back off.
const IDLE_SLEEP: Duration = Duration::from_micros(10);

#[derive(Clone)]
pub(crate) struct ThreadNameFn(Arc<dyn Fn(usize) -> String + Send + Sync + 'static>);

impl ThreadNameFn {
    pub(crate) fn name(&self, index: usize) -> String {
        (self.0)(index)
    }
}

fn default_thread_name_fn() -> ThreadNameFn {
    ThreadNameFn(Arc::new(|index| format!("spindle-worker-{index}")))
}

impl fmt::Debug for ThreadNameFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The closure itself isn't printable.
        f.debug_tuple("ThreadNameFn").field(&"<function>").finish()
    }
}

/// Configures and constructs a [`Scheduler`].
#[derive(Debug)]
pub struct Builder {
    /// Nominal priority of the scheduler itself (advisory).
    priority: Priority,

    /// The number of worker threads.
    ///
    /// Defaults to 1 worker per logical CPU.
    worker_threads: Option<usize>,

    /// Idle back-off between queue scans.
    idle_sleep: Duration,

    /// Name fn used for threads spawned by the scheduler.
    thread_name: ThreadNameFn,

    /// Stack size used for threads spawned by the scheduler.
    thread_stack_size: Option<usize>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            priority: Priority::default(),
            worker_threads: None,
            idle_sleep: IDLE_SLEEP,
            thread_name: default_thread_name_fn(),
            thread_stack_size: None,
        }
    }

    /// Sets the scheduler's nominal priority.
    pub fn priority(mut self, val: Priority) -> Builder {
        self.priority = val;
        self
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `val` is zero.
    pub fn worker_threads(mut self, val: usize) -> Builder {
        assert!(val > 0, "worker threads cannot be set to 0");
        self.worker_threads = Some(val);
        self
    }

    /// Sets the idle back-off duration. The default is 10 µs.
    pub fn idle_sleep(mut self, val: Duration) -> Builder {
        self.idle_sleep = val;
        self
    }

    /// Sets the name of threads spawned by the scheduler.
    ///
    /// The default name is "spindle-worker-{index}".
    pub fn thread_name(mut self, val: impl Into<String>) -> Builder {
        let val = val.into();
        self.thread_name = ThreadNameFn(Arc::new(move |_| val.clone()));
        self
    }

    /// Sets a function mapping a worker index to its thread name.
    pub fn thread_name_fn<F>(mut self, f: F) -> Builder
    where
        F: Fn(usize) -> String + Send + Sync + 'static,
    {
        self.thread_name = ThreadNameFn(Arc::new(f));
        self
    }

    /// Sets the stack size (in bytes) for worker threads.
    ///
    /// The actual stack size may be greater than this value if the platform
    /// specifies a minimal stack size.
    pub fn thread_stack_size(mut self, val: usize) -> Builder {
        self.thread_stack_size = Some(val);
        self
    }

    /// Creates the configured [`Scheduler`]. All worker threads are running
    /// when this returns.
    pub fn try_build(self) -> Result<Scheduler> {
        Ok(Scheduler::start(self.try_into()?))
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

/// Validated scheduler configuration, consumed by [`Scheduler::start`] and
/// shared with every worker.
#[derive(Debug, Clone)]
pub(crate) struct SchedulerConfig {
    pub(crate) priority: Priority,
    pub(crate) worker_threads: usize,
    pub(crate) idle_sleep: Duration,
    pub(crate) thread_name: ThreadNameFn,
    pub(crate) thread_stack_size: Option<usize>,
}

impl SchedulerConfig {
    fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(anyhow!("worker_threads must be greater than 0"));
        }
        if let Some(size) = self.thread_stack_size
            && size == 0
        {
            return Err(anyhow!("thread_stack_size must be greater than 0"));
        }
        Ok(())
    }
}

impl TryFrom<Builder> for SchedulerConfig {
    type Error = anyhow::Error;

    fn try_from(builder: Builder) -> Result<Self, Self::Error> {
        let cfg = SchedulerConfig {
            priority: builder.priority,
            worker_threads: builder.worker_threads.unwrap_or_else(topology::logical_cpus),
            idle_sleep: builder.idle_sleep,
            thread_name: builder.thread_name,
            thread_stack_size: builder.thread_stack_size,
        };

        cfg.validate()?;

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;

    // The config is cloned into every spawned worker thread.
    assert_impl_all!(SchedulerConfig: Send, Sync, Clone);

    #[test]
    fn worker_threads_default_to_logical_cpus() {
        let cfg: SchedulerConfig = Builder::new().try_into().expect("default config");
        assert_eq!(cfg.worker_threads, topology::logical_cpus());
    }

    #[test]
    fn builder_overrides_are_kept() {
        let cfg: SchedulerConfig = Builder::new()
            .priority(Priority::High)
            .worker_threads(3)
            .idle_sleep(Duration::from_micros(50))
            .thread_stack_size(1 << 20)
            .try_into()
            .expect("valid config");

        assert_eq!(cfg.priority, Priority::High);
        assert_eq!(cfg.worker_threads, 3);
        assert_eq!(cfg.idle_sleep, Duration::from_micros(50));
        assert_eq!(cfg.thread_stack_size, Some(1 << 20));
    }

    #[test]
    #[should_panic(expected = "worker threads cannot be set to 0")]
    fn zero_worker_threads_panics() {
        let _ = Builder::new().worker_threads(0);
    }

    #[test]
    fn zero_stack_size_is_rejected() {
        let res: Result<SchedulerConfig> = Builder::new().thread_stack_size(0).try_into();
        assert!(res.is_err());
    }

    #[test]
    fn thread_name_fn_receives_worker_index() {
        let cfg: SchedulerConfig = Builder::new()
            .thread_name_fn(|i| format!("pool-{i}"))
            .try_into()
            .expect("valid config");
        assert_eq!(cfg.thread_name.name(2), "pool-2");
    }
}
