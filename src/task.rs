use std::fmt;

/// A single-shot unit of work.
///
/// Tasks are nullary closures with no return value. A task is owned by
/// exactly one queue slot from submission until the moment a worker claims
/// it; running consumes the task.
pub struct Task(Box<dyn FnOnce() + Send + 'static>);

impl Task {
    pub fn new<F>(f: F) -> Task
    where
        F: FnOnce() + Send + 'static,
    {
        Task(Box::new(f))
    }

    /// Invoke the task, consuming it.
    pub fn run(self) {
        (self.0)();
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The closure itself isn't printable.
        f.debug_tuple("Task").field(&"<closure>").finish()
    }
}

impl<F> From<F> for Task
where
    F: FnOnce() + Send + 'static,
{
    fn from(f: F) -> Task {
        Task::new(f)
    }
}
