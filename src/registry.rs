//! Process-wide scheduler registry.
//!
//! One scheduler per process is the common deployment: the registry hands
//! out the current instance, constructing the default lazily on first
//! demand. The default lives until process exit (worker threads die with the
//! process; there is no join at teardown). An embedding application can
//! install its own implementation, including one that bridges onto a host
//! dispatch facility, as long as it honors the [`Schedule`] contract.

use crate::priority::Priority;
use crate::scheduler::{Builder, Schedule};
use parking_lot::Mutex;
use std::sync::Arc;

static CURRENT: Mutex<Option<Arc<dyn Schedule>>> = Mutex::new(None);

/// Returns the process-wide scheduler, constructing the default on first
/// call. `priority` sets the nominal priority of that default; it is ignored
/// when an instance already exists.
pub fn get_system_scheduler(priority: Priority) -> Arc<dyn Schedule> {
    let mut current = CURRENT.lock();
    if let Some(scheduler) = current.as_ref() {
        return Arc::clone(scheduler);
    }

    let scheduler: Arc<dyn Schedule> = Arc::new(
        Builder::new()
            .priority(priority)
            .try_build()
            .expect("failed to build the system scheduler"),
    );
    *current = Some(Arc::clone(&scheduler));
    scheduler
}

/// Installs `scheduler` as the process-wide instance, replacing any default
/// or previously installed one.
pub fn set_system_scheduler(scheduler: Arc<dyn Schedule>) {
    *CURRENT.lock() = Some(scheduler);
}
