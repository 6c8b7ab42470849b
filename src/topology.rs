//! Host topology probes used at scheduler construction.

use std::num::NonZeroUsize;
use std::thread;

/// Logical CPU count, falling back to 1 when the host will not say.
pub(crate) fn logical_cpus() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Number of NUMA nodes exposed by the host, always at least 1.
///
/// Workers are assigned nodes round-robin from this count; actual thread
/// pinning is left to the embedding application.
pub(crate) fn numa_node_count() -> usize {
    numa_nodes_from_sysfs().unwrap_or(1)
}

#[cfg(target_os = "linux")]
fn numa_nodes_from_sysfs() -> Option<usize> {
    let entries = std::fs::read_dir("/sys/devices/system/node").ok()?;
    let nodes = entries
        .filter_map(|entry| {
            let name = entry.ok()?.file_name();
            let name = name.to_str()?;
            name.strip_prefix("node")?.parse::<usize>().ok()
        })
        .count();
    (nodes > 0).then_some(nodes)
}

#[cfg(not(target_os = "linux"))]
fn numa_nodes_from_sysfs() -> Option<usize> {
    None
}
