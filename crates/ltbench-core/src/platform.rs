//! Host CPU topology and inter/intra-op thread resolution.

use std::collections::BTreeSet;

use sysinfo::System;

use crate::config::{LaunchConfig, UNSET};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    pub num_cpu_sockets: u32,
    pub num_cores_per_socket: u32,
}

impl PlatformInfo {
    /// Detect the topology of the current host.
    ///
    /// Socket count comes from `/proc/cpuinfo` where available; physical core
    /// count from `sysinfo`. Anything undetectable falls back to one socket
    /// and the logical CPU count.
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        let logical = sys.cpus().len().max(1);
        let physical = sys.physical_core_count().unwrap_or(logical).max(1);

        let sockets = std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|info| count_sockets(&info))
            .unwrap_or(1)
            .max(1);

        let info = Self {
            num_cpu_sockets: sockets as u32,
            num_cores_per_socket: (physical / sockets).max(1) as u32,
        };
        tracing::debug!(
            sockets = info.num_cpu_sockets,
            cores_per_socket = info.num_cores_per_socket,
            "detected platform"
        );
        info
    }
}

fn count_sockets(cpuinfo: &str) -> Option<usize> {
    let ids: BTreeSet<&str> = cpuinfo
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key.trim() == "physical id").then(|| value.trim())
        })
        .collect();
    (!ids.is_empty()).then_some(ids.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadCounts {
    pub inter: u32,
    pub intra: u32,
}

pub trait ThreadResolver {
    fn resolve(&self, config: &LaunchConfig) -> ThreadCounts;
}

/// Default resolution against a known platform topology.
///
/// Explicit thread counts always win. Otherwise a pinned socket gets one
/// inter-op thread and that socket's cores; an unpinned run spans every socket.
impl ThreadResolver for PlatformInfo {
    fn resolve(&self, config: &LaunchConfig) -> ThreadCounts {
        let pinned = config.socket_id != UNSET;

        let inter = config.num_inter_threads.unwrap_or(if pinned {
            1
        } else {
            self.num_cpu_sockets
        });

        let intra = config.num_intra_threads.unwrap_or_else(|| {
            // The -1 sentinel fails the conversion.
            if let Ok(cores) = u32::try_from(config.num_cores) {
                cores
            } else if pinned {
                self.num_cores_per_socket
            } else {
                self.num_cores_per_socket * self.num_cpu_sockets
            }
        });

        ThreadCounts { inter, intra }
    }
}
