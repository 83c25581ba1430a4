//! Point-in-time health readings of the current process and its host.
//!
//! A [`Snapshot`] is produced by a snapshot source for one collection and is
//! not retained afterwards. Snapshots (de)serialize as JSON so a captured one
//! can be replayed; a disabled loop delay (`NaN`) travels as `null`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub process: ProcessInfo,
    pub system: SystemInfo,
    /// Scheduler delay in milliseconds. `NaN` when loop monitoring is disabled.
    #[serde(default = "disabled_loop", deserialize_with = "nan_if_null")]
    pub loop_delay: f64,
    pub handles: u64,
    pub requests: u64,
}

impl Snapshot {
    pub fn loop_enabled(&self) -> bool {
        !self.loop_delay.is_nan()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub memory_usage: MemoryUsage,
    /// Seconds since the process started.
    pub uptime: f64,
    pub exec_path: String,
    pub main_module: String,
    pub title: String,
    pub pid: u32,
    /// Runtime version components (component -> version).
    #[serde(default)]
    pub versions: BTreeMap<String, String>,
}

/// Memory usage breakdown in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub rss: u64,
    pub heap_total: u64,
    pub heap_used: u64,
    pub external: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub arch: String,
    pub hostname: String,
    pub platform: String,
    pub totalmem: u64,
    pub freemem: u64,
    /// 1, 5 and 15 minute load averages.
    pub loadavg: [f64; 3],
    /// Seconds since the host booted.
    pub uptime: f64,
}

fn disabled_loop() -> f64 {
    f64::NAN
}

fn nan_if_null<'de, D>(d: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
}
