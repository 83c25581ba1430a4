//! Default snapshot source backed by `sysinfo` and the tokio runtime.
//!
//! - memory, load and uptime readings come from `sysinfo`
//! - "loop delay" is the lateness of a fixed-rate tokio timer, sampled by a
//!   background task; `NaN` when disabled or when no runtime is running
//! - handles / requests are the runtime's alive tasks and global queue depth
//!
//! Heap figures have no allocator instrumentation behind them: `heap_total`
//! reports the virtual memory size, `heap_used` the resident size and
//! `external` is always zero.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sysinfo::{Pid, System};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};

use procprom_core::error::{PromError, Result};
use procprom_core::snapshot::{MemoryUsage, ProcessInfo, Snapshot, SystemInfo};

use crate::catalog::VERSION_COMPONENTS;
use crate::source::{spawn_push_timer, AbortOnDrop, SnapshotSource, PUSH_CAPACITY};

const LOOP_RESOLUTION: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct SamplerOptions {
    /// Push period; `None` disables pushes.
    pub period: Option<Duration>,
    pub loop_monitor: bool,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self { period: None, loop_monitor: true }
    }
}

/// Measures how late a fixed-rate timer fires on the current runtime.
struct LoopMonitor {
    delay_ms: Arc<AtomicU64>,
    _task: AbortOnDrop,
}

impl LoopMonitor {
    fn start() -> Option<Self> {
        let handle = Handle::try_current().ok()?;
        let delay_ms = Arc::new(AtomicU64::new(0f64.to_bits()));
        let cell = Arc::clone(&delay_ms);

        let task = handle.spawn(async move {
            let mut ticker = interval(LOOP_RESOLUTION);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                let scheduled = ticker.tick().await;
                let lag = Instant::now().saturating_duration_since(scheduled);
                cell.store((lag.as_secs_f64() * 1000.0).to_bits(), Ordering::Relaxed);
            }
        });

        Some(Self { delay_ms, _task: AbortOnDrop::new(task) })
    }

    fn delay(&self) -> f64 {
        f64::from_bits(self.delay_ms.load(Ordering::Relaxed))
    }
}

/// Facts fixed for the process lifetime, read once.
struct Identity {
    exec_path: String,
    main_module: String,
    versions: BTreeMap<String, String>,
}

impl Identity {
    fn read() -> Self {
        let exec_path = std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let main_module = std::env::args_os()
            .next()
            .map(|a| a.to_string_lossy().into_owned())
            .unwrap_or_default();

        let versions = VERSION_COMPONENTS
            .iter()
            .map(|c| {
                let v = match *c {
                    "procprom" => Some(env!("CARGO_PKG_VERSION").to_string()),
                    "kernel" => System::kernel_version(),
                    "os" => System::os_version(),
                    _ => None,
                };
                (c.to_string(), v.unwrap_or_else(|| "unknown".to_string()))
            })
            .collect();

        Self { exec_path, main_module, versions }
    }
}

/// Samples the current process and host.
pub struct SysinfoSource {
    system: Mutex<System>,
    pid: Pid,
    identity: Identity,
    loop_monitor: Option<LoopMonitor>,
    tx: broadcast::Sender<Snapshot>,
    timer: Option<AbortOnDrop>,
}

impl SysinfoSource {
    pub fn new(opts: SamplerOptions) -> Result<Arc<Self>> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| PromError::Source(format!("cannot resolve own pid: {e}")))?;

        let loop_monitor = if opts.loop_monitor {
            let m = LoopMonitor::start();
            if m.is_none() {
                tracing::debug!("no tokio runtime; loop delay monitoring disabled");
            }
            m
        } else {
            None
        };

        Ok(Arc::new_cyclic(|weak| {
            let (tx, _) = broadcast::channel(PUSH_CAPACITY);
            let timer = opts
                .period
                .and_then(|p| spawn_push_timer(weak.clone(), p, tx.clone()));
            Self {
                system: Mutex::new(System::new()),
                pid,
                identity: Identity::read(),
                loop_monitor,
                tx,
                timer,
            }
        }))
    }

    fn loop_delay(&self) -> f64 {
        self.loop_monitor.as_ref().map_or(f64::NAN, LoopMonitor::delay)
    }
}

fn runtime_counts() -> (u64, u64) {
    match Handle::try_current() {
        Ok(h) => {
            let m = h.metrics();
            (m.num_alive_tasks() as u64, m.global_queue_depth() as u64)
        }
        Err(_) => (0, 0),
    }
}

impl SnapshotSource for SysinfoSource {
    fn snapshot(&self) -> Result<Snapshot> {
        let mut sys = self
            .system
            .lock()
            .map_err(|_| PromError::Internal("sampler lock poisoned".into()))?;
        sys.refresh_memory();
        if !sys.refresh_process(self.pid) {
            return Err(PromError::Source(format!("process {} not found", self.pid)));
        }
        let proc_ = sys
            .process(self.pid)
            .ok_or_else(|| PromError::Source(format!("process {} not found", self.pid)))?;

        let memory_usage = MemoryUsage {
            rss: proc_.memory(),
            heap_total: proc_.virtual_memory(),
            heap_used: proc_.memory(),
            external: 0,
        };
        let process = ProcessInfo {
            memory_usage,
            uptime: proc_.run_time() as f64,
            exec_path: self.identity.exec_path.clone(),
            main_module: self.identity.main_module.clone(),
            title: proc_.name().to_string(),
            pid: self.pid.as_u32(),
            versions: self.identity.versions.clone(),
        };

        let load = System::load_average();
        let system = SystemInfo {
            arch: std::env::consts::ARCH.to_string(),
            hostname: System::host_name().unwrap_or_default(),
            platform: std::env::consts::OS.to_string(),
            totalmem: sys.total_memory(),
            freemem: sys.available_memory(),
            loadavg: [load.one, load.five, load.fifteen],
            uptime: System::uptime() as f64,
        };

        let (handles, requests) = runtime_counts();
        Ok(Snapshot {
            process,
            system,
            loop_delay: self.loop_delay(),
            handles,
            requests,
        })
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<Snapshot>> {
        self.timer.as_ref().map(|_| self.tx.subscribe())
    }
}
