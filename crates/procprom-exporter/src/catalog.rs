//! Fixed gauge catalog published by the emitter.
//!
//! One named field per gauge so schema mistakes are caught at compile time;
//! [`GaugeCatalog::all`] enumerates them for bulk unregistration. Metric names
//! keep the `nodejs_` prefix of the established dashboard schema.

use std::sync::Arc;

use procprom_core::error::Result;
use procprom_core::registry::{CollectorRegistry, Gauge, GaugeOpts};

/// Runtime version components, one `nodejs_versions` label each.
pub const VERSION_COMPONENTS: [&str; 3] = ["kernel", "os", "procprom"];

/// `span` label values of `nodejs_system_loadavg`, in snapshot order.
pub const LOAD_SPANS: [&str; 3] = ["1min", "5min", "15min"];

pub struct GaugeCatalog {
    pub process: Gauge,
    pub system: Gauge,
    pub versions: Gauge,
    pub heap_total: Gauge,
    pub heap: Gauge,
    pub external: Gauge,
    pub rss: Gauge,
    pub totalmem: Gauge,
    pub freemem: Gauge,
    pub process_start_time: Gauge,
    pub system_start_time: Gauge,
    pub loop_delay: Gauge,
    pub handles: Gauge,
    pub requests: Gauge,
    pub loadavg: Gauge,
}

impl GaugeCatalog {
    /// Create every gauge in every registry.
    ///
    /// On failure the gauges created so far are unregistered again, leaving
    /// the registries as they were.
    pub fn register(registries: &[Arc<CollectorRegistry>]) -> Result<Self> {
        let mut created = Vec::new();
        match Self::build(registries, &mut created) {
            Ok(catalog) => Ok(catalog),
            Err(e) => {
                for g in &created {
                    for r in registries {
                        r.unregister(g);
                    }
                }
                Err(e)
            }
        }
    }

    fn build(registries: &[Arc<CollectorRegistry>], created: &mut Vec<Gauge>) -> Result<Self> {
        let mut gauge = |name: &str, help: &str, labels: &[&str]| -> Result<Gauge> {
            let opts = GaugeOpts::new(name, help).labels(labels.iter().copied());
            let g = Gauge::new(opts, registries)?;
            created.push(g.clone());
            Ok(g)
        };

        Ok(Self {
            process: gauge(
                "nodejs_process_configuration",
                "Node.js process configuration data.",
                &["execPath", "mainModule", "title", "pid"],
            )?,
            system: gauge(
                "nodejs_system_configuration",
                "Node.js system configuration data.",
                &["arch", "hostname", "platform"],
            )?,
            versions: gauge("nodejs_versions", "Node.js version data.", &VERSION_COMPONENTS[..])?,
            heap_total: gauge(
                "nodejs_process_heap_total_bytes",
                "Process total heap size in bytes.",
                &[],
            )?,
            heap: gauge(
                "process_heap_bytes",
                "Process heap size in bytes; resident size without allocator stats.",
                &[],
            )?,
            external: gauge(
                "nodejs_process_external_bytes",
                "Process external memory usage size in bytes.",
                &[],
            )?,
            rss: gauge("process_resident_memory_bytes", "Resident memory size in bytes.", &[])?,
            totalmem: gauge(
                "nodejs_system_totalmem_bytes",
                "System total memory size in bytes.",
                &[],
            )?,
            freemem: gauge(
                "nodejs_system_freemem_bytes",
                "System free memory size in bytes.",
                &[],
            )?,
            process_start_time: gauge(
                "process_start_time_seconds",
                "Start time of the process since unix epoch in seconds.",
                &[],
            )?,
            system_start_time: gauge(
                "nodejs_system_start_time_seconds",
                "Start time of the system since unix epoch in seconds.",
                &[],
            )?,
            loop_delay: gauge("nodejs_event_loop_delay", "Delay of the Node.js event loop.", &[])?,
            handles: gauge("nodejs_active_handles", "Number of active handles.", &[])?,
            requests: gauge("nodejs_active_requests", "Number of active requests.", &[])?,
            loadavg: gauge(
                "nodejs_system_loadavg",
                "Operating system 1, 5, and 15 minute load averages.",
                &["span"],
            )?,
        })
    }

    pub fn all(&self) -> [&Gauge; 15] {
        [
            &self.process,
            &self.system,
            &self.versions,
            &self.heap_total,
            &self.heap,
            &self.external,
            &self.rss,
            &self.totalmem,
            &self.freemem,
            &self.process_start_time,
            &self.system_start_time,
            &self.loop_delay,
            &self.handles,
            &self.requests,
            &self.loadavg,
        ]
    }

    /// Remove every gauge from `registry`.
    pub fn unregister_from(&self, registry: &CollectorRegistry) {
        for g in self.all() {
            registry.unregister(g);
        }
    }
}
