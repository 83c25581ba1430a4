//! Process metrics emitter.
//!
//! Maps health snapshots onto the fixed [`GaugeCatalog`] and renders the
//! configured registries. Collections can be driven directly through
//! [`ProcessEmitter::collect`] or by the snapshot source's push timer, in which
//! case every rendered report is re-published to [`ProcessEmitter::subscribe`]
//! receivers.
//!
//! Catalog state and the one-time flag sit behind a mutex held for the whole
//! collection, so direct and pushed collections never interleave.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};

use procprom_core::error::{PromError, Result};
use procprom_core::registry::{default_registry, CollectorRegistry};
use procprom_core::snapshot::Snapshot;

use crate::catalog::{GaugeCatalog, LOAD_SPANS, VERSION_COMPONENTS};
use crate::sampler::{SamplerOptions, SysinfoSource};
use crate::source::{AbortOnDrop, SnapshotSource};

const EVENT_CAPACITY: usize = 16;

/// Construction options.
#[derive(Default)]
pub struct EmitterOptions {
    /// Snapshot source; a default sysinfo sampler when `None`.
    pub metrics: Option<Arc<dyn SnapshotSource>>,
    /// Target registries; the process-wide default registry when `None`.
    pub registries: Option<Vec<Arc<CollectorRegistry>>>,
}

/// Result of one collection: one rendered report per configured registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// No registries configured.
    None,
    Single(String),
    Many(Vec<String>),
}

impl Report {
    pub fn is_none(&self) -> bool {
        matches!(self, Report::None)
    }

    /// Number of rendered reports.
    pub fn len(&self) -> usize {
        match self {
            Report::None => 0,
            Report::Single(_) => 1,
            Report::Many(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First registry's report.
    pub fn first(&self) -> Option<&str> {
        match self {
            Report::None => None,
            Report::Single(s) => Some(s),
            Report::Many(v) => v.first().map(String::as_str),
        }
    }
}

struct EmitterState {
    source: Arc<dyn SnapshotSource>,
    registries: Vec<Arc<CollectorRegistry>>,
    catalog: GaugeCatalog,
    initialized: bool,
}

impl EmitterState {
    fn apply(&mut self, snap: &Snapshot) -> Result<()> {
        let c = &self.catalog;
        let mem = &snap.process.memory_usage;

        c.heap_total.set(mem.heap_total as f64, &[])?;
        c.heap.set(mem.heap_used as f64, &[])?;
        c.external.set(mem.external as f64, &[])?;
        c.rss.set(mem.rss as f64, &[])?;
        c.freemem.set(snap.system.freemem as f64, &[])?;
        c.loop_delay.set(if snap.loop_delay.is_nan() { 0.0 } else { snap.loop_delay }, &[])?;
        c.handles.set(snap.handles as f64, &[])?;
        c.requests.set(snap.requests as f64, &[])?;
        for (span, v) in LOAD_SPANS.into_iter().zip(snap.system.loadavg) {
            c.loadavg.set(v, &[("span", span)])?;
        }

        if !self.initialized {
            self.init_metrics(snap)?;
            self.initialized = true;
        }
        Ok(())
    }

    /// One-time gauges: facts that hold for the whole process lifetime.
    fn init_metrics(&self, snap: &Snapshot) -> Result<()> {
        let c = &self.catalog;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| PromError::Internal(format!("system clock before unix epoch: {e}")))?
            .as_secs_f64();

        c.process_start_time.set((now - snap.process.uptime).round(), &[])?;
        c.system_start_time.set((now - snap.system.uptime).round(), &[])?;
        c.totalmem.set(snap.system.totalmem as f64, &[])?;

        let p = &snap.process;
        let pid = p.pid.to_string();
        c.process.set(1.0, &[("execPath", p.exec_path.as_str())])?;
        c.process.set(1.0, &[("mainModule", p.main_module.as_str())])?;
        c.process.set(1.0, &[("title", p.title.as_str())])?;
        c.process.set(1.0, &[("pid", pid.as_str())])?;

        let s = &snap.system;
        c.system.set(1.0, &[("arch", s.arch.as_str())])?;
        c.system.set(1.0, &[("hostname", s.hostname.as_str())])?;
        c.system.set(1.0, &[("platform", s.platform.as_str())])?;

        for component in VERSION_COMPONENTS {
            if let Some(version) = p.versions.get(component) {
                c.versions.set(1.0, &[(component, version.as_str())])?;
            }
        }

        tracing::info!(pid = p.pid, hostname = %s.hostname, "process metadata published");
        Ok(())
    }

    fn render(&self) -> Report {
        match self.registries.as_slice() {
            [] => Report::None,
            [only] => Report::Single(only.report()),
            many => Report::Many(many.iter().map(|r| r.report()).collect()),
        }
    }
}

type SharedState = Mutex<Option<EmitterState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, Option<EmitterState>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn collect_locked(state: &SharedState, pushed: Option<&Snapshot>) -> Result<Report> {
    let mut guard = lock(state);
    let st = guard
        .as_mut()
        .ok_or_else(|| PromError::InvalidState("emitter has been destroyed".into()))?;

    let fresh;
    let snap = match pushed {
        Some(s) => s,
        None => {
            fresh = st.source.snapshot()?;
            &fresh
        }
    };

    st.apply(snap)?;
    tracing::debug!(registries = st.registries.len(), "metrics collected");
    Ok(st.render())
}

/// Re-publish a report for every snapshot the source pushes.
fn spawn_pump(
    state: Weak<SharedState>,
    mut rx: broadcast::Receiver<Snapshot>,
    events: broadcast::Sender<Report>,
) -> Option<AbortOnDrop> {
    let Ok(handle) = Handle::try_current() else {
        tracing::warn!("no tokio runtime; pushed snapshots are ignored");
        return None;
    };

    let task = handle.spawn(async move {
        loop {
            let snapshot = match rx.recv().await {
                Ok(s) => s,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "emitter lagging behind snapshot source");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Some(state) = state.upgrade() else { break };

            // the state lock may be held by a blocking collection
            let collected =
                tokio::task::spawn_blocking(move || collect_locked(&state, Some(&snapshot))).await;
            match collected {
                Ok(Ok(report)) => {
                    // no listeners is fine
                    let _ = events.send(report);
                }
                Ok(Err(PromError::InvalidState(_))) => break,
                Ok(Err(e)) => tracing::warn!(error = %e, "collection of pushed snapshot failed"),
                Err(e) => tracing::warn!(error = %e, "collection task failed"),
            }
        }
    });
    Some(AbortOnDrop::new(task))
}

/// Publishes process health gauges into one or more registries.
pub struct ProcessEmitter {
    state: Arc<SharedState>,
    events: broadcast::Sender<Report>,
    pump: Mutex<Option<AbortOnDrop>>,
}

impl ProcessEmitter {
    /// Build the emitter and register the full catalog in every registry.
    ///
    /// Fails with `RegistryConflict` if any catalog name is already taken;
    /// nothing stays registered in that case.
    pub fn new(options: EmitterOptions) -> Result<Self> {
        let registries = options
            .registries
            .unwrap_or_else(|| vec![default_registry()]);
        let source: Arc<dyn SnapshotSource> = match options.metrics {
            Some(s) => s,
            None => SysinfoSource::new(SamplerOptions::default())? as Arc<dyn SnapshotSource>,
        };

        let catalog = GaugeCatalog::register(&registries)?;
        tracing::info!(registries = registries.len(), "process emitter registered");

        let pushes = source.subscribe();
        let state = Arc::new(Mutex::new(Some(EmitterState {
            source,
            registries,
            catalog,
            initialized: false,
        })));

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let pump = pushes.and_then(|rx| spawn_pump(Arc::downgrade(&state), rx, events.clone()));

        Ok(Self { state, events, pump: Mutex::new(pump) })
    }

    /// Take a fresh snapshot, update every gauge and render the registries.
    pub fn collect(&self) -> Result<Report> {
        collect_locked(&self.state, None)
    }

    /// Same as [`collect`](Self::collect) with a snapshot supplied by the caller.
    pub fn collect_with(&self, snapshot: &Snapshot) -> Result<Report> {
        collect_locked(&self.state, Some(snapshot))
    }

    /// Reports produced by pushed snapshots ("metrics produced" events).
    pub fn subscribe(&self) -> broadcast::Receiver<Report> {
        self.events.subscribe()
    }

    pub fn source(&self) -> Option<Arc<dyn SnapshotSource>> {
        lock(&self.state).as_ref().map(|st| Arc::clone(&st.source))
    }

    pub fn registries(&self) -> Option<Vec<Arc<CollectorRegistry>>> {
        lock(&self.state).as_ref().map(|st| st.registries.clone())
    }

    pub fn is_destroyed(&self) -> bool {
        lock(&self.state).is_none()
    }

    /// Unregister every gauge from every registry and release the source.
    ///
    /// Later collections fail with `InvalidState`. Calling it again is a no-op.
    pub fn destroy(&self) {
        drop(self.pump.lock().unwrap_or_else(PoisonError::into_inner).take());

        let Some(st) = lock(&self.state).take() else { return };
        for registry in &st.registries {
            st.catalog.unregister_from(registry);
        }
        tracing::info!(registries = st.registries.len(), "process emitter destroyed");
    }
}

impl Drop for ProcessEmitter {
    fn drop(&mut self) {
        self.destroy();
    }
}
