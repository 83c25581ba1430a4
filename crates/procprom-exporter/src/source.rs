//! Snapshot sources: where the emitter gets its readings from.
//!
//! A source answers direct requests and may additionally push snapshots to
//! subscribers on its own timer.

use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use procprom_core::error::{PromError, Result};
use procprom_core::snapshot::Snapshot;

/// Buffered pushes per subscriber before it starts lagging.
pub(crate) const PUSH_CAPACITY: usize = 16;

/// Producer of health snapshots.
pub trait SnapshotSource: Send + Sync {
    /// Take a fresh snapshot.
    fn snapshot(&self) -> Result<Snapshot>;

    /// Periodic push notifications, if this source has a timer.
    fn subscribe(&self) -> Option<broadcast::Receiver<Snapshot>> {
        None
    }
}

/// Background task aborted when the guard is dropped.
pub(crate) struct AbortOnDrop(JoinHandle<()>);

impl AbortOnDrop {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self(handle)
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Push a fresh snapshot of `source` every `period`.
///
/// Needs a tokio runtime; returns `None` outside of one. The task stops once
/// the source is gone.
pub(crate) fn spawn_push_timer<S>(
    source: Weak<S>,
    period: Duration,
    tx: broadcast::Sender<Snapshot>,
) -> Option<AbortOnDrop>
where
    S: SnapshotSource + 'static,
{
    let Ok(handle) = Handle::try_current() else {
        tracing::warn!(?period, "no tokio runtime; periodic snapshots disabled");
        return None;
    };

    let task = handle.spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // first tick completes immediately

        loop {
            ticker.tick().await;
            let Some(source) = source.upgrade() else { break };
            // sampling may block on host introspection
            match tokio::task::spawn_blocking(move || source.snapshot()).await {
                Ok(Ok(snapshot)) => {
                    // no subscribers is not an error
                    let _ = tx.send(snapshot);
                }
                Ok(Err(e)) => tracing::warn!(error = %e, "periodic snapshot failed"),
                Err(e) => tracing::warn!(error = %e, "periodic snapshot task failed"),
            }
        }
    });
    Some(AbortOnDrop::new(task))
}

/// Source replaying one captured snapshot.
///
/// Useful for reproducible exports and tests. Pushes happen on the optional
/// timer or on [`FixedSource::publish`].
pub struct FixedSource {
    snapshot: Snapshot,
    tx: broadcast::Sender<Snapshot>,
    _timer: Option<AbortOnDrop>,
}

impl FixedSource {
    pub fn new(snapshot: Snapshot) -> Self {
        let (tx, _) = broadcast::channel(PUSH_CAPACITY);
        Self { snapshot, tx, _timer: None }
    }

    /// Replay `snapshot` to subscribers every `period`.
    pub fn with_period(snapshot: Snapshot, period: Duration) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let (tx, _) = broadcast::channel(PUSH_CAPACITY);
            let timer = spawn_push_timer(weak.clone(), period, tx.clone());
            Self { snapshot, tx, _timer: timer }
        })
    }

    /// Load a snapshot captured as JSON.
    pub fn from_file(path: impl AsRef<Path>, period: Option<Duration>) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            PromError::Internal(format!("read snapshot {} failed: {e}", path.display()))
        })?;
        let snapshot: Snapshot = serde_json::from_str(&s).map_err(|e| {
            PromError::InvalidArgument(format!("invalid snapshot {}: {e}", path.display()))
        })?;

        Ok(match period {
            Some(p) => Self::with_period(snapshot, p),
            None => Arc::new(Self::new(snapshot)),
        })
    }

    /// Push the snapshot to current subscribers. Returns how many received it.
    pub fn publish(&self) -> usize {
        self.tx.send(self.snapshot.clone()).unwrap_or(0)
    }
}

impl SnapshotSource for FixedSource {
    fn snapshot(&self) -> Result<Snapshot> {
        Ok(self.snapshot.clone())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<Snapshot>> {
        Some(self.tx.subscribe())
    }
}
