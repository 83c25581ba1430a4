//! procprom core: snapshot data model, gauge registry and error types.
//!
//! This crate defines the health snapshot schema and the last-value gauge
//! registry that renders the Prometheus text exposition format. It carries no
//! runtime or host-introspection dependencies so it can be reused with any
//! snapshot source.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `PromError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod registry;
pub mod snapshot;

/// Shared result type.
pub use error::{ErrorKind, PromError, Result};
pub use registry::{default_registry, CollectorRegistry, Gauge, GaugeOpts};
pub use snapshot::{MemoryUsage, ProcessInfo, Snapshot, SystemInfo};
