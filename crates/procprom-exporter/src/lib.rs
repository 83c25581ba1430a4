//! procprom exporter library entry.
//!
//! Wires snapshot sources, the gauge catalog and the emitter together, plus
//! the config loader and HTTP surface used by the `procprom-exporter` binary.
//! Integration tests consume it directly.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod catalog;
pub mod config;
pub mod emitter;
pub mod ops;
pub mod router;
pub mod sampler;
pub mod source;

pub use emitter::{EmitterOptions, ProcessEmitter, Report};
pub use source::{FixedSource, SnapshotSource};
