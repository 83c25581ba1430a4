//! Top-level facade crate for procprom.
//!
//! Re-exports core types and the exporter library so users can depend on a single crate.

pub mod core {
    pub use procprom_core::*;
}

pub mod exporter {
    pub use procprom_exporter::*;
}
