//! End to end against the process-wide default registry and sysinfo sampler.
//!
//! Kept as a single test: the default registry is shared by the whole binary.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use procprom_core::registry::default_registry;
use procprom_exporter::{EmitterOptions, ProcessEmitter, Report};

#[test]
fn default_construction_round_trip() {
    let ee = ProcessEmitter::new(EmitterOptions::default()).unwrap();
    assert_eq!(default_registry().len(), 15);
    assert_eq!(ee.registries().unwrap().len(), 1);

    let report = ee.collect().unwrap();
    let Report::Single(text) = report else { panic!("expected a single report") };
    assert!(text.contains("process_resident_memory_bytes"));
    assert!(text.contains(&format!("nodejs_process_configuration{{pid=\"{}\"}} 1", std::process::id())));
    // no runtime: loop monitoring is off
    assert!(text.contains("\nnodejs_event_loop_delay 0\n"));

    ee.destroy();
    assert_eq!(default_registry().len(), 0);
    assert!(ee.source().is_none());
}
