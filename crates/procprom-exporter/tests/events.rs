//! "metrics produced" notifications driven by source pushes.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use procprom_core::registry::CollectorRegistry;
use procprom_exporter::{EmitterOptions, FixedSource, ProcessEmitter, Report};
use tokio::time::timeout;

use vector_loader::load;

#[tokio::test]
async fn published_snapshot_produces_report() {
    let source = Arc::new(FixedSource::new(load("snapshot_linux.json")));
    let ee = ProcessEmitter::new(EmitterOptions {
        metrics: Some(source.clone()),
        registries: Some(vec![Arc::new(CollectorRegistry::new())]),
    })
    .unwrap();
    let mut rx = ee.subscribe();

    assert_eq!(source.publish(), 1);
    let report = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();

    let Report::Single(text) = report else { panic!("expected a single report") };
    assert!(text.contains("process_resident_memory_bytes 52428800"));
}

#[tokio::test]
async fn periodic_source_drives_reports() {
    let source = FixedSource::with_period(load("snapshot_linux.json"), Duration::from_millis(50));
    let ee = ProcessEmitter::new(EmitterOptions {
        metrics: Some(source),
        registries: Some(vec![Arc::new(CollectorRegistry::new()), Arc::new(CollectorRegistry::new())]),
    })
    .unwrap();
    let mut rx = ee.subscribe();

    for _ in 0..2 {
        let report = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(report.len(), 2);
        assert!(report.first().unwrap().contains("nodejs_event_loop_delay 1.5"));
    }
}

#[tokio::test]
async fn no_reports_after_destroy() {
    let source = Arc::new(FixedSource::new(load("snapshot_linux.json")));
    let ee = ProcessEmitter::new(EmitterOptions {
        metrics: Some(source.clone()),
        registries: Some(vec![Arc::new(CollectorRegistry::new())]),
    })
    .unwrap();
    let mut rx = ee.subscribe();

    ee.destroy();
    source.publish();
    assert!(timeout(Duration::from_millis(200), rx.recv()).await.is_err());
}
