//! sysinfo-backed snapshot source.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use procprom_exporter::sampler::{SamplerOptions, SysinfoSource};
use procprom_exporter::SnapshotSource;
use tokio::time::timeout;

#[test]
fn samples_own_process_without_runtime() {
    let source = SysinfoSource::new(SamplerOptions::default()).unwrap();
    let snap = source.snapshot().unwrap();

    assert_eq!(snap.process.pid, std::process::id());
    assert!(snap.process.memory_usage.rss > 0);
    assert!(snap.system.totalmem > 0);
    assert!(snap.system.totalmem >= snap.system.freemem);
    assert_eq!(snap.system.platform, std::env::consts::OS);
    assert_eq!(snap.system.arch, std::env::consts::ARCH);
    assert_eq!(snap.process.versions.get("procprom").map(String::as_str), Some(env!("CARGO_PKG_VERSION")));
    assert_eq!(snap.process.versions.len(), 3);
    assert!(!snap.loop_enabled());
    assert_eq!((snap.handles, snap.requests), (0, 0));
    assert!(source.subscribe().is_none());
}

#[tokio::test]
async fn loop_monitor_reports_finite_delay() {
    let source = SysinfoSource::new(SamplerOptions::default()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snap = source.snapshot().unwrap();
    assert!(snap.loop_enabled());
    assert!(snap.loop_delay >= 0.0);
    assert!(snap.handles >= 1);
}

#[tokio::test]
async fn loop_monitor_can_be_disabled() {
    let source = SysinfoSource::new(SamplerOptions { period: None, loop_monitor: false }).unwrap();
    assert!(source.snapshot().unwrap().loop_delay.is_nan());
}

#[tokio::test]
async fn pushes_snapshots_on_period() {
    let source = SysinfoSource::new(SamplerOptions {
        period: Some(Duration::from_millis(50)),
        loop_monitor: false,
    })
    .unwrap();
    let mut rx = source.subscribe().expect("periodic source");

    let snap = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(snap.process.pid, std::process::id());
}
