//! Gauge registry behavior and text rendering.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use procprom_core::registry::{CollectorRegistry, Gauge, GaugeOpts};

fn registry() -> Arc<CollectorRegistry> {
    Arc::new(CollectorRegistry::new())
}

#[test]
fn renders_unlabeled_and_labeled_series() {
    let r = registry();
    let rss = Gauge::new(GaugeOpts::new("rss_bytes", "Resident memory."), &[r.clone()]).unwrap();
    let load = Gauge::new(
        GaugeOpts::new("loadavg", "Load averages.").labels(["span"]),
        &[r.clone()],
    )
    .unwrap();

    rss.set(1024.0, &[]).unwrap();
    load.set(0.5, &[("span", "5min")]).unwrap();
    load.set(1.25, &[("span", "1min")]).unwrap();

    let report = r.report();
    let expected = "\
# HELP loadavg Load averages.
# TYPE loadavg gauge
loadavg{span=\"1min\"} 1.25
loadavg{span=\"5min\"} 0.5
# HELP rss_bytes Resident memory.
# TYPE rss_bytes gauge
rss_bytes 1024
";
    assert_eq!(report, expected);
}

#[test]
fn unset_gauge_renders_header_only() {
    let r = registry();
    Gauge::new(GaugeOpts::new("idle", "Never set."), &[r.clone()]).unwrap();
    assert_eq!(r.report(), "# HELP idle Never set.\n# TYPE idle gauge\n");
}

#[test]
fn label_values_are_escaped() {
    let r = registry();
    let g = Gauge::new(GaugeOpts::new("cfg", "Config.").labels(["path"]), &[r.clone()]).unwrap();
    g.set(1.0, &[("path", "C:\\bin\\\"x\"\n")]).unwrap();
    assert!(r.report().contains(r#"cfg{path="C:\\bin\\\"x\"\n"} 1"#));
}

#[test]
fn labels_follow_declaration_order() {
    let r = registry();
    let g = Gauge::new(GaugeOpts::new("pair", "Pair.").labels(["b", "a"]), &[r.clone()]).unwrap();
    g.set(2.0, &[("a", "1"), ("b", "2")]).unwrap();
    assert!(r.report().contains("pair{b=\"2\",a=\"1\"} 2"));
    assert_eq!(g.get(&[("b", "2"), ("a", "1")]), Some(2.0));
}

#[test]
fn special_values_render_as_prometheus_literals() {
    let r = registry();
    let g = Gauge::new(GaugeOpts::new("odd", "Odd.").labels(["k"]), &[r.clone()]).unwrap();
    g.set(f64::NAN, &[("k", "nan")]).unwrap();
    g.set(f64::INFINITY, &[("k", "pos")]).unwrap();
    g.set(f64::NEG_INFINITY, &[("k", "neg")]).unwrap();

    let report = r.report();
    assert!(report.contains("odd{k=\"nan\"} NaN"));
    assert!(report.contains("odd{k=\"pos\"} +Inf"));
    assert!(report.contains("odd{k=\"neg\"} -Inf"));
}

#[test]
fn set_overwrites_previous_value() {
    let r = registry();
    let g = Gauge::new(GaugeOpts::new("v", "V."), &[r.clone()]).unwrap();
    g.set(1.0, &[]).unwrap();
    g.set(3.0, &[]).unwrap();
    assert_eq!(g.get(&[]), Some(3.0));
    assert_eq!(g.series_len(), 1);
}

#[test]
fn unknown_label_is_rejected() {
    let r = registry();
    let g = Gauge::new(GaugeOpts::new("v", "V.").labels(["span"]), &[r.clone()]).unwrap();
    let err = g.set(1.0, &[("spam", "x")]).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "INVALID_ARGUMENT");
    assert_eq!(g.series_len(), 0);
}

#[test]
fn invalid_names_are_rejected() {
    let r = registry();
    let err = Gauge::new(GaugeOpts::new("1bad", "Bad."), &[r.clone()]).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "INVALID_ARGUMENT");

    let err = Gauge::new(GaugeOpts::new("ok", "Ok.").labels(["a-b"]), &[r.clone()]).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "INVALID_ARGUMENT");

    let err = Gauge::new(GaugeOpts::new("ok", "Ok.").labels(["a", "a"]), &[r.clone()]).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "INVALID_ARGUMENT");
    assert!(r.is_empty());
}

#[test]
fn name_conflict_rolls_back_partial_registration() {
    let first = registry();
    let second = registry();
    Gauge::new(GaugeOpts::new("taken", "Taken."), &[second.clone()]).unwrap();

    let err = Gauge::new(GaugeOpts::new("taken", "Again."), &[first.clone(), second.clone()])
        .expect_err("must conflict");
    assert_eq!(err.kind().as_str(), "REGISTRY_CONFLICT");
    assert!(first.is_empty());
    assert_eq!(second.len(), 1);
    assert!(second.report().contains("Taken."));
}

#[test]
fn shared_gauge_renders_identically_in_every_registry() {
    let a = registry();
    let b = registry();
    let g = Gauge::new(GaugeOpts::new("shared", "Shared.").labels(["k"]), &[a.clone(), b.clone()]).unwrap();
    g.set(7.0, &[("k", "x")]).unwrap();
    g.set(8.0, &[("k", "y")]).unwrap();

    assert_eq!(a.report(), b.report());
    assert!(a.report().contains("shared{k=\"y\"} 8"));
}

#[test]
fn unregister_only_removes_the_same_gauge() {
    let a = registry();
    let b = registry();
    let in_a = Gauge::new(GaugeOpts::new("same_name", "A."), &[a.clone()]).unwrap();
    let in_b = Gauge::new(GaugeOpts::new("same_name", "B."), &[b.clone()]).unwrap();

    assert!(!a.unregister(&in_b));
    assert!(a.contains("same_name"));
    assert!(a.unregister(&in_a));
    assert!(!a.unregister(&in_a));
    assert!(a.is_empty());
    assert_eq!(b.len(), 1);
}

#[test]
fn declared_label_names_are_exposed() {
    let r = registry();
    let opts = GaugeOpts::new("cfg", "Config.").labels(["arch", "platform"]);
    let g = Gauge::new(opts, &[r.clone()]).unwrap();
    assert_eq!(g.name(), "cfg");
    assert_eq!(g.label_names(), &["arch".to_string(), "platform".to_string()][..]);

    let plain = Gauge::new(GaugeOpts::new("plain", "Plain."), &[r.clone()]).unwrap();
    assert!(plain.label_names().is_empty());
}
