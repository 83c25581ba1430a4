//! Last-value gauge registry rendering the Prometheus text exposition format.
//!
//! A [`Gauge`] is a shared handle. Registering one gauge in several
//! registries makes all of them render the same series, so registries that
//! hold the same gauges produce byte-identical reports. Gauges are rendered in
//! name order and series in label order to keep reports deterministic.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{PromError, Result};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else {
        v.to_string()
    }
}

fn valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Name, help text and label names of a gauge.
#[derive(Debug, Clone)]
pub struct GaugeOpts {
    pub name: String,
    pub help: String,
    pub labels: Vec<String>,
}

impl GaugeOpts {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self { name: name.into(), help: help.into(), labels: Vec::new() }
    }

    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }
}

struct GaugeInner {
    name: String,
    help: String,
    labels: Vec<String>,
    // label pairs in declaration order -> f64 bits
    series: DashMap<Vec<(String, String)>, AtomicU64>,
}

/// Settable gauge with optional labels.
#[derive(Clone)]
pub struct Gauge {
    inner: Arc<GaugeInner>,
}

impl std::fmt::Debug for Gauge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gauge")
            .field("name", &self.inner.name)
            .field("labels", &self.inner.labels)
            .finish()
    }
}

impl Gauge {
    /// Create a gauge and register it in every given registry.
    ///
    /// If any registry already holds a gauge with the same name, the gauge is
    /// removed again from the registries it was already added to and the
    /// conflict is returned.
    pub fn new(opts: GaugeOpts, registries: &[Arc<CollectorRegistry>]) -> Result<Self> {
        if !valid_metric_name(&opts.name) {
            return Err(PromError::InvalidArgument(format!("invalid metric name: {}", opts.name)));
        }
        for (i, l) in opts.labels.iter().enumerate() {
            if !valid_label_name(l) {
                return Err(PromError::InvalidArgument(format!(
                    "invalid label name for {}: {l}",
                    opts.name
                )));
            }
            if opts.labels[..i].contains(l) {
                return Err(PromError::InvalidArgument(format!(
                    "duplicate label name for {}: {l}",
                    opts.name
                )));
            }
        }

        let gauge = Self {
            inner: Arc::new(GaugeInner {
                name: opts.name,
                help: opts.help,
                labels: opts.labels,
                series: DashMap::new(),
            }),
        };

        for (i, registry) in registries.iter().enumerate() {
            if let Err(e) = registry.register(&gauge) {
                for prev in &registries[..i] {
                    prev.unregister(&gauge);
                }
                return Err(e);
            }
        }
        Ok(gauge)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn label_names(&self) -> &[String] {
        &self.inner.labels
    }

    /// Set the series identified by `labels` to `value`.
    ///
    /// `labels` may name any subset of the declared label names; the series
    /// carries exactly the labels given.
    pub fn set(&self, value: f64, labels: &[(&str, &str)]) -> Result<()> {
        let key = self.series_key(labels)?;
        let cell = self.inner.series.entry(key).or_insert_with(|| AtomicU64::new(0));
        cell.store(value.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Current value of a series, if it was ever set.
    pub fn get(&self, labels: &[(&str, &str)]) -> Option<f64> {
        let key = self.series_key(labels).ok()?;
        self.inner
            .series
            .get(&key)
            .map(|v| f64::from_bits(v.load(Ordering::Relaxed)))
    }

    /// Number of label combinations set so far.
    pub fn series_len(&self) -> usize {
        self.inner.series.len()
    }

    fn same_as(&self, other: &Gauge) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn series_key(&self, labels: &[(&str, &str)]) -> Result<Vec<(String, String)>> {
        if let Some((k, _)) = labels
            .iter()
            .find(|(k, _)| !self.inner.labels.iter().any(|l| l == k))
        {
            return Err(PromError::InvalidArgument(format!(
                "gauge {} has no label named {k}",
                self.inner.name
            )));
        }

        Ok(self
            .inner
            .labels
            .iter()
            .filter_map(|l| {
                labels
                    .iter()
                    .find(|(k, _)| *k == l.as_str())
                    .map(|(k, v)| (k.to_string(), v.to_string()))
            })
            .collect())
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, out: &mut String) {
        let name = &self.inner.name;
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(&self.inner.help));
        let _ = writeln!(out, "# TYPE {} gauge", name);

        let mut rows: Vec<(String, f64)> = self
            .inner
            .series
            .iter()
            .map(|r| {
                let label_str = r
                    .key()
                    .iter()
                    .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
                    .collect::<Vec<_>>()
                    .join(",");
                (label_str, f64::from_bits(r.value().load(Ordering::Relaxed)))
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        for (label_str, v) in rows {
            if label_str.is_empty() {
                let _ = writeln!(out, "{} {}", name, format_value(v));
            } else {
                let _ = writeln!(out, "{}{{{}}} {}", name, label_str, format_value(v));
            }
        }
    }
}

/// A set of gauges rendered together as one report.
#[derive(Default)]
pub struct CollectorRegistry {
    gauges: DashMap<String, Gauge>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self { gauges: DashMap::new() }
    }

    /// Add a gauge. Fails if a gauge with the same name is already present.
    pub fn register(&self, gauge: &Gauge) -> Result<()> {
        match self.gauges.entry(gauge.name().to_string()) {
            Entry::Occupied(_) => {
                tracing::debug!(gauge = %gauge.name(), "gauge name already taken");
                Err(PromError::RegistryConflict(format!(
                    "a gauge named {} is already registered",
                    gauge.name()
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(gauge.clone());
                Ok(())
            }
        }
    }

    /// Remove `gauge` if this exact gauge is registered. Returns whether it was.
    pub fn unregister(&self, gauge: &Gauge) -> bool {
        self.gauges
            .remove_if(gauge.name(), |_, g| g.same_as(gauge))
            .is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gauges.contains_key(name)
    }

    /// Number of registered gauges.
    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    /// Render every registered gauge, ordered by name.
    pub fn report(&self) -> String {
        let mut gauges: Vec<Gauge> = self.gauges.iter().map(|r| r.value().clone()).collect();
        gauges.sort_by(|a, b| a.name().cmp(b.name()));

        let mut out = String::new();
        for g in &gauges {
            g.render(&mut out);
        }
        out
    }
}

/// Process-wide registry used when no registries are configured.
pub fn default_registry() -> Arc<CollectorRegistry> {
    static DEFAULT: OnceLock<Arc<CollectorRegistry>> = OnceLock::new();
    Arc::clone(DEFAULT.get_or_init(|| Arc::new(CollectorRegistry::new())))
}
