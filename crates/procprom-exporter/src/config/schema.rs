use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::Value;

use procprom_core::error::{PromError, Result};

const PERIOD_MS_RANGE: std::ops::RangeInclusive<u64> = 100..=3_600_000;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    /// Snapshot source definition. Kept untyped so shape errors get a clear message.
    #[serde(default)]
    pub metrics: Option<Value>,

    /// Registry names. Kept untyped for the same reason.
    #[serde(default)]
    pub registries: Option<Value>,
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PromError::InvalidArgument(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.source()?;
        self.registry_names()?;
        Ok(())
    }

    /// Typed snapshot source definition; `None` means the default sampler.
    pub fn source(&self) -> Result<Option<SourceDef>> {
        let Some(raw) = &self.metrics else { return Ok(None) };
        if !raw.is_mapping() {
            return Err(PromError::InvalidArgument(
                "metrics must be a snapshot source definition".into(),
            ));
        }

        let def: SourceDef = serde_yaml::from_value(raw.clone()).map_err(|e| {
            PromError::InvalidArgument(format!("metrics must be a snapshot source definition: {e}"))
        })?;
        def.validate()?;
        Ok(Some(def))
    }

    /// Registry names in order; `None` means the default registry only.
    pub fn registry_names(&self) -> Result<Option<Vec<String>>> {
        let Some(raw) = &self.registries else { return Ok(None) };
        let Value::Sequence(items) = raw else {
            return Err(PromError::InvalidArgument(
                "registries must be a sequence of registry names".into(),
            ));
        };

        let mut names: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            let Value::String(name) = item else {
                return Err(PromError::InvalidArgument(
                    "registries must be a sequence of registry names".into(),
                ));
            };
            if names.contains(name) {
                return Err(PromError::InvalidArgument(format!("duplicate registry name: {name}")));
            }
            names.push(name.clone());
        }
        Ok(Some(names))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            PromError::InvalidArgument(format!(
                "server.listen must be a socket address, got {}",
                self.listen
            ))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:9464".into()
}

fn default_loop_monitor() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum SourceDef {
    /// Sample the running process and host.
    Sysinfo {
        #[serde(default)]
        period_ms: Option<u64>,
        #[serde(default = "default_loop_monitor")]
        loop_monitor: bool,
    },
    /// Replay a snapshot captured as JSON.
    Snapshot {
        path: String,
        #[serde(default)]
        period_ms: Option<u64>,
    },
}

impl SourceDef {
    pub fn period(&self) -> Option<Duration> {
        match self {
            SourceDef::Sysinfo { period_ms, .. } | SourceDef::Snapshot { period_ms, .. } => {
                period_ms.map(Duration::from_millis)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let (SourceDef::Sysinfo { period_ms, .. } | SourceDef::Snapshot { period_ms, .. }) = self;
        if let Some(ms) = period_ms {
            if !PERIOD_MS_RANGE.contains(ms) {
                return Err(PromError::InvalidArgument(format!(
                    "metrics.period_ms must be between {} and {}",
                    PERIOD_MS_RANGE.start(),
                    PERIOD_MS_RANGE.end()
                )));
            }
        }
        Ok(())
    }
}
