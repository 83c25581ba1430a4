//! Exporter config loader (strict parsing) and option resolution.

pub mod schema;

use std::fs;
use std::sync::Arc;

use procprom_core::error::{PromError, Result};
use procprom_core::registry::{default_registry, CollectorRegistry};

use crate::emitter::EmitterOptions;
use crate::sampler::{SamplerOptions, SysinfoSource};
use crate::source::{FixedSource, SnapshotSource};

pub use schema::{ExporterConfig, ServerSection, SourceDef};

/// Name resolving to the process-wide default registry.
pub const DEFAULT_REGISTRY: &str = "default";

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PromError::Internal(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| PromError::InvalidArgument(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve a validated config into emitter options.
///
/// `default` maps to the process-wide registry; every other name gets a
/// fresh registry of its own. Source timers start here, so call this from
/// inside the runtime that should drive them.
pub fn build_options(cfg: &ExporterConfig) -> Result<EmitterOptions> {
    let registries = cfg.registry_names()?.map(|names| {
        names
            .iter()
            .map(|n| {
                if n == DEFAULT_REGISTRY {
                    default_registry()
                } else {
                    Arc::new(CollectorRegistry::new())
                }
            })
            .collect::<Vec<_>>()
    });

    let metrics = match cfg.source()? {
        None => None,
        Some(def) => {
            let period = def.period();
            Some(match def {
                SourceDef::Sysinfo { loop_monitor, .. } => {
                    let opts = SamplerOptions { period, loop_monitor };
                    SysinfoSource::new(opts)? as Arc<dyn SnapshotSource>
                }
                SourceDef::Snapshot { path, .. } => {
                    FixedSource::from_file(path, period)? as Arc<dyn SnapshotSource>
                }
            })
        }
    };

    Ok(EmitterOptions { metrics, registries })
}
