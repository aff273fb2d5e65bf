//! Effective configuration for a CLI run.
//!
//! Layers, later wins: environment, band plan `config:` block, flags.

use anyhow::{anyhow, Result};
use ingestion::{BandPlan, GridCheck, IngestConfig};

/// Settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub grid_check: Option<String>,
    pub sequential: bool,
    pub threads: Option<usize>,
}

/// Merge `base`, the plan's `config:` overlay and the command-line overrides.
pub fn resolve(
    base: IngestConfig,
    plan: Option<&BandPlan>,
    overrides: &Overrides,
) -> Result<IngestConfig> {
    let mut config = match plan.and_then(|p| p.config.as_ref()) {
        Some(overlay) => base.overlay(overlay),
        None => base,
    };

    if let Some(raw) = &overrides.grid_check {
        config.grid_check =
            GridCheck::parse(raw).ok_or_else(|| anyhow!("unknown grid check policy {raw:?}"))?;
    }
    if overrides.sequential {
        config.parallel_reads = false;
    }
    if let Some(threads) = overrides.threads {
        config.max_read_threads = Some(threads);
    }

    config.validate()?;
    Ok(config)
}
