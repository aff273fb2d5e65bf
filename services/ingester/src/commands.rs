//! Subcommand implementations. Each returns the JSON to print.

use std::path::Path;

use anyhow::{Context, Result};
use ingestion::{BandPlan, BandSpec, IngestConfig, Ingester, SourceLocator, StoreSummary};
use serde::Serialize;
use tracing::info;

use crate::config::{resolve, Overrides};

/// Output of `load`.
#[derive(Debug, Serialize)]
pub struct LoadReport {
    pub config: IngestConfig,
    pub store: StoreSummary,
}

struct Prepared {
    ingester: Ingester,
    specs: Option<Vec<BandSpec>>,
    locator: SourceLocator,
}

fn prepare(source: &Path, plan: Option<&Path>, overrides: &Overrides) -> Result<Prepared> {
    let plan = plan
        .map(|path| {
            BandPlan::from_file(path)
                .with_context(|| format!("Failed to read band plan {}", path.display()))
        })
        .transpose()?;

    let config = resolve(IngestConfig::from_env(), plan.as_ref(), overrides)?;
    let specs = match &plan {
        Some(plan) => plan.band_specs()?,
        None => None,
    };
    let locator = SourceLocator::detect(source);

    info!(
        source = %locator,
        kind = %locator.kind(),
        specs = specs.as_ref().map_or(0, |s| s.len()),
        grid_check = %config.grid_check,
        "Prepared ingestion"
    );

    Ok(Prepared {
        ingester: Ingester::with_file_driver(config)?,
        specs,
        locator,
    })
}

/// Discover bands and return the source metadata as JSON.
pub fn inspect(source: &Path, plan: Option<&Path>, overrides: &Overrides) -> Result<String> {
    let prepared = prepare(source, plan, overrides)?;
    let meta = prepared
        .ingester
        .load_meta(&prepared.locator, prepared.specs.as_deref())?;
    info!(bands = meta.bands.len(), "Inspected source");
    Ok(meta.to_json()?)
}

/// Load the source and return a [`LoadReport`] as JSON.
pub fn load(source: &Path, plan: Option<&Path>, overrides: &Overrides) -> Result<String> {
    let prepared = prepare(source, plan, overrides)?;
    let store = prepared
        .ingester
        .ingest(&prepared.locator, prepared.specs.as_deref())?;

    let report = LoadReport {
        config: prepared.ingester.config().clone(),
        store: store.summary(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
