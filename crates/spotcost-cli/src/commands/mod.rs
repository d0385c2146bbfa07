//! Subcommand implementations

mod config;
mod estimate;
mod optimize;
mod slots;

pub use config::ConfigArgs;
pub use estimate::EstimateArgs;
pub use optimize::OptimizeArgs;
pub use slots::SlotsArgs;

use anyhow::{Context, Result};
use spotcost_optimization::{InMemoryPriceStore, OptimizationRequest};
use std::path::Path;
use std::sync::Arc;

/// Read an optimization request from a JSON file
pub(crate) fn load_request(path: &Path) -> Result<OptimizationRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse request: {}", path.display()))
}

/// Load a price snapshot into an in-memory store
pub(crate) fn load_store(path: &Path) -> Result<Arc<InMemoryPriceStore>> {
    let store = InMemoryPriceStore::load(path)
        .with_context(|| format!("Failed to load prices: {}", path.display()))?;
    tracing::info!(
        "Loaded {} price points from {}",
        store.price_point_count(),
        path.display()
    );
    Ok(Arc::new(store))
}
