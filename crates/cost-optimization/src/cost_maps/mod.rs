//! Cost maps feeding the chain optimizer
//!
//! This module turns price collaborators into three lookup tables:
//! - compute cost per (region, instance, start hour, parallel factor)
//! - storage cost per (region, instance, parallel factor)
//! - transfer cost per GB per (source region, destination region)

// Module declarations
mod builder;
mod compute;
mod storage;
mod transfer;

// Re-export commonly used types
pub use builder::{CostMapBuilder, CostMaps, MapSizes};
pub use compute::ComputeCostMap;
pub use storage::{StorageCostMap, StorageSku, GB_PER_GIB};
pub use transfer::{TransferCostMap, TransferPolicy};
