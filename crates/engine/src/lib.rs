//! `orglens-engine` — Hierarchy aggregation and cross-reference resolution.
//!
//! Pure engine crate: receives raw snapshot records, normalizes them into
//! the canonical schema, builds an immutable federated index, and infers
//! same-person clusters across source systems with explainable confidence
//! scores. No CLI dependencies; adapters and transport live elsewhere.

pub mod config;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod index;
pub mod normalize;
pub mod query;
pub mod report;
pub mod resolve;
pub mod similarity;
pub mod snapshot;
pub mod view;

pub use config::EngineConfig;
pub use cycle::{run_cycle, CycleBudget, CycleOutcome, SnapshotBatch};
pub use engine::Engine;
pub use error::EngineError;
pub use index::{Index, IndexBuilder, IndexStore};
pub use query::QueryFilter;
pub use resolve::{resolve, ResolutionOutcome};
pub use view::{View, ViewName};
