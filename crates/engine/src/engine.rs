use std::sync::Arc;

use orglens_core::{CrossReference, PersonRecord};
use parking_lot::RwLock;

use crate::config::EngineConfig;
use crate::cycle::{run_cycle, CycleBudget, CycleOutcome, SnapshotBatch};
use crate::error::EngineError;
use crate::index::{Index, IndexStore};
use crate::query::{self, QueryFilter};
use crate::report::CycleSummary;
use crate::view::{self, View, ViewName};

/// The engine facade: owns the published index and the resolution computed
/// from it, and serves all read operations.
///
/// Reads never block ingestion and never block each other — each call grabs
/// an `Arc` snapshot of whichever index was current when it began. A failed
/// or cancelled cycle publishes nothing; callers keep getting the best
/// available index, and cycle failures surface only through the out-of-band
/// diagnostics, never as an error on an unrelated query.
pub struct Engine {
    config: EngineConfig,
    store: IndexStore,
    last_outcome: RwLock<Option<CycleOutcome>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            store: IndexStore::new(),
            last_outcome: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one discrete ingestion + resolution cycle and publish its index
    /// atomically. On any error the previously published index remains
    /// authoritative and partial work is discarded.
    pub fn ingest_cycle(
        &self,
        batches: &[SnapshotBatch],
        budget: &CycleBudget,
    ) -> Result<CycleSummary, EngineError> {
        let (index, outcome) = run_cycle(&self.config, batches, budget)?;
        let summary = outcome.summary.clone();
        self.store.publish(index);
        *self.last_outcome.write() = Some(outcome);
        Ok(summary)
    }

    /// Predicate-filtered read against the current index snapshot.
    pub fn query(&self, filter: &QueryFilter) -> Vec<PersonRecord> {
        query::run(&self.store.snapshot(), filter)
    }

    /// Materialize a named projection from the current index snapshot.
    pub fn materialize_view(&self, name: &ViewName) -> View {
        view::materialize(&self.store.snapshot(), name)
    }

    /// Cross-references from the last completed cycle, optionally filtered
    /// by a confidence floor.
    pub fn cross_references(&self, min_confidence: Option<f64>) -> Vec<CrossReference> {
        let floor = min_confidence.unwrap_or(0.0);
        self.last_outcome
            .read()
            .as_ref()
            .map(|outcome| {
                outcome
                    .cross_references
                    .iter()
                    .filter(|x| x.confidence >= floor)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Out-of-band diagnostics channel: the full outcome of the last
    /// completed cycle, if any.
    pub fn diagnostics(&self) -> Option<CycleOutcome> {
        self.last_outcome.read().clone()
    }

    /// The current index snapshot. Immutable; safe to hold across cycles.
    pub fn index(&self) -> Arc<Index> {
        self.store.snapshot()
    }
}
