use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use orglens_core::{CrossReference, RawRecord, SourceSystem};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::index::{Index, IndexBuilder};
use crate::normalize::Normalizer;
use crate::report::{compute_summary, AbortedSource, CycleMeta, CycleSummary, IngestReport, ResolverDiagnostics};
use crate::resolve::resolve;

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

/// Wall-clock budget and cancellation handle for one cycle.
///
/// Checked between phases and inside block scoring. On expiry or
/// cancellation the run aborts and all staged work is discarded; the
/// previously published index stays authoritative.
#[derive(Debug, Clone)]
pub struct CycleBudget {
    started: Instant,
    deadline: Option<Duration>,
    cancel: Arc<AtomicBool>,
}

impl CycleBudget {
    pub fn unbounded() -> Self {
        Self {
            started: Instant::now(),
            deadline: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            started: Instant::now(),
            deadline: Some(deadline),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle a supervising caller can flip to cancel the running cycle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Cheap flag probe for inner loops; the owning phase reports the error.
    pub fn interrupted(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| self.started.elapsed() > d)
    }

    pub fn check(&self) -> Result<(), EngineError> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(EngineError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if self.started.elapsed() > deadline {
                return Err(EngineError::Timeout {
                    budget_ms: deadline.as_millis() as u64,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Batches + outcome
// ---------------------------------------------------------------------------

/// One source's snapshot for this cycle, in source-native raw shape.
#[derive(Debug, Clone)]
pub struct SnapshotBatch {
    /// Config source name, used in reports.
    pub source: String,
    pub system: SourceSystem,
    pub records: Vec<RawRecord>,
}

/// Everything one completed cycle produced besides the index itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleOutcome {
    pub meta: CycleMeta,
    pub summary: CycleSummary,
    pub ingest: IngestReport,
    pub cross_references: Vec<CrossReference>,
    pub resolver: ResolverDiagnostics,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Run one discrete ingestion + resolution cycle.
///
/// Per-record problems are isolated into the ingest report; a duplicate
/// identity aborts only the offending source's batch. Nothing is published
/// here — the caller swaps the returned index in atomically once the whole
/// cycle has succeeded.
pub fn run_cycle(
    config: &EngineConfig,
    batches: &[SnapshotBatch],
    budget: &CycleBudget,
) -> Result<(Index, CycleOutcome), EngineError> {
    budget.check()?;

    let normalizer = Normalizer::new(&config.classify);
    let mut builder = IndexBuilder::new();
    let mut ingest = IngestReport::default();

    for batch in batches {
        budget.check()?;
        let mut normalized = Vec::with_capacity(batch.records.len());
        for raw in &batch.records {
            match normalizer.normalize(&batch.system, raw) {
                Ok(record) => normalized.push(record),
                Err(err) => {
                    ingest.skipped += 1;
                    ingest.skipped_reasons.push(err.to_string());
                }
            }
        }

        match builder.add_batch(normalized) {
            Ok(count) => {
                ingest.normalized += count;
                debug!(source = %batch.source, records = count, "batch staged");
            }
            Err(err @ EngineError::DuplicateIdentity { .. }) => {
                info!(source = %batch.source, %err, "source batch aborted");
                ingest.aborted_sources.push(AbortedSource {
                    source: batch.source.clone(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    budget.check()?;
    let index = builder.build();
    debug!(records = index.len(), "index assembled");

    let resolution = resolve(&index, config, budget)?;
    info!(
        records = index.len(),
        cross_references = resolution.cross_references.len(),
        "cycle resolved"
    );

    let summary = compute_summary(
        index.len(),
        &ingest,
        &resolution.cross_references,
        &resolution.diagnostics,
    );

    let outcome = CycleOutcome {
        meta: CycleMeta::now(&config.name),
        summary,
        ingest,
        cross_references: resolution.cross_references,
        resolver: resolution.diagnostics,
    };

    Ok((index, outcome))
}
