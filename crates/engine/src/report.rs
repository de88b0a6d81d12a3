use orglens_core::SourceKey;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Ingestion report
// ---------------------------------------------------------------------------

/// Per-record and per-source problems from one ingestion phase.
///
/// These are aggregated, never raised: a malformed record is skipped and
/// counted, a duplicate identity aborts only its source's batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub normalized: usize,
    pub skipped: usize,
    pub skipped_reasons: Vec<String>,
    pub aborted_sources: Vec<AbortedSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbortedSource {
    pub source: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Resolver diagnostics
// ---------------------------------------------------------------------------

/// Non-fatal resolver findings, reported as counts/lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolverDiagnostics {
    /// Records with an empty folded name key: excluded from blocking and
    /// scoring, still individually queryable.
    pub unblockable: Vec<SourceKey>,
    pub pairs_scored: usize,
    pub edges: usize,
}

// ---------------------------------------------------------------------------
// Cycle metadata + summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

impl CycleMeta {
    pub fn now(config_name: &str) -> Self {
        Self {
            config_name: config_name.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    pub records: usize,
    pub cross_references: usize,
    pub likely_same_person: usize,
    pub skipped_records: usize,
    pub aborted_sources: usize,
    pub unblockable_records: usize,
}

pub fn compute_summary(
    records: usize,
    ingest: &IngestReport,
    cross_references: &[orglens_core::CrossReference],
    diagnostics: &ResolverDiagnostics,
) -> CycleSummary {
    CycleSummary {
        records,
        cross_references: cross_references.len(),
        likely_same_person: cross_references.iter().filter(|x| x.likely_same_person).count(),
        skipped_records: ingest.skipped,
        aborted_sources: ingest.aborted_sources.len(),
        unblockable_records: diagnostics.unblockable.len(),
    }
}
