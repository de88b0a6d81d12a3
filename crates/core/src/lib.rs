//! `orglens-core` — Canonical data model shared across the workspace.
//!
//! Source systems stay untouched; everything here is the engine's own view
//! of their records. Types only, no behavior beyond key handling.

pub mod model;

pub use model::{
    CrossReference, MatchEvidence, PersonRecord, RawRecord, SourceKey, SourceSystem,
};
