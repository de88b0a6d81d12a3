use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Source identity
// ---------------------------------------------------------------------------

/// Tag for the system a record originated from.
///
/// The three known systems get their own variants; anything else round-trips
/// through `Other` so a new source never requires a schema change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceSystem {
    Ladder,
    OrgChart,
    Department,
    Other(String),
}

impl SourceSystem {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ladder => "ladder",
            Self::OrgChart => "orgchart",
            Self::Department => "department",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for SourceSystem {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ladder" => Self::Ladder,
            "orgchart" => Self::OrgChart,
            "department" => Self::Department,
            _ => Self::Other(value),
        }
    }
}

impl From<SourceSystem> for String {
    fn from(value: SourceSystem) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Globally unique record identity: `(sourceSystem, sourceId)`.
///
/// Always originates from the source system; the engine never invents one.
/// Relational references (`reports_to`) carry this key and are resolved by
/// lookup at materialization time, never stored as pointers — snapshots
/// refresh independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceKey {
    pub system: SourceSystem,
    pub id: String,
}

impl SourceKey {
    pub fn new(system: SourceSystem, id: impl Into<String>) -> Self {
        Self { system, id: id.into() }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.system, self.id)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One record in source-native shape, as handed over by an adapter.
///
/// Everything is optional except what the normalizer validates; unknown
/// columns land in `fields` untouched.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub level: Option<String>,
    pub reports_to: Option<String>,
    pub fields: BTreeMap<String, String>,
}

/// A normalized person record in the canonical schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonRecord {
    pub key: SourceKey,
    pub canonical_name: String,
    /// Folded/stripped form of the name, used for blocking.
    pub name_key: String,
    pub title: String,
    pub department: Option<String>,
    /// Ordinal rank; meaningful only within the ladder system.
    pub level: Option<u8>,
    /// Lookup key into the same source system, resolved at view time.
    pub reports_to: Option<SourceKey>,
    pub is_leadership: bool,
    pub is_manager: bool,
    /// Opaque original fields, retained for traceability only.
    pub raw: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Cross-references
// ---------------------------------------------------------------------------

/// One scored pairwise comparison that contributed to a cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchEvidence {
    pub left: SourceKey,
    pub right: SourceKey,
    pub name_similarity: f64,
    pub title_similarity: f64,
    pub structural_compatibility: f64,
    pub score: f64,
}

/// A cluster of record identities believed to denote one person.
///
/// Membership is the transitive closure of pairwise matches from one
/// resolver run. Confidence is the minimum edge score inside the cluster —
/// conservative, never optimistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossReference {
    pub members: Vec<SourceKey>,
    pub confidence: f64,
    pub likely_same_person: bool,
    pub evidence: Vec<MatchEvidence>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
