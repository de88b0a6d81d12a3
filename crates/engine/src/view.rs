use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use orglens_core::{PersonRecord, SourceKey, SourceSystem};
use serde::Serialize;

use crate::error::EngineError;
use crate::index::Index;
use crate::query::{self, QueryFilter};

// ---------------------------------------------------------------------------
// View names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewName {
    Source(SourceSystem),
    Organizational,
    Department,
    Leadership,
    Managers,
}

impl FromStr for ViewName {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(system) = s.strip_prefix("source:") {
            if system.is_empty() {
                return Err(EngineError::UnknownView(s.to_string()));
            }
            return Ok(Self::Source(SourceSystem::from(system.to_string())));
        }
        match s {
            "organizational" => Ok(Self::Organizational),
            "department" => Ok(Self::Department),
            "leadership" => Ok(Self::Leadership),
            "managers" => Ok(Self::Managers),
            _ => Err(EngineError::UnknownView(s.to_string())),
        }
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(system) => write!(f, "source:{system}"),
            Self::Organizational => write!(f, "organizational"),
            Self::Department => write!(f, "department"),
            Self::Leadership => write!(f, "leadership"),
            Self::Managers => write!(f, "managers"),
        }
    }
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

/// A named, read-only projection of one index snapshot. Recomputed on every
/// call; never cached across ingestion cycles and never fed back into the
/// index.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    Source(SourceView),
    Organizational(OrgView),
    Department(DepartmentView),
    Leadership(RecordListView),
    Managers(RecordListView),
}

/// Source-preserving projection: one system's records exactly as ingested.
#[derive(Debug, Clone, Serialize)]
pub struct SourceView {
    pub system: SourceSystem,
    /// Insertion order, as the snapshot delivered them.
    pub records: Vec<PersonRecord>,
    /// Ladder only: the native level-ordered structure, ascending. Never
    /// flattened or reordered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<LadderLevel>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LadderLevel {
    pub level: u8,
    pub records: Vec<PersonRecord>,
}

/// Parent/children forest over orgchart-sourced records.
#[derive(Debug, Clone, Serialize)]
pub struct OrgView {
    pub roots: Vec<OrgNode>,
    /// Records whose `reports_to` resolves to nothing in this snapshot.
    pub dangling: Vec<DanglingLink>,
    /// Records unreachable from any root: their reporting chain loops.
    pub cyclic: Vec<SourceKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrgNode {
    pub record: PersonRecord,
    pub children: Vec<OrgNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DanglingLink {
    pub record: SourceKey,
    pub reports_to: SourceKey,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentView {
    pub departments: BTreeMap<String, Vec<PersonRecord>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordListView {
    pub records: Vec<PersonRecord>,
}

// ---------------------------------------------------------------------------
// Materialization
// ---------------------------------------------------------------------------

pub fn materialize(index: &Index, name: &ViewName) -> View {
    match name {
        ViewName::Source(system) => View::Source(source_view(index, system)),
        ViewName::Organizational => View::Organizational(org_view(index)),
        ViewName::Department => View::Department(department_view(index)),
        ViewName::Leadership => View::Leadership(RecordListView {
            records: query::run(
                index,
                &QueryFilter {
                    is_leadership: Some(true),
                    ..QueryFilter::default()
                },
            ),
        }),
        ViewName::Managers => View::Managers(RecordListView {
            records: query::run(
                index,
                &QueryFilter {
                    is_manager: Some(true),
                    ..QueryFilter::default()
                },
            ),
        }),
    }
}

fn source_view(index: &Index, system: &SourceSystem) -> SourceView {
    let records: Vec<PersonRecord> = index.system(system).into_iter().cloned().collect();

    let levels = if *system == SourceSystem::Ladder {
        let mut by_level: BTreeMap<u8, Vec<PersonRecord>> = BTreeMap::new();
        for record in &records {
            if let Some(level) = record.level {
                by_level.entry(level).or_default().push(record.clone());
            }
        }
        Some(
            by_level
                .into_iter()
                .map(|(level, records)| LadderLevel { level, records })
                .collect(),
        )
    } else {
        None
    };

    SourceView {
        system: system.clone(),
        records,
        levels,
    }
}

fn org_view(index: &Index) -> OrgView {
    let records = index.system(&SourceSystem::OrgChart);

    let mut children: HashMap<&SourceKey, Vec<&PersonRecord>> = HashMap::new();
    let mut roots: Vec<&PersonRecord> = Vec::new();
    let mut dangling = Vec::new();

    for &record in &records {
        match &record.reports_to {
            None => roots.push(record),
            Some(parent) => match index.get(parent) {
                Some(_) => children.entry(parent).or_default().push(record),
                None => {
                    // Broken link: report it and keep the record visible as
                    // a root rather than losing it from the projection.
                    dangling.push(DanglingLink {
                        record: record.key.clone(),
                        reports_to: parent.clone(),
                    });
                    roots.push(record);
                }
            },
        }
    }

    let mut visited: HashSet<SourceKey> = HashSet::new();
    let root_nodes: Vec<OrgNode> = roots
        .iter()
        .map(|record| build_node(record, &children, &mut visited))
        .collect();

    // Anything never reached from a root sits behind a reports_to cycle.
    let cyclic: Vec<SourceKey> = records
        .iter()
        .filter(|r| !visited.contains(&r.key))
        .map(|r| r.key.clone())
        .collect();

    OrgView {
        roots: root_nodes,
        dangling,
        cyclic,
    }
}

fn build_node(
    record: &PersonRecord,
    children: &HashMap<&SourceKey, Vec<&PersonRecord>>,
    visited: &mut HashSet<SourceKey>,
) -> OrgNode {
    visited.insert(record.key.clone());
    let child_nodes = children
        .get(&record.key)
        .map(|kids| {
            let mut nodes = Vec::new();
            for kid in kids {
                // Visited-set guard: a malformed snapshot can point two
                // parents at one record; walk it once.
                if !visited.contains(&kid.key) {
                    nodes.push(build_node(kid, children, visited));
                }
            }
            nodes
        })
        .unwrap_or_default();
    OrgNode {
        record: record.clone(),
        children: child_nodes,
    }
}

fn department_view(index: &Index) -> DepartmentView {
    let departments = index
        .departments()
        .map(|(name, records)| (name.clone(), records.into_iter().cloned().collect()))
        .collect();
    DepartmentView { departments }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
