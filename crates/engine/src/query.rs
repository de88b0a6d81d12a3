use orglens_core::{PersonRecord, SourceSystem};
use serde::Deserialize;

use crate::index::Index;

/// Predicate set for record queries. Every supplied predicate is ANDed; an
/// absent predicate imposes no constraint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryFilter {
    pub department: Option<String>,
    pub source_system: Option<SourceSystem>,
    pub is_leadership: Option<bool>,
    pub is_manager: Option<bool>,
    pub name_contains: Option<String>,
}

impl QueryFilter {
    fn matches(&self, record: &PersonRecord) -> bool {
        if let Some(department) = &self.department {
            match &record.department {
                Some(d) if d.eq_ignore_ascii_case(department) => {}
                _ => return false,
            }
        }
        if let Some(system) = &self.source_system {
            if &record.key.system != system {
                return false;
            }
        }
        if let Some(is_leadership) = self.is_leadership {
            if record.is_leadership != is_leadership {
                return false;
            }
        }
        if let Some(is_manager) = self.is_manager {
            if record.is_manager != is_manager {
                return false;
            }
        }
        if let Some(fragment) = &self.name_contains {
            if !record
                .canonical_name
                .to_lowercase()
                .contains(&fragment.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Run a predicate-filtered read against one index snapshot.
///
/// Results keep the index's stable insertion order — never re-sorted — and
/// are copies, so callers cannot mutate the index through them.
pub fn run(index: &Index, filter: &QueryFilter) -> Vec<PersonRecord> {
    index
        .records()
        .iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect()
}
