use std::collections::BTreeMap;

use orglens_core::{CrossReference, MatchEvidence, PersonRecord};
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::cycle::CycleBudget;
use crate::error::EngineError;
use crate::index::Index;
use crate::report::ResolverDiagnostics;
use crate::similarity::{name_similarity, round6, structural_compatibility, title_similarity};

/// Clusters plus the non-fatal diagnostics of one resolver run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ResolutionOutcome {
    pub cross_references: Vec<CrossReference>,
    pub diagnostics: ResolverDiagnostics,
}

/// Infer same-person clusters across systems from one built index.
///
/// Blocking bounds the work: only records sharing a name-key initial are ever
/// compared, and pairs whose departments conflict are pruned inside a block.
/// The trade-off is recall — matches whose name encoding diverges at the
/// first character are missed. That limitation is documented, not hidden.
///
/// Scoring is parallel per block and read-only; the union-find merge runs
/// single-threaded over deterministically ordered edges, so the output is
/// identical regardless of worker scheduling.
pub fn resolve(
    index: &Index,
    config: &EngineConfig,
    budget: &CycleBudget,
) -> Result<ResolutionOutcome, EngineError> {
    budget.check()?;

    let blocks: Vec<&Vec<usize>> = index.blocks().values().collect();
    let scored: Vec<BlockScore> = blocks
        .par_iter()
        .map(|ids| score_block(index, config, ids, budget))
        .collect();

    budget.check()?;

    let mut edges: Vec<MatchEvidence> = Vec::new();
    let mut pairs_scored = 0;
    for block in scored {
        pairs_scored += block.pairs_scored;
        edges.extend(block.edges);
    }
    // Parallel collection preserved block order; sorting by key pair makes
    // the merge independent of even that.
    edges.sort_by(|a, b| (&a.left, &a.right).cmp(&(&b.left, &b.right)));

    let mut clusters = ClusterSet::new(index.len());
    for edge in &edges {
        let left = index_of(index, &edge.left);
        let right = index_of(index, &edge.right);
        clusters.union(left, right);
    }

    budget.check()?;

    // Group edges by cluster root; the cluster's confidence is the minimum
    // edge score among its connecting pairs.
    let mut by_root: BTreeMap<usize, Vec<MatchEvidence>> = BTreeMap::new();
    for edge in edges {
        let root = clusters.find(index_of(index, &edge.left));
        by_root.entry(root).or_default().push(edge);
    }

    let likely_threshold = config.resolver.likely_threshold;
    let mut cross_references: Vec<CrossReference> = by_root
        .into_values()
        .map(|evidence| {
            let confidence = evidence
                .iter()
                .map(|e| e.score)
                .fold(f64::INFINITY, f64::min);
            let confidence = round6(confidence);

            let mut members: Vec<_> = evidence
                .iter()
                .flat_map(|e| [e.left.clone(), e.right.clone()])
                .collect();
            members.sort();
            members.dedup();

            CrossReference {
                members,
                confidence,
                likely_same_person: confidence >= likely_threshold,
                evidence,
            }
        })
        .collect();
    cross_references.sort_by(|a, b| a.members.cmp(&b.members));
    let edge_count = cross_references.iter().map(|r| r.evidence.len()).sum();

    Ok(ResolutionOutcome {
        cross_references,
        diagnostics: ResolverDiagnostics {
            unblockable: index.unblockable().to_vec(),
            pairs_scored,
            edges: edge_count,
        },
    })
}

fn index_of(index: &Index, key: &orglens_core::SourceKey) -> usize {
    // Edges were produced from this index, so the key is always present.
    index.position(key).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Pair scoring
// ---------------------------------------------------------------------------

struct BlockScore {
    edges: Vec<MatchEvidence>,
    pairs_scored: usize,
}

fn score_block(
    index: &Index,
    config: &EngineConfig,
    ids: &[usize],
    budget: &CycleBudget,
) -> BlockScore {
    let mut edges = Vec::new();
    let mut pairs_scored = 0;

    if budget.interrupted() {
        // The cycle-level check after the parallel phase turns this into a
        // Timeout/Cancelled result; no point finishing the block.
        return BlockScore { edges, pairs_scored };
    }

    for (offset, &left_id) in ids.iter().enumerate() {
        let left = index.record_at(left_id);
        for &right_id in &ids[offset + 1..] {
            let right = index.record_at(right_id);

            // Cross-system only: within one system the (system, id) invariant
            // already separates identities.
            if left.key.system == right.key.system {
                continue;
            }
            // Department conflict prunes the pair before any scoring.
            if structural_compatibility(left.department.as_deref(), right.department.as_deref())
                == 0.0
            {
                continue;
            }

            pairs_scored += 1;
            if let Some(evidence) = score_pair(left, right, config) {
                edges.push(evidence);
            }
        }
    }

    BlockScore { edges, pairs_scored }
}

fn score_pair(
    left: &PersonRecord,
    right: &PersonRecord,
    config: &EngineConfig,
) -> Option<MatchEvidence> {
    let name = name_similarity(&left.name_key, &right.name_key);
    let title = title_similarity(
        &left.title,
        (left.is_leadership, left.is_manager),
        &right.title,
        (right.is_leadership, right.is_manager),
        &config.classify.title_synonyms,
    );
    let structural =
        structural_compatibility(left.department.as_deref(), right.department.as_deref());

    let weights = &config.resolver.weights;
    let score = round6(weights.name * name + weights.title * title + weights.structure * structural);

    if score < config.resolver.pair_threshold {
        return None;
    }

    // Orient each edge by key order so identical input yields identical output.
    let (a, b) = if left.key <= right.key {
        (left, right)
    } else {
        (right, left)
    };
    Some(MatchEvidence {
        left: a.key.clone(),
        right: b.key.clone(),
        name_similarity: round6(name),
        title_similarity: round6(title),
        structural_compatibility: structural,
        score,
    })
}

// ---------------------------------------------------------------------------
// Union-find
// ---------------------------------------------------------------------------

/// Disjoint-set union with path compression and union by rank. Runs
/// single-threaded after scoring so cluster formation stays deterministic.
struct ClusterSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl ClusterSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }
        if self.rank[root_x] < self.rank[root_y] {
            self.parent[root_x] = root_y;
        } else if self.rank[root_x] > self.rank[root_y] {
            self.parent[root_y] = root_x;
        } else {
            self.parent[root_y] = root_x;
            self.rank[root_x] += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use orglens_core::{RawRecord, SourceKey, SourceSystem};

    use crate::config::ClassifyConfig;
    use crate::index::IndexBuilder;
    use crate::normalize::Normalizer;

    fn config() -> EngineConfig {
        EngineConfig::from_toml(r#"name = "test""#).unwrap()
    }

    fn person(
        system: SourceSystem,
        id: &str,
        name: &str,
        title: &str,
        dept: Option<&str>,
    ) -> orglens_core::PersonRecord {
        let normalizer = Normalizer::new(&ClassifyConfig::default());
        let raw = RawRecord {
            id: Some(id.into()),
            name: Some(name.into()),
            title: Some(title.into()),
            department: dept.map(String::from),
            ..RawRecord::default()
        };
        normalizer.normalize(&system, &raw).unwrap()
    }

    fn build_index(records: Vec<orglens_core::PersonRecord>) -> Index {
        let mut builder = IndexBuilder::new();
        builder.add_batch(records).unwrap();
        builder.build()
    }

    #[test]
    fn spec_scenario_scores_exactly_at_the_pair_threshold() {
        let index = build_index(vec![
            person(SourceSystem::Ladder, "L1", "Sarah Johnson", "Master Agent", None),
            person(
                SourceSystem::Department,
                "D9",
                "Sarah Johnson",
                "Marketing Director",
                Some("Marketing"),
            ),
        ]);
        let outcome = resolve(&index, &config(), &CycleBudget::unbounded()).unwrap();

        assert_eq!(outcome.cross_references.len(), 1);
        let xref = &outcome.cross_references[0];
        assert_eq!(xref.confidence, 0.75);
        assert!(!xref.likely_same_person);
        assert_eq!(xref.members.len(), 2);

        let evidence = &xref.evidence[0];
        assert_eq!(evidence.name_similarity, 1.0);
        assert_eq!(evidence.title_similarity, 0.3);
        assert_eq!(evidence.structural_compatibility, 0.5);
        assert_eq!(evidence.score, 0.75);
    }

    #[test]
    fn clusters_are_transitive_and_confidence_is_min_edge() {
        // A–B and B–C clear the threshold; A–C (conflicting departments)
        // would not even be scored. All three must land in one cluster.
        let index = build_index(vec![
            person(SourceSystem::Ladder, "L1", "Ann Lee", "", Some("Ops")),
            person(SourceSystem::OrgChart, "E1", "Ann Lee", "", None),
            person(SourceSystem::Department, "D1", "Ann Lee", "", Some("Sales")),
        ]);
        let outcome = resolve(&index, &config(), &CycleBudget::unbounded()).unwrap();

        assert_eq!(outcome.cross_references.len(), 1);
        let xref = &outcome.cross_references[0];
        assert_eq!(xref.members.len(), 3);
        assert_eq!(xref.evidence.len(), 2);
        // Both edges score 0.6 + 0.25·0.3 + 0.15·0.5 = 0.75.
        assert_eq!(xref.confidence, 0.75);
        assert!(!xref.likely_same_person);
    }

    #[test]
    fn likely_same_person_above_the_likely_threshold() {
        let index = build_index(vec![
            person(
                SourceSystem::OrgChart,
                "E7",
                "Michael Torres",
                "Director of Sales",
                Some("Sales"),
            ),
            person(
                SourceSystem::Department,
                "D7",
                "Michael Torres",
                "Sales Director",
                Some("Sales"),
            ),
        ]);
        let outcome = resolve(&index, &config(), &CycleBudget::unbounded()).unwrap();

        assert_eq!(outcome.cross_references.len(), 1);
        let xref = &outcome.cross_references[0];
        assert_eq!(xref.confidence, 1.0);
        assert!(xref.likely_same_person);
    }

    #[test]
    fn same_system_records_are_never_paired() {
        let index = build_index(vec![
            person(SourceSystem::Ladder, "L1", "Sarah Johnson", "Master Agent", None),
            person(SourceSystem::Ladder, "L2", "Sarah Johnson", "Master Agent", None),
        ]);
        let outcome = resolve(&index, &config(), &CycleBudget::unbounded()).unwrap();
        assert!(outcome.cross_references.is_empty());
        assert_eq!(outcome.diagnostics.pairs_scored, 0);
    }

    #[test]
    fn divergent_initials_are_a_documented_miss() {
        // Same person, but one source spells the name with a leading
        // nickname; different blocks, never compared.
        let index = build_index(vec![
            person(SourceSystem::Ladder, "L1", "Robert Chen", "", None),
            person(SourceSystem::OrgChart, "E1", "Bob Chen", "", None),
        ]);
        let outcome = resolve(&index, &config(), &CycleBudget::unbounded()).unwrap();
        assert!(outcome.cross_references.is_empty());
    }

    #[test]
    fn unblockable_records_are_reported_not_dropped() {
        let index = build_index(vec![
            person(SourceSystem::OrgChart, "E1", "Dr.", "", None),
            person(SourceSystem::Ladder, "L1", "Sarah Johnson", "", None),
        ]);
        let outcome = resolve(&index, &config(), &CycleBudget::unbounded()).unwrap();
        assert_eq!(
            outcome.diagnostics.unblockable,
            vec![SourceKey::new(SourceSystem::OrgChart, "E1")]
        );
    }

    #[test]
    fn rerun_on_unchanged_index_is_identical() {
        let index = build_index(vec![
            person(SourceSystem::Ladder, "L1", "Sarah Johnson", "Master Agent", None),
            person(SourceSystem::OrgChart, "E1", "Sarah Johnson", "Chief Executive Officer", None),
            person(
                SourceSystem::Department,
                "D9",
                "Sarah Johnson",
                "Marketing Director",
                Some("Marketing"),
            ),
            person(SourceSystem::OrgChart, "E2", "Robert Chen", "VP Sales", Some("Sales")),
            person(SourceSystem::Department, "D2", "Robert Chen", "VP Sales", Some("Sales")),
        ]);
        let first = resolve(&index, &config(), &CycleBudget::unbounded()).unwrap();
        let second = resolve(&index, &config(), &CycleBudget::unbounded()).unwrap();
        assert_eq!(first, second);
    }
}
