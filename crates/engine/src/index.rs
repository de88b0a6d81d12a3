use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use orglens_core::{PersonRecord, SourceKey, SourceSystem};
use parking_lot::RwLock;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// An immutable snapshot of the full record set plus derived lookup maps.
///
/// Built fresh each ingestion cycle; once constructed it never changes, so
/// queries, views and the resolver can all read it concurrently without
/// locking. Derived maps hold indices into the insertion-ordered record vec.
#[derive(Debug, Default)]
pub struct Index {
    records: Vec<PersonRecord>,
    by_key: HashMap<SourceKey, usize>,
    by_department: BTreeMap<String, Vec<usize>>,
    by_system: BTreeMap<SourceSystem, Vec<usize>>,
    leadership: Vec<usize>,
    managers: Vec<usize>,
    /// Blocking partition: first character of the folded name key. Within a
    /// block, the resolver prunes pairs with conflicting departments, so the
    /// department still bounds comparison work without ever separating a
    /// department-less record from its departmental counterpart.
    blocks: BTreeMap<char, Vec<usize>>,
    /// Records whose folded name key is empty. They cannot be blocked or
    /// scored; still individually queryable.
    unblockable: Vec<SourceKey>,
}

impl Index {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All records in stable insertion order.
    pub fn records(&self) -> &[PersonRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &SourceKey) -> Option<&PersonRecord> {
        self.by_key.get(key).map(|&i| &self.records[i])
    }

    /// Insertion position of a key, if present.
    pub fn position(&self, key: &SourceKey) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    /// Records for one department (case-insensitive), insertion order.
    pub fn department(&self, department: &str) -> Vec<&PersonRecord> {
        self.by_department
            .get(&department.to_lowercase())
            .map(|ids| ids.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// All departments present, lowercased, with their records.
    pub fn departments(&self) -> impl Iterator<Item = (&String, Vec<&PersonRecord>)> {
        self.by_department
            .iter()
            .map(|(name, ids)| (name, ids.iter().map(|&i| &self.records[i]).collect()))
    }

    /// Records for one source system, insertion order.
    pub fn system(&self, system: &SourceSystem) -> Vec<&PersonRecord> {
        self.by_system
            .get(system)
            .map(|ids| ids.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    pub fn systems(&self) -> impl Iterator<Item = &SourceSystem> {
        self.by_system.keys()
    }

    pub fn leadership(&self) -> Vec<&PersonRecord> {
        self.leadership.iter().map(|&i| &self.records[i]).collect()
    }

    pub fn managers(&self) -> Vec<&PersonRecord> {
        self.managers.iter().map(|&i| &self.records[i]).collect()
    }

    /// Blocking partition for the resolver, deterministic order.
    pub fn blocks(&self) -> &BTreeMap<char, Vec<usize>> {
        &self.blocks
    }

    pub fn record_at(&self, index: usize) -> &PersonRecord {
        &self.records[index]
    }

    pub fn unblockable(&self) -> &[SourceKey] {
        &self.unblockable
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a complete `Index` from normalized records, one source batch at
/// a time. Exposes no partial state: the index exists only once `build`
/// returns.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    records: Vec<PersonRecord>,
    committed_keys: HashSet<SourceKey>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage one source batch. All-or-nothing: a duplicate `(system, id)`
    /// inside the batch or against already-committed records rejects the
    /// whole batch and leaves the builder untouched.
    pub fn add_batch(&mut self, batch: Vec<PersonRecord>) -> Result<usize, EngineError> {
        let mut staged: HashSet<&SourceKey> = HashSet::with_capacity(batch.len());
        for record in &batch {
            if self.committed_keys.contains(&record.key) || !staged.insert(&record.key) {
                return Err(EngineError::DuplicateIdentity {
                    system: record.key.system.clone(),
                    id: record.key.id.clone(),
                });
            }
        }

        let count = batch.len();
        for record in batch {
            self.committed_keys.insert(record.key.clone());
            self.records.push(record);
        }
        Ok(count)
    }

    /// Assemble the immutable index. Single atomic step; callers publish the
    /// returned value as a whole.
    pub fn build(self) -> Index {
        let mut index = Index {
            records: self.records,
            ..Index::default()
        };

        for (i, record) in index.records.iter().enumerate() {
            index.by_key.insert(record.key.clone(), i);
            index
                .by_system
                .entry(record.key.system.clone())
                .or_default()
                .push(i);

            if let Some(department) = &record.department {
                index
                    .by_department
                    .entry(department.to_lowercase())
                    .or_default()
                    .push(i);
            }
            if record.is_leadership {
                index.leadership.push(i);
            }
            if record.is_manager {
                index.managers.push(i);
            }

            match record.name_key.chars().next() {
                Some(initial) => index.blocks.entry(initial).or_default().push(i),
                None => index.unblockable.push(record.key.clone()),
            }
        }

        index
    }
}

// ---------------------------------------------------------------------------
// Store — atomic publication
// ---------------------------------------------------------------------------

/// Holds the currently published index behind an atomic reference swap.
///
/// Readers clone the `Arc` and keep working against their snapshot; a
/// superseded index lives until its last reader drops it. Readers see either
/// the fully-previous or fully-next index, never a mixture.
#[derive(Debug)]
pub struct IndexStore {
    current: RwLock<Arc<Index>>,
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Index::empty())),
        }
    }

    pub fn publish(&self, index: Index) -> Arc<Index> {
        let published = Arc::new(index);
        *self.current.write() = Arc::clone(&published);
        published
    }

    pub fn snapshot(&self) -> Arc<Index> {
        Arc::clone(&self.current.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orglens_core::RawRecord;

    use crate::config::ClassifyConfig;
    use crate::normalize::Normalizer;

    fn person(system: SourceSystem, id: &str, name: &str, dept: Option<&str>) -> PersonRecord {
        let normalizer = Normalizer::new(&ClassifyConfig::default());
        let raw = RawRecord {
            id: Some(id.into()),
            name: Some(name.into()),
            department: dept.map(String::from),
            ..RawRecord::default()
        };
        normalizer.normalize(&system, &raw).unwrap()
    }

    #[test]
    fn build_derives_lookup_maps() {
        let mut builder = IndexBuilder::new();
        builder
            .add_batch(vec![
                person(SourceSystem::Ladder, "L1", "Sarah Johnson", None),
                person(SourceSystem::Ladder, "L2", "Robert Chen", None),
            ])
            .unwrap();
        builder
            .add_batch(vec![person(
                SourceSystem::Department,
                "D9",
                "Sarah Johnson",
                Some("Marketing"),
            )])
            .unwrap();

        let index = builder.build();
        assert_eq!(index.len(), 3);
        assert_eq!(index.system(&SourceSystem::Ladder).len(), 2);
        assert_eq!(index.department("MARKETING").len(), 1);
        // Both Sarahs share the 's' block despite the department difference.
        assert_eq!(index.blocks()[&'s'].len(), 2);
        assert!(index
            .get(&SourceKey::new(SourceSystem::Department, "D9"))
            .is_some());
    }

    #[test]
    fn duplicate_within_batch_rejects_whole_batch() {
        let mut builder = IndexBuilder::new();
        let err = builder
            .add_batch(vec![
                person(SourceSystem::Ladder, "L1", "Sarah Johnson", None),
                person(SourceSystem::Ladder, "L1", "Sarah Johnson", None),
            ])
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateIdentity { .. }));
        assert_eq!(builder.build().len(), 0);
    }

    #[test]
    fn duplicate_across_batches_rejects_only_second_batch() {
        let mut builder = IndexBuilder::new();
        builder
            .add_batch(vec![person(SourceSystem::Ladder, "L1", "Sarah Johnson", None)])
            .unwrap();
        let err = builder
            .add_batch(vec![
                person(SourceSystem::Ladder, "L9", "Kim Diaz", None),
                person(SourceSystem::Ladder, "L1", "Sarah Johnson", None),
            ])
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateIdentity { .. }));

        // First batch's contribution survives; the bad batch contributes nothing.
        let index = builder.build();
        assert_eq!(index.len(), 1);
        assert!(index.get(&SourceKey::new(SourceSystem::Ladder, "L9")).is_none());
    }

    #[test]
    fn same_id_in_different_systems_is_fine() {
        let mut builder = IndexBuilder::new();
        builder
            .add_batch(vec![person(SourceSystem::Ladder, "1", "Sarah Johnson", None)])
            .unwrap();
        builder
            .add_batch(vec![person(SourceSystem::OrgChart, "1", "Sarah Johnson", None)])
            .unwrap();
        assert_eq!(builder.build().len(), 2);
    }

    #[test]
    fn empty_name_key_is_unblockable() {
        let mut builder = IndexBuilder::new();
        // "Dr." folds to an empty name key.
        builder
            .add_batch(vec![person(SourceSystem::OrgChart, "E1", "Dr.", None)])
            .unwrap();
        let index = builder.build();
        assert!(index.blocks().is_empty());
        assert_eq!(index.unblockable().len(), 1);
        // Still individually queryable.
        assert!(index.get(&SourceKey::new(SourceSystem::OrgChart, "E1")).is_some());
    }

    #[test]
    fn store_swaps_atomically_and_keeps_old_snapshots_alive() {
        let store = IndexStore::new();
        let before = store.snapshot();
        assert!(before.is_empty());

        let mut builder = IndexBuilder::new();
        builder
            .add_batch(vec![person(SourceSystem::Ladder, "L1", "Sarah Johnson", None)])
            .unwrap();
        store.publish(builder.build());

        // The old snapshot is unchanged; a fresh snapshot sees the new index.
        assert!(before.is_empty());
        assert_eq!(store.snapshot().len(), 1);
    }
}
