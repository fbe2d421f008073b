//! Reconciliation of a cached keyed map against an authoritative snapshot.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

/// Outcome of reconciling one cache against a venue snapshot.
///
/// The four lists are disjoint and together cover every key that was either
/// cached before the call or present in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult<K> {
    /// Keys present in the snapshot but not in the cache.
    pub added: Vec<K>,
    /// Keys whose venue-mutable fields changed.
    pub updated: Vec<K>,
    /// Keys cached locally but absent from the snapshot.
    pub removed: Vec<K>,
    /// Keys present in both with identical mutable fields.
    pub unchanged: Vec<K>,
}

impl<K> Default for ReconciliationResult<K> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            unchanged: Vec::new(),
        }
    }
}

impl<K> ReconciliationResult<K> {
    /// Whether the cache was changed by the reconciliation.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || !self.removed.is_empty()
    }

    /// Number of keys touched in any way.
    #[must_use]
    pub fn total(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len() + self.unchanged.len()
    }
}

/// Replace the contents of `cache` with `snapshot`, classifying every key.
///
/// Duplicate keys in the snapshot collapse to their last entry and are
/// classified once, in order of first appearance. `removed` is sorted.
pub(super) fn reconcile_map<K, V>(
    cache: &mut HashMap<K, V>,
    snapshot: Vec<V>,
    key_of: impl Fn(&V) -> K,
    differs: impl Fn(&V, &V) -> bool,
) -> ReconciliationResult<K>
where
    K: Clone + Eq + Hash + Ord,
{
    let mut incoming: HashMap<K, V> = HashMap::with_capacity(snapshot.len());
    let mut arrival: Vec<K> = Vec::with_capacity(snapshot.len());
    for item in snapshot {
        let key = key_of(&item);
        if incoming.insert(key.clone(), item).is_none() {
            arrival.push(key);
        }
    }

    let mut result = ReconciliationResult::default();

    let mut removed: Vec<K> = cache
        .keys()
        .filter(|key| !incoming.contains_key(*key))
        .cloned()
        .collect();
    removed.sort();
    for key in &removed {
        cache.remove(key);
    }
    result.removed = removed;

    for key in arrival {
        let Some(item) = incoming.remove(&key) else {
            continue;
        };
        match cache.get(&key) {
            None => result.added.push(key.clone()),
            Some(existing) if differs(existing, &item) => result.updated.push(key.clone()),
            Some(_) => result.unchanged.push(key.clone()),
        }
        cache.insert(key, item);
    }

    result
}
