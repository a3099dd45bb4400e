// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{
    FromDelta, ReplicatedData, ReplicatedDataError, fixed_map::FixedMap, set::ReplicatedSet,
};
use crate::{delta::ReplicatedDataDelta, support::AnyValue};
use std::fmt;

/// A map from keys to sets of values.
///
/// A key is present as long as it has at least one value: the set for a key is created by the
/// first value put under it, and removing its last value removes the key.
///
/// ```rust
/// # use replicated_data::{ReplicatedMultiMap, ReplicatedData};
/// let mut tags = ReplicatedMultiMap::new();
/// tags.put(String::from("post-1"), String::from("rust"));
/// tags.put(String::from("post-1"), String::from("crdt"));
/// tags.delete(&String::from("post-1"), &String::from("rust"));
/// assert!(tags.has_value(&String::from("post-1"), &String::from("crdt")));
/// assert_eq!(tags.len(), 1);
///
/// tags.delete(&String::from("post-1"), &String::from("crdt"));
/// assert!(!tags.has(&String::from("post-1")));
/// ```
#[derive(Clone)]
pub struct ReplicatedMultiMap<K, V> {
    inner: FixedMap<K, ReplicatedSet<V>>,
}

impl<K, V> Default for ReplicatedMultiMap<K, V> {
    fn default() -> Self {
        Self {
            inner: FixedMap::default(),
        }
    }
}

impl<K, V> ReplicatedMultiMap<K, V>
where
    K: AnyValue,
    V: AnyValue,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// The values for `key`.
    pub fn get(&self, key: &K) -> Option<&ReplicatedSet<V>> {
        self.inner.get(key)
    }

    /// Adds `value` under `key`, returning whether it was newly added.
    pub fn put(&mut self, key: K, value: V) -> bool {
        self.inner
            .get_or_insert_with(&key, ReplicatedSet::new)
            .add(value)
    }

    pub fn put_all(&mut self, key: K, values: impl IntoIterator<Item = V>) {
        let mut values = values.into_iter().peekable();
        // a key only exists with at least one value
        if values.peek().is_none() {
            return;
        }
        self.inner
            .get_or_insert_with(&key, ReplicatedSet::new)
            .add_all(values);
    }

    /// Removes a single value from `key`, returning whether it was there.
    ///
    /// Removing the last value of a key removes the key.
    pub fn delete(&mut self, key: &K, value: &V) -> bool {
        let Some(values) = self.inner.get_mut(key) else {
            return false;
        };
        let deleted = values.delete(value);
        if values.is_empty() {
            self.delete_all(key);
        }
        deleted
    }

    /// Removes `key` with all its values, returning whether it was present.
    pub fn delete_all(&mut self, key: &K) -> bool {
        self.inner.delete(key)
    }

    pub fn has(&self, key: &K) -> bool {
        self.inner.has(key)
    }

    pub fn has_value(&self, key: &K, value: &V) -> bool {
        self.inner.get(key).is_some_and(|values| values.has(value))
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// The total number of values, across all keys.
    pub fn len(&self) -> usize {
        self.inner.iter().map(|(_, values)| values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// The number of keys.
    pub fn keys_len(&self) -> usize {
        self.inner.len()
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> {
        self.inner.keys()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&K, &ReplicatedSet<V>)> {
        self.inner.iter()
    }
}

impl<K, V> fmt::Debug for ReplicatedMultiMap<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<K, V> ReplicatedData for ReplicatedMultiMap<K, V>
where
    K: AnyValue,
    V: AnyValue,
{
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta> {
        self.inner
            .harvest(initial)
            .map(ReplicatedDataDelta::ReplicatedMultiMap)
    }

    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::ReplicatedMultiMap(delta) => self.inner.merge(delta),
            other => Err(ReplicatedDataError::invalid_delta(
                "replicatedMultiMap",
                &other,
            )),
        }
    }
}

impl<K, V> FromDelta for ReplicatedMultiMap<K, V> {
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::ReplicatedMultiMap(_) => Ok(Self::default()),
            other => Err(ReplicatedDataError::invalid_delta(
                "replicatedMultiMap",
                other,
            )),
        }
    }
}
