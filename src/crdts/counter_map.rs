// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{
    FromDelta, ReplicatedData, ReplicatedDataError, counter::ReplicatedCounter,
    fixed_map::FixedMap,
};
use crate::{delta::ReplicatedDataDelta, support::AnyValue};
use std::fmt;

/// A map of counters.
///
/// Counters are created on first use, so a missing key reads as zero and can be incremented
/// right away.
///
/// ```rust
/// # use replicated_data::{ReplicatedCounterMap, ReplicatedData};
/// let mut visits = ReplicatedCounterMap::new();
/// visits.increment(String::from("/home"), 2);
/// assert_eq!(visits.get(&String::from("/home")), 2);
/// assert_eq!(visits.get(&String::from("/about")), 0);
/// ```
#[derive(Clone)]
pub struct ReplicatedCounterMap<K> {
    inner: FixedMap<K, ReplicatedCounter>,
}

impl<K> Default for ReplicatedCounterMap<K> {
    fn default() -> Self {
        Self {
            inner: FixedMap::default(),
        }
    }
}

impl<K> ReplicatedCounterMap<K>
where
    K: AnyValue,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// The value of the counter for `key`, or zero if there is none.
    pub fn get(&self, key: &K) -> i64 {
        self.inner.get(key).map_or(0, ReplicatedCounter::value)
    }

    /// Increments the counter for `key`, returning its new value.
    pub fn increment(&mut self, key: K, by: i64) -> i64 {
        let counter = self.inner.get_or_insert_with(&key, ReplicatedCounter::default);
        counter.increment(by);
        counter.value()
    }

    /// Decrements the counter for `key`, returning its new value.
    pub fn decrement(&mut self, key: K, by: i64) -> i64 {
        let counter = self.inner.get_or_insert_with(&key, ReplicatedCounter::default);
        counter.decrement(by);
        counter.value()
    }

    pub fn has(&self, key: &K) -> bool {
        self.inner.has(key)
    }

    /// Removes the counter for `key`, returning whether there was one.
    pub fn delete(&mut self, key: &K) -> bool {
        self.inner.delete(key)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> {
        self.inner.keys()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&K, i64)> {
        self.inner.iter().map(|(k, c)| (k, c.value()))
    }
}

impl<K> fmt::Debug for ReplicatedCounterMap<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<K> ReplicatedData for ReplicatedCounterMap<K>
where
    K: AnyValue,
{
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta> {
        self.inner
            .harvest(initial)
            .map(ReplicatedDataDelta::ReplicatedCounterMap)
    }

    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::ReplicatedCounterMap(delta) => self.inner.merge(delta),
            other => Err(ReplicatedDataError::invalid_delta(
                "replicatedCounterMap",
                &other,
            )),
        }
    }
}

impl<K> FromDelta for ReplicatedCounterMap<K> {
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::ReplicatedCounterMap(_) => Ok(Self::default()),
            other => Err(ReplicatedDataError::invalid_delta(
                "replicatedCounterMap",
                other,
            )),
        }
    }
}
