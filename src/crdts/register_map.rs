// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{
    FromDelta, ReplicatedData, ReplicatedDataError,
    fixed_map::FixedMap,
    register::{Clock, ReplicatedRegister},
};
use crate::{delta::ReplicatedDataDelta, support::AnyValue};
use std::fmt;

/// A map of last-writer-wins registers.
///
/// Every key holds a register, which is created by the first write to it. Writes to different
/// keys are independent; concurrent writes to the same key are resolved by the proxy using the
/// [`Clock`] of each write.
#[derive(Clone)]
pub struct ReplicatedRegisterMap<K, V> {
    inner: FixedMap<K, ReplicatedRegister<V>>,
}

impl<K, V> Default for ReplicatedRegisterMap<K, V> {
    fn default() -> Self {
        Self {
            inner: FixedMap::default(),
        }
    }
}

impl<K, V> ReplicatedRegisterMap<K, V>
where
    K: AnyValue,
    V: AnyValue,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key).map(ReplicatedRegister::value)
    }

    /// Writes `value` for `key` with the [`Clock::Default`] clock.
    pub fn set(&mut self, key: K, value: V) {
        self.set_with_clock(key, value, Clock::Default, 0);
    }

    /// Writes `value` for `key`, to be ordered by the given clock.
    pub fn set_with_clock(&mut self, key: K, value: V, clock: Clock, custom_clock_value: i64) {
        match self.inner.get_mut(&key) {
            Some(register) => register.set_with_clock(value, clock, custom_clock_value),
            None => {
                self.inner.get_or_insert_with(&key, || {
                    ReplicatedRegister::with_clock(value, clock, custom_clock_value)
                });
            }
        }
    }

    pub fn has(&self, key: &K) -> bool {
        self.inner.has(key)
    }

    /// Removes the register for `key`, returning whether there was one.
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

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&K, &V)> {
        self.inner.iter().map(|(k, r)| (k, r.value()))
    }
}

impl<K, V> fmt::Debug for ReplicatedRegisterMap<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<K, V> ReplicatedData for ReplicatedRegisterMap<K, V>
where
    K: AnyValue,
    V: AnyValue,
{
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta> {
        self.inner
            .harvest(initial)
            .map(ReplicatedDataDelta::ReplicatedRegisterMap)
    }

    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::ReplicatedRegisterMap(delta) => self.inner.merge(delta),
            other => Err(ReplicatedDataError::invalid_delta(
                "replicatedRegisterMap",
                &other,
            )),
        }
    }
}

impl<K, V> FromDelta for ReplicatedRegisterMap<K, V> {
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::ReplicatedRegisterMap(_) => Ok(Self::default()),
            other => Err(ReplicatedDataError::invalid_delta(
                "replicatedRegisterMap",
                other,
            )),
        }
    }
}
