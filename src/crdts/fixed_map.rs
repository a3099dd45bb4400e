// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Bookkeeping shared by the maps whose values are all of one replicated type.
//!
//! Unlike [`ReplicatedMap`](super::map::ReplicatedMap), these maps never ship a value in full:
//! a value is created empty on first use (locally, or when a peer's delta mentions its key), so
//! its own delta always describes everything the proxy needs to know about it.
use super::{
    ReplicatedDataError, counter::ReplicatedCounter, register::ReplicatedRegister,
    set::ReplicatedSet,
};
use crate::{
    KeyMap, create_map,
    delta::{EntryDelta, FixedMapDelta},
    support::AnyValue,
};
use std::fmt;

/// A replicated type that can live in a [`FixedMap`].
pub(crate) trait FixedValue: Sized {
    type Delta;

    /// Harvests the pending changes, if any.
    fn harvest(&mut self) -> Option<Self::Delta>;

    fn merge(&mut self, delta: Self::Delta) -> Result<(), ReplicatedDataError>;

    /// Creates the value for a key first seen in a peer's delta.
    fn create(delta: &Self::Delta) -> Result<Self, ReplicatedDataError>;
}

impl FixedValue for ReplicatedCounter {
    type Delta = super::counter::CounterDelta;

    fn harvest(&mut self) -> Option<Self::Delta> {
        ReplicatedCounter::harvest(self, false)
    }

    fn merge(&mut self, delta: Self::Delta) -> Result<(), ReplicatedDataError> {
        ReplicatedCounter::merge(self, delta);
        Ok(())
    }

    fn create(_: &Self::Delta) -> Result<Self, ReplicatedDataError> {
        Ok(Self::default())
    }
}

impl<V> FixedValue for ReplicatedRegister<V>
where
    V: AnyValue,
{
    type Delta = super::register::RegisterDelta;

    fn harvest(&mut self) -> Option<Self::Delta> {
        ReplicatedRegister::harvest(self, false)
    }

    fn merge(&mut self, delta: Self::Delta) -> Result<(), ReplicatedDataError> {
        ReplicatedRegister::merge(self, delta)
    }

    fn create(delta: &Self::Delta) -> Result<Self, ReplicatedDataError> {
        Self::from_register_delta(delta)
    }
}

impl<E> FixedValue for ReplicatedSet<E>
where
    E: AnyValue,
{
    type Delta = super::set::ReplicatedSetDelta;

    fn harvest(&mut self) -> Option<Self::Delta> {
        ReplicatedSet::harvest(self, false)
    }

    fn merge(&mut self, delta: Self::Delta) -> Result<(), ReplicatedDataError> {
        ReplicatedSet::merge(self, delta)
    }

    fn create(_: &Self::Delta) -> Result<Self, ReplicatedDataError> {
        Ok(Self::default())
    }
}

#[derive(Clone)]
pub(crate) struct FixedMap<K, V> {
    entries: KeyMap<(K, V)>,
    removed: KeyMap<K>,
    cleared: bool,
}

impl<K, V> Default for FixedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: create_map(),
            removed: create_map(),
            cleared: false,
        }
    }
}

impl<K, V> FixedMap<K, V>
where
    K: AnyValue,
    V: FixedValue,
{
    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(&key.to_comparable()).map(|(_, v)| v)
    }

    pub(crate) fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(&key.to_comparable()).map(|(_, v)| v)
    }

    /// Returns the value for `key`, creating it with `create` if it is missing.
    ///
    /// A removal of the key staged in the same window is kept: the proxy drops the old value
    /// before it sees the changes to the new one.
    pub(crate) fn get_or_insert_with(&mut self, key: &K, create: impl FnOnce() -> V) -> &mut V {
        let (_, value) = self
            .entries
            .entry(key.to_comparable())
            .or_insert_with(|| (key.clone(), create()));
        value
    }

    pub(crate) fn delete(&mut self, key: &K) -> bool {
        let ck = key.to_comparable();
        let Some((key, _)) = self.entries.remove(&ck) else {
            return false;
        };
        self.removed.insert(ck, key);
        true
    }

    pub(crate) fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.cleared = true;
        self.entries.clear();
        self.removed.clear();
    }

    pub(crate) fn has(&self, key: &K) -> bool {
        self.entries.contains_key(&key.to_comparable())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn keys(&self) -> impl ExactSizeIterator<Item = &K> {
        self.entries.values().map(|(k, _)| k)
    }

    pub(crate) fn iter(&self) -> impl ExactSizeIterator<Item = (&K, &V)> {
        self.entries.values().map(|(k, v)| (k, v))
    }

    pub(crate) fn harvest(&mut self, initial: bool) -> Option<FixedMapDelta<V::Delta>> {
        let updated: Vec<_> = self
            .entries
            .values_mut()
            .filter_map(|(key, value)| {
                value.harvest().map(|delta| EntryDelta {
                    key: key.serialize(),
                    delta,
                })
            })
            .collect();
        if !self.cleared && self.removed.is_empty() && updated.is_empty() && !initial {
            return None;
        }
        Some(FixedMapDelta {
            cleared: std::mem::take(&mut self.cleared),
            removed: self.removed.drain().map(|(_, key)| key.serialize()).collect(),
            updated,
        })
    }

    pub(crate) fn merge(
        &mut self,
        delta: FixedMapDelta<V::Delta>,
    ) -> Result<(), ReplicatedDataError> {
        let FixedMapDelta {
            cleared,
            removed,
            updated,
        } = delta;
        if cleared {
            self.entries.clear();
        }
        for any in &removed {
            let ck = K::deserialize(any)?.to_comparable();
            if self.entries.remove(&ck).is_none() {
                tracing::warn!(key = %ck, "delta removes a key that is not in the map");
            }
        }
        for EntryDelta { key, delta } in updated {
            let key = K::deserialize(&key)?;
            let ck = key.to_comparable();
            match self.entries.get_mut(&ck) {
                Some((_, value)) => value.merge(delta)?,
                None => {
                    let mut value = V::create(&delta)?;
                    value.merge(delta)?;
                    self.entries.insert(ck, (key, value));
                }
            }
        }
        Ok(())
    }
}

impl<K, V> fmt::Debug for FixedMap<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.values().map(|(k, v)| (k, v)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdts::{counter::CounterDelta, test_util::init_tracing};

    #[test]
    fn delete_then_recreate_keeps_the_removal() {
        let mut map = FixedMap::<String, ReplicatedCounter>::default();
        let key = String::from("k");
        map.get_or_insert_with(&key, Default::default).increment(1);
        let _ = map.harvest(false);

        assert!(map.delete(&key));
        map.get_or_insert_with(&key, Default::default).increment(4);
        let delta = map.harvest(false).unwrap();
        assert_eq!(delta.removed, vec![key.serialize()]);
        assert_eq!(
            delta.updated,
            vec![EntryDelta {
                key: key.serialize(),
                delta: CounterDelta { change: 4 },
            }]
        );

        // on a replica that knew the old value, only the new changes survive
        let mut replica = FixedMap::<String, ReplicatedCounter>::default();
        replica.get_or_insert_with(&key, Default::default).increment(1);
        replica.merge(delta).unwrap();
        assert_eq!(replica.get(&key).map(ReplicatedCounter::value), Some(4));
    }

    #[test]
    fn unknown_removals_are_tolerated() {
        init_tracing();
        let mut map = FixedMap::<String, ReplicatedCounter>::default();
        map.merge(FixedMapDelta {
            removed: vec![String::from("ghost").serialize()],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(map.len(), 0);
    }
}
