// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{FromDelta, ReplicatedData, ReplicatedDataError};
use crate::{
    KeyMap, KeySet, create_map, create_set,
    delta::{EntryDelta, ReplicatedDataDelta},
    support::{AnyValue, ComparableKey, SerializedAny},
};
use std::{fmt, sync::Arc};

type DefaultValue<K, V> = Arc<dyn Fn(&K) -> Option<V> + Send + Sync>;

/// A map from keys to other replicated data types.
///
/// `ReplicatedMap` is the composition primitive of this crate: its values can be any type that
/// implements [`ReplicatedData`], including other maps. Changes to a value already known to the
/// proxy are shipped as that value's own delta (an `updated` entry); values new to the proxy are
/// shipped in full (an `added` entry).
///
/// When a peer's delta adds a key this map has not seen, the value is created with
/// [`FromDelta::create_for_delta`]. Use [`AnyReplicatedData`](super::AnyReplicatedData) as the
/// value type if the map holds values of different types.
///
/// ```rust
/// # use replicated_data::{ReplicatedCounter, ReplicatedData, ReplicatedMap};
/// let mut map = ReplicatedMap::<String, ReplicatedCounter>::new()
///     .with_default_value(|_key| Some(ReplicatedCounter::default()));
///
/// // reading through `get_mut` creates missing values
/// map.get_mut(&"visits".to_string()).unwrap().increment(1);
///
/// let delta = map.get_and_reset_delta(false).unwrap();
/// let mut replica = ReplicatedMap::<String, ReplicatedCounter>::new();
/// replica.apply_delta(delta).unwrap();
/// assert_eq!(replica.get(&"visits".to_string()).unwrap().value(), 1);
/// ```
#[derive(Clone)]
pub struct ReplicatedMap<K, V> {
    entries: KeyMap<(K, V)>,
    added: KeySet,
    removed: KeyMap<K>,
    cleared: bool,
    default_value: Option<DefaultValue<K, V>>,
}

/// The changes to a [`ReplicatedMap`].
///
/// `cleared` applies first, then `removed`, `added` and `updated`, in that order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ReplicatedMapDelta {
    pub cleared: bool,
    pub removed: Vec<SerializedAny>,
    /// Entries new to the proxy, carrying the full state of their value.
    pub added: Vec<EntryDelta<ReplicatedDataDelta>>,
    /// Entries already known to the proxy, carrying the delta of their value.
    pub updated: Vec<EntryDelta<ReplicatedDataDelta>>,
}

impl<K, V> Default for ReplicatedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: create_map(),
            added: create_set(),
            removed: create_map(),
            cleared: false,
            default_value: None,
        }
    }
}

impl<K, V> ReplicatedMap<K, V>
where
    K: AnyValue,
    V: ReplicatedData,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the function that provides values for missing keys in [`Self::get_mut`].
    ///
    /// Note that this makes reads through `get_mut` mutating: a provided value is inserted into
    /// the map, and shipped with the next delta, as if it had been [`set`](Self::set).
    pub fn with_default_value(
        mut self,
        default_value: impl Fn(&K) -> Option<V> + Send + Sync + 'static,
    ) -> Self {
        self.default_value = Some(Arc::new(default_value));
        self
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(&key.to_comparable()).map(|(_, v)| v)
    }

    /// Returns the value for `key` for modification.
    ///
    /// If the key is missing and a default value function is set, its value is inserted first.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let ck = key.to_comparable();
        if !self.entries.contains_key(&ck) {
            let value = self.default_value.as_ref().and_then(|f| f(key))?;
            self.insert(ck.clone(), key.clone(), value);
        }
        self.entries.get_mut(&ck).map(|(_, v)| v)
    }

    /// Inserts a value, replacing the value of an existing key.
    ///
    /// Replacing a value the proxy already knows is shipped as a removal of the key followed by
    /// an addition, so the new value replaces the old one in full.
    pub fn set(&mut self, key: K, value: V) {
        let ck = key.to_comparable();
        self.insert(ck, key, value);
    }

    fn insert(&mut self, ck: ComparableKey, key: K, value: V) {
        if !self.entries.contains_key(&ck) {
            if self.removed.remove(&ck).is_some() {
                tracing::debug!(
                    key = %ck,
                    "key was removed and added again before the delta was harvested, \
                     the proxy will merge the new value into the old one"
                );
            }
            self.added.insert(ck.clone());
        } else if !self.added.contains(&ck) {
            tracing::debug!(
                key = %ck,
                "replacing the value of an existing key, shipping it as removed and added"
            );
            self.removed.insert(ck.clone(), key.clone());
            self.added.insert(ck.clone());
        }
        self.entries.insert(ck, (key, value));
    }

    /// Removes a key, returning whether it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        let ck = key.to_comparable();
        let Some((key, _)) = self.entries.remove(&ck) else {
            return false;
        };
        if !self.added.remove(&ck) {
            self.removed.insert(ck, key);
        }
        true
    }

    /// Removes all keys.
    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.cleared = true;
        self.entries.clear();
        self.added.clear();
        self.removed.clear();
    }

    pub fn has(&self, key: &K) -> bool {
        self.entries.contains_key(&key.to_comparable())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the keys in an arbitrary order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> {
        self.entries.values().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.entries.values().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&K, &V)> {
        self.entries.values().map(|(k, v)| (k, v))
    }

    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (&K, &mut V)> {
        self.entries.values_mut().map(|(k, v)| (&*k, v))
    }
}

impl<K, V> fmt::Debug for ReplicatedMap<K, V>
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

impl<K, V> ReplicatedData for ReplicatedMap<K, V>
where
    K: AnyValue,
    V: ReplicatedData + FromDelta,
{
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta> {
        let mut added = Vec::new();
        let mut updated = Vec::new();
        for (ck, (key, value)) in self.entries.iter_mut() {
            if self.added.contains(ck) {
                // new to the proxy, so ship the value in full
                if let Some(delta) = value.get_and_reset_delta(true) {
                    added.push(EntryDelta {
                        key: key.serialize(),
                        delta,
                    });
                }
            } else if let Some(delta) = value.get_and_reset_delta(false) {
                updated.push(EntryDelta {
                    key: key.serialize(),
                    delta,
                });
            }
        }
        self.added.clear();

        if !self.cleared
            && self.removed.is_empty()
            && added.is_empty()
            && updated.is_empty()
            && !initial
        {
            return None;
        }
        let removed = self.removed.drain().map(|(_, key)| key.serialize()).collect();
        Some(ReplicatedDataDelta::ReplicatedMap(ReplicatedMapDelta {
            cleared: std::mem::take(&mut self.cleared),
            removed,
            added,
            updated,
        }))
    }

    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError> {
        let ReplicatedMapDelta {
            cleared,
            removed,
            added,
            updated,
        } = match delta {
            ReplicatedDataDelta::ReplicatedMap(delta) => delta,
            other => return Err(ReplicatedDataError::invalid_delta("replicatedMap", &other)),
        };

        if cleared {
            self.entries.clear();
        }
        for any in &removed {
            let ck = K::deserialize(any)?.to_comparable();
            if self.entries.remove(&ck).is_none() {
                tracing::warn!(key = %ck, "delta removes a key that is not in the map");
            }
        }
        for EntryDelta { key, delta } in added {
            let key = K::deserialize(&key)?;
            let ck = key.to_comparable();
            if let Some((_, existing)) = self.entries.get_mut(&ck) {
                tracing::warn!(
                    key = %ck,
                    "delta adds a key that is already in the map, merging into the existing value"
                );
                existing.apply_delta(delta)?;
            } else {
                let mut value = V::create_for_delta(&delta)?;
                value.apply_delta(delta)?;
                self.entries.insert(ck, (key, value));
            }
        }
        for EntryDelta { key, delta } in updated {
            let ck = K::deserialize(&key)?.to_comparable();
            match self.entries.get_mut(&ck) {
                Some((_, existing)) => existing.apply_delta(delta)?,
                None => {
                    tracing::warn!(key = %ck, "delta updates a key that is not in the map");
                }
            }
        }
        Ok(())
    }
}

impl<K, V> FromDelta for ReplicatedMap<K, V> {
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::ReplicatedMap(_) => Ok(Self::default()),
            other => Err(ReplicatedDataError::invalid_delta("replicatedMap", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crdts::{
            counter::{CounterDelta, ReplicatedCounter},
            register::ReplicatedRegister,
            set::ReplicatedSet,
            test_util::{init_tracing, sorted},
        },
        AnyReplicatedData,
    };

    fn s(v: &str) -> String {
        v.to_string()
    }

    fn harvest<V>(map: &mut ReplicatedMap<String, V>) -> ReplicatedMapDelta
    where
        V: ReplicatedData + FromDelta,
    {
        match map.get_and_reset_delta(false) {
            Some(ReplicatedDataDelta::ReplicatedMap(delta)) => delta,
            other => panic!("expected a map delta, got {other:?}"),
        }
    }

    fn counter(n: i64) -> ReplicatedCounter {
        let mut c = ReplicatedCounter::default();
        c.increment(n);
        c
    }

    #[test]
    fn new_keys_ship_their_full_value() {
        let mut map = ReplicatedMap::new();
        map.set(s("a"), counter(3));
        let delta = harvest(&mut map);
        assert_eq!(
            delta.added,
            vec![EntryDelta {
                key: s("a").serialize(),
                delta: ReplicatedDataDelta::Counter(CounterDelta { change: 3 }),
            }]
        );
        assert!(delta.updated.is_empty());
        assert_eq!(map.get_and_reset_delta(false), None);
    }

    #[test]
    fn changes_to_known_values_are_updates() {
        let mut map = ReplicatedMap::new();
        map.set(s("a"), counter(3));
        let _ = harvest(&mut map);
        map.get_mut(&s("a")).unwrap().increment(2);
        let delta = harvest(&mut map);
        assert!(delta.added.is_empty());
        assert_eq!(
            delta.updated,
            vec![EntryDelta {
                key: s("a").serialize(),
                delta: ReplicatedDataDelta::Counter(CounterDelta { change: 2 }),
            }]
        );
    }

    #[test]
    fn replacing_a_known_value_removes_and_adds() {
        init_tracing();
        let mut map = ReplicatedMap::new();
        map.set(s("a"), counter(3));
        let _ = harvest(&mut map);
        map.set(s("a"), counter(10));
        let delta = harvest(&mut map);
        assert_eq!(delta.removed, vec![s("a").serialize()]);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(map.get(&s("a")).unwrap().value(), 10);
    }

    #[test]
    fn replacing_a_new_value_stays_an_addition() {
        let mut map = ReplicatedMap::new();
        map.set(s("a"), counter(3));
        map.set(s("a"), counter(4));
        let delta = harvest(&mut map);
        assert!(delta.removed.is_empty());
        assert_eq!(
            delta.added[0].delta,
            ReplicatedDataDelta::Counter(CounterDelta { change: 4 })
        );
    }

    #[test]
    fn add_then_delete_cancels_out() {
        let mut map = ReplicatedMap::<String, ReplicatedCounter>::new();
        map.set(s("a"), counter(1));
        assert!(map.delete(&s("a")));
        assert!(!map.delete(&s("a")));
        assert_eq!(map.get_and_reset_delta(false), None);
    }

    #[test]
    fn deleting_a_known_key_is_a_removal() {
        let mut map = ReplicatedMap::<String, ReplicatedCounter>::new();
        map.set(s("a"), counter(1));
        map.set(s("b"), counter(1));
        let _ = harvest(&mut map);
        map.delete(&s("a"));
        let delta = harvest(&mut map);
        assert_eq!(delta.removed, vec![s("a").serialize()]);
        assert!(!map.has(&s("a")));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn delete_then_set_drops_the_removal() {
        init_tracing();
        let mut map = ReplicatedMap::<String, ReplicatedCounter>::new();
        map.set(s("a"), counter(1));
        let _ = harvest(&mut map);
        map.delete(&s("a"));
        map.set(s("a"), counter(5));
        let delta = harvest(&mut map);
        assert!(delta.removed.is_empty());
        assert_eq!(delta.added.len(), 1);
    }

    #[test]
    fn clear_wipes_pending_changes() {
        let mut map = ReplicatedMap::<String, ReplicatedCounter>::new();
        map.set(s("a"), counter(1));
        let _ = harvest(&mut map);
        map.delete(&s("a"));
        map.set(s("b"), counter(1));
        map.clear();
        assert!(map.is_empty());
        assert_eq!(
            harvest(&mut map),
            ReplicatedMapDelta {
                cleared: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn initial_forces_a_delta() {
        let mut map = ReplicatedMap::<String, ReplicatedCounter>::new();
        assert_eq!(
            map.get_and_reset_delta(true),
            Some(ReplicatedDataDelta::ReplicatedMap(ReplicatedMapDelta::default()))
        );
    }

    #[test]
    fn default_value_is_inserted_on_read() {
        let mut map = ReplicatedMap::<String, ReplicatedSet<String>>::new()
            .with_default_value(|key| (key != "nope").then(ReplicatedSet::new));
        assert!(map.get(&s("tags")).is_none());
        map.get_mut(&s("tags")).unwrap().add(s("rust"));
        assert!(map.get_mut(&s("nope")).is_none());
        assert_eq!(map.len(), 1);
        let delta = harvest(&mut map);
        assert_eq!(delta.added.len(), 1);
    }

    #[test]
    fn delta_recreates_map_on_fresh_replica() {
        let mut source = ReplicatedMap::<String, AnyReplicatedData<String>>::new();
        source.set(s("count"), AnyReplicatedData::Counter(counter(7)));
        source.set(
            s("name"),
            AnyReplicatedData::Register(ReplicatedRegister::new(s("alice"))),
        );
        let mut tags = ReplicatedSet::new();
        tags.add_all([s("x"), s("y")]);
        source.set(s("tags"), AnyReplicatedData::ReplicatedSet(tags));

        let delta = source.get_and_reset_delta(false).unwrap();
        let mut replica =
            ReplicatedMap::<String, AnyReplicatedData<String>>::create_for_delta(&delta).unwrap();
        replica.apply_delta(delta).unwrap();

        assert_eq!(sorted(replica.keys().cloned()), vec![s("count"), s("name"), s("tags")]);
        let Some(AnyReplicatedData::Counter(c)) = replica.get(&s("count")) else {
            panic!("count is not a counter");
        };
        assert_eq!(c.value(), 7);
        let Some(AnyReplicatedData::Register(r)) = replica.get(&s("name")) else {
            panic!("name is not a register");
        };
        assert_eq!(r.value(), "alice");
        let Some(AnyReplicatedData::ReplicatedSet(t)) = replica.get(&s("tags")) else {
            panic!("tags is not a set");
        };
        assert_eq!(sorted(t.iter().cloned()), vec![s("x"), s("y")]);
        // nothing applied remotely is shipped back
        assert_eq!(replica.get_and_reset_delta(false), None);
    }

    #[test]
    fn nested_maps_ship_nested_deltas() {
        let mut outer = ReplicatedMap::<String, ReplicatedMap<String, ReplicatedCounter>>::new();
        let mut replica = outer.clone();
        let mut inner = ReplicatedMap::new();
        inner.set(s("hits"), counter(1));
        outer.set(s("page"), inner);
        replica
            .apply_delta(outer.get_and_reset_delta(false).unwrap())
            .unwrap();

        outer
            .get_mut(&s("page"))
            .unwrap()
            .get_mut(&s("hits"))
            .unwrap()
            .increment(4);
        let delta = outer.get_and_reset_delta(false).unwrap();
        let ReplicatedDataDelta::ReplicatedMap(ref outer_delta) = delta else {
            unreachable!()
        };
        assert_eq!(outer_delta.updated.len(), 1);
        replica.apply_delta(delta).unwrap();

        let hits = replica
            .get(&s("page"))
            .and_then(|inner| inner.get(&s("hits")))
            .unwrap();
        assert_eq!(hits.value(), 5);
    }

    #[test]
    fn stale_remote_changes_are_tolerated() {
        init_tracing();
        let mut map = ReplicatedMap::<String, ReplicatedCounter>::new();
        map.set(s("a"), counter(1));
        map.apply_delta(ReplicatedDataDelta::ReplicatedMap(ReplicatedMapDelta {
            cleared: false,
            removed: vec![s("ghost").serialize()],
            added: vec![EntryDelta {
                key: s("a").serialize(),
                delta: ReplicatedDataDelta::Counter(CounterDelta { change: 2 }),
            }],
            updated: vec![EntryDelta {
                key: s("other-ghost").serialize(),
                delta: ReplicatedDataDelta::Counter(CounterDelta { change: 2 }),
            }],
        }))
        .unwrap();
        // the addition of an existing key merges into it
        assert_eq!(map.get(&s("a")).unwrap().value(), 3);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remote_value_of_wrong_type_fails() {
        let mut map = ReplicatedMap::<String, ReplicatedCounter>::new();
        let res = map.apply_delta(ReplicatedDataDelta::ReplicatedMap(ReplicatedMapDelta {
            added: vec![EntryDelta {
                key: s("a").serialize(),
                delta: ReplicatedDataDelta::Flag(Default::default()),
            }],
            ..Default::default()
        }));
        assert_eq!(
            res,
            Err(ReplicatedDataError::InvalidDelta {
                expected: "counter",
                found: "flag"
            })
        );
    }
}
