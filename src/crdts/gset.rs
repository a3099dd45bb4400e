// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{FromDelta, ReplicatedData, ReplicatedDataError};
use crate::{
    KeyMap, KeySet, create_map, create_set,
    delta::ReplicatedDataDelta,
    support::{AnyValue, SerializedAny},
};
use std::fmt;

/// A **grow-only set**.
///
/// Elements can be added but never removed; there is no method that could shrink the set.
#[derive(Clone)]
pub struct GSet<E> {
    value: KeyMap<E>,
    added: KeySet,
}

/// The elements added to a [`GSet`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct GSetDelta {
    pub added: Vec<SerializedAny>,
}

impl<E> Default for GSet<E> {
    fn default() -> Self {
        Self {
            value: create_map(),
            added: create_set(),
        }
    }
}

impl<E> GSet<E>
where
    E: AnyValue,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element, returning whether it was newly added.
    pub fn add(&mut self, element: E) -> bool {
        let key = element.to_comparable();
        if self.value.contains_key(&key) {
            return false;
        }
        self.added.insert(key.clone());
        self.value.insert(key, element);
        true
    }

    pub fn add_all(&mut self, elements: impl IntoIterator<Item = E>) {
        for element in elements {
            self.add(element);
        }
    }

    pub fn has(&self, element: &E) -> bool {
        self.value.contains_key(&element.to_comparable())
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Iterates over the elements in an arbitrary order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &E> {
        self.value.values()
    }
}

impl<E> fmt::Debug for GSet<E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.value.values()).finish()
    }
}

impl<E> ReplicatedData for GSet<E>
where
    E: AnyValue,
{
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta> {
        if self.added.is_empty() && !initial {
            return None;
        }
        let added = self
            .added
            .drain()
            .filter_map(|key| self.value.get(&key))
            .map(|element| element.serialize())
            .collect();
        Some(ReplicatedDataDelta::GSet(GSetDelta { added }))
    }

    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::GSet(GSetDelta { added }) => {
                for any in &added {
                    let element = E::deserialize(any)?;
                    self.value.insert(element.to_comparable(), element);
                }
                Ok(())
            }
            other => Err(ReplicatedDataError::invalid_delta("gset", &other)),
        }
    }
}

impl<E> FromDelta for GSet<E> {
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::GSet(_) => Ok(Self::default()),
            other => Err(ReplicatedDataError::invalid_delta("gset", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn elements(set: &GSet<String>) -> BTreeSet<String> {
        set.iter().cloned().collect()
    }

    #[test]
    fn duplicates_are_staged_once() {
        let mut set = GSet::new();
        assert!(set.add(String::from("a")));
        assert!(!set.add(String::from("a")));
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get_and_reset_delta(false),
            Some(ReplicatedDataDelta::GSet(GSetDelta {
                added: vec![String::from("a").serialize()]
            }))
        );
        assert!(!set.add(String::from("a")));
        assert_eq!(set.get_and_reset_delta(false), None);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let mut source = GSet::new();
        source.add_all([String::from("x"), String::from("y")]);
        let delta = source.get_and_reset_delta(false).unwrap();

        let mut replica = GSet::<String>::create_for_delta(&delta).unwrap();
        replica.apply_delta(delta.clone()).unwrap();
        replica.apply_delta(delta).unwrap();
        assert_eq!(elements(&replica), elements(&source));
        assert_eq!(replica.get_and_reset_delta(false), None);
    }

    #[quickcheck]
    fn never_shrinks(ops: Vec<(bool, u8)>) -> bool {
        let mut set = GSet::<u32>::new();
        let mut peer = GSet::<u32>::new();
        let mut last = 0;
        for (remote, e) in ops {
            if remote {
                peer.add(u32::from(e));
                if let Some(delta) = peer.get_and_reset_delta(false) {
                    set.apply_delta(delta).unwrap();
                }
            } else {
                set.add(u32::from(e));
            }
            if set.len() < last {
                return false;
            }
            last = set.len();
        }
        true
    }

    #[quickcheck]
    fn replicas_converge(a: Vec<u8>, b: Vec<u8>) -> bool {
        let mut left = GSet::<u32>::new();
        let mut right = GSet::<u32>::new();
        left.add_all(a.into_iter().map(u32::from));
        right.add_all(b.into_iter().map(u32::from));
        let from_left = left.get_and_reset_delta(true).unwrap();
        let from_right = right.get_and_reset_delta(true).unwrap();
        left.apply_delta(from_right).unwrap();
        right.apply_delta(from_left).unwrap();
        let l: BTreeSet<u32> = left.iter().copied().collect();
        let r: BTreeSet<u32> = right.iter().copied().collect();
        l == r
    }
}
