// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{FromDelta, ReplicatedData, ReplicatedDataError};
use crate::{
    KeyMap, KeySet, create_map, create_set,
    delta::ReplicatedDataDelta,
    support::{AnyValue, SerializedAny},
};
use std::fmt;

/// A set of elements that can be added, removed and cleared.
///
/// The pending delta is kept minimal: an element that is added and removed again before the
/// next harvest shows up in neither `added` nor `removed`, and removing the last element is
/// shipped as a clear.
///
/// ```rust
/// # use replicated_data::{ReplicatedData, ReplicatedSet, ReplicatedDataDelta};
/// let mut set = ReplicatedSet::new();
/// set.add(String::from("a"));
/// set.add(String::from("b"));
/// set.delete(&String::from("a"));
///
/// let Some(ReplicatedDataDelta::ReplicatedSet(delta)) = set.get_and_reset_delta(false) else {
///     unreachable!()
/// };
/// assert!(delta.removed.is_empty());
/// assert_eq!(delta.added.len(), 1);
/// ```
#[derive(Clone)]
pub struct ReplicatedSet<E> {
    value: KeyMap<E>,
    added: KeySet,
    // removed elements are no longer in `value`, so keep them around for serialization.
    removed: KeyMap<E>,
    cleared: bool,
}

/// The changes to a [`ReplicatedSet`].
///
/// `cleared` applies first, then `removed`, then `added`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct ReplicatedSetDelta {
    pub cleared: bool,
    pub removed: Vec<SerializedAny>,
    pub added: Vec<SerializedAny>,
}

impl<E> Default for ReplicatedSet<E> {
    fn default() -> Self {
        Self {
            value: create_map(),
            added: create_set(),
            removed: create_map(),
            cleared: false,
        }
    }
}

impl<E> ReplicatedSet<E>
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
        // re-adding an element removed in this window just undoes the removal
        if self.removed.remove(&key).is_none() {
            self.added.insert(key.clone());
        }
        self.value.insert(key, element);
        true
    }

    pub fn add_all(&mut self, elements: impl IntoIterator<Item = E>) {
        for element in elements {
            self.add(element);
        }
    }

    /// Removes an element, returning whether it was present.
    pub fn delete(&mut self, element: &E) -> bool {
        let key = element.to_comparable();
        if !self.value.contains_key(&key) {
            return false;
        }
        if self.value.len() == 1 {
            self.clear();
            return true;
        }
        if let Some(element) = self.value.remove(&key) {
            if !self.added.remove(&key) {
                self.removed.insert(key, element);
            }
        }
        true
    }

    pub fn delete_all<'a>(&mut self, elements: impl IntoIterator<Item = &'a E>)
    where
        E: 'a,
    {
        for element in elements {
            self.delete(element);
        }
    }

    /// Removes all elements.
    pub fn clear(&mut self) {
        if self.value.is_empty() {
            return;
        }
        self.cleared = true;
        self.value.clear();
        self.added.clear();
        self.removed.clear();
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

    pub(crate) fn harvest(&mut self, initial: bool) -> Option<ReplicatedSetDelta> {
        if !self.cleared && self.added.is_empty() && self.removed.is_empty() && !initial {
            return None;
        }
        let added = self
            .added
            .drain()
            .filter_map(|key| self.value.get(&key))
            .map(|element| element.serialize())
            .collect();
        let removed = self
            .removed
            .drain()
            .map(|(_, element)| element.serialize())
            .collect();
        Some(ReplicatedSetDelta {
            cleared: std::mem::take(&mut self.cleared),
            removed,
            added,
        })
    }

    pub(crate) fn merge(&mut self, delta: ReplicatedSetDelta) -> Result<(), ReplicatedDataError> {
        let ReplicatedSetDelta {
            cleared,
            removed,
            added,
        } = delta;
        if cleared {
            self.value.clear();
        }
        for any in &removed {
            let key = E::deserialize(any)?.to_comparable();
            if self.value.remove(&key).is_none() {
                tracing::warn!(%key, "delta removes an element that is not in the set");
            }
        }
        for any in &added {
            let element = E::deserialize(any)?;
            let key = element.to_comparable();
            if self.value.contains_key(&key) {
                tracing::warn!(%key, "delta adds an element that is already in the set");
            }
            self.value.insert(key, element);
        }
        Ok(())
    }
}

impl<E> fmt::Debug for ReplicatedSet<E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.value.values()).finish()
    }
}

impl<E> ReplicatedData for ReplicatedSet<E>
where
    E: AnyValue,
{
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta> {
        self.harvest(initial).map(ReplicatedDataDelta::ReplicatedSet)
    }

    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::ReplicatedSet(delta) => self.merge(delta),
            other => Err(ReplicatedDataError::invalid_delta("replicatedSet", &other)),
        }
    }
}

impl<E> FromDelta for ReplicatedSet<E> {
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::ReplicatedSet(_) => Ok(Self::default()),
            other => Err(ReplicatedDataError::invalid_delta("replicatedSet", other)),
        }
    }
}
