// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{FromDelta, ReplicatedData, ReplicatedDataError};
use crate::delta::ReplicatedDataDelta;
use std::fmt;

/// An integer counter that can be incremented and decremented.
///
/// Increments and decrements commute, so every replica ends up at the same value regardless of
/// the order in which it receives the changes of its peers.
///
/// ```rust
/// # use replicated_data::{ReplicatedCounter, ReplicatedData};
/// let mut counter = ReplicatedCounter::default();
/// counter.increment(10);
/// counter.decrement(3);
/// assert_eq!(counter.value(), 7);
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ReplicatedCounter {
    value: i64,
    delta: i64,
}

/// The change of a [`ReplicatedCounter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct CounterDelta {
    pub change: i64,
}

impl ReplicatedCounter {
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Adds `by` to the counter. Negative values decrement.
    ///
    /// The counter wraps around at the bounds of `i64`, as the proxy's counter does.
    pub fn increment(&mut self, by: i64) {
        self.value = self.value.wrapping_add(by);
        self.delta = self.delta.wrapping_add(by);
    }

    /// Subtracts `by` from the counter. Negative values increment.
    pub fn decrement(&mut self, by: i64) {
        self.value = self.value.wrapping_sub(by);
        self.delta = self.delta.wrapping_sub(by);
    }

    pub(crate) fn harvest(&mut self, initial: bool) -> Option<CounterDelta> {
        if self.delta == 0 && !initial {
            return None;
        }
        Some(CounterDelta {
            change: std::mem::take(&mut self.delta),
        })
    }

    pub(crate) fn merge(&mut self, delta: CounterDelta) {
        self.value = self.value.wrapping_add(delta.change);
    }
}

impl fmt::Debug for ReplicatedCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Counter({})", self.value)
    }
}

impl fmt::Display for ReplicatedCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl ReplicatedData for ReplicatedCounter {
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta> {
        self.harvest(initial).map(ReplicatedDataDelta::Counter)
    }

    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::Counter(delta) => {
                self.merge(delta);
                Ok(())
            }
            other => Err(ReplicatedDataError::invalid_delta("counter", &other)),
        }
    }
}

impl FromDelta for ReplicatedCounter {
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::Counter(_) => Ok(Self::default()),
            other => Err(ReplicatedDataError::invalid_delta("counter", other)),
        }
    }
}
