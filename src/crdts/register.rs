// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{FromDelta, ReplicatedData, ReplicatedDataError};
use crate::{
    delta::ReplicatedDataDelta,
    support::{AnyValue, SerializedAny},
};
use std::fmt;

/// Selects how the proxy resolves concurrent writes to a [`ReplicatedRegister`].
///
/// The client only records which clock a write was made with; the resolution itself happens on
/// the proxy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Clock {
    /// The proxy's wall clock; the last write wins.
    #[default]
    Default,
    /// The reverse of the wall clock; the first write wins.
    Reverse,
    /// The caller-supplied `custom_clock_value` orders the writes.
    Custom,
    /// Like [`Clock::Custom`], but the proxy increments the value if it would not advance the
    /// clock.
    CustomAutoIncrement,
}

/// A **last-writer-wins register**.
///
/// The register always holds a value, which is why it can only be created with one. Every
/// write records the [`Clock`] the proxy should use to order it against concurrent writes.
///
/// ```rust
/// # use replicated_data::{Clock, ReplicatedData, ReplicatedRegister};
/// let mut reg = ReplicatedRegister::new(String::from("draft"));
/// reg.set_with_clock(String::from("final"), Clock::Reverse, 0);
/// assert_eq!(reg.value(), "final");
/// ```
#[derive(Clone, PartialEq)]
pub struct ReplicatedRegister<V> {
    value: V,
    pending: Option<PendingWrite>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingWrite {
    clock: Clock,
    custom_clock_value: i64,
}

/// The change of a [`ReplicatedRegister`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RegisterDelta {
    pub value: Option<SerializedAny>,
    pub clock: Clock,
    pub custom_clock_value: i64,
}

impl<V> ReplicatedRegister<V> {
    /// Creates a register holding `value`.
    ///
    /// The value is staged for shipping, so the first harvest always carries it.
    pub fn new(value: V) -> Self {
        Self::with_clock(value, Clock::Default, 0)
    }

    /// Creates a register holding `value`, written with the given clock.
    pub fn with_clock(value: V, clock: Clock, custom_clock_value: i64) -> Self {
        Self {
            value,
            pending: Some(PendingWrite {
                clock,
                custom_clock_value,
            }),
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Writes `value` with the [`Clock::Default`] clock.
    pub fn set(&mut self, value: V) {
        self.set_with_clock(value, Clock::Default, 0);
    }

    /// Writes `value`, to be ordered by the given clock.
    ///
    /// Any earlier write that has not been harvested yet is discarded.
    pub fn set_with_clock(&mut self, value: V, clock: Clock, custom_clock_value: i64) {
        self.value = value;
        self.pending = Some(PendingWrite {
            clock,
            custom_clock_value,
        });
    }

    /// The clock of the pending write, if there is one.
    ///
    /// Harvesting hands the write to the proxy, so this is `None` again afterwards.
    pub fn clock(&self) -> Option<Clock> {
        self.pending.map(|p| p.clock)
    }
}

impl<V> ReplicatedRegister<V>
where
    V: AnyValue,
{
    pub(crate) fn harvest(&mut self, initial: bool) -> Option<RegisterDelta> {
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None if initial => PendingWrite {
                clock: Clock::Default,
                custom_clock_value: 0,
            },
            None => return None,
        };
        Some(RegisterDelta {
            value: Some(self.value.serialize()),
            clock: pending.clock,
            custom_clock_value: pending.custom_clock_value,
        })
    }

    pub(crate) fn merge(&mut self, delta: RegisterDelta) -> Result<(), ReplicatedDataError> {
        // a register delta without a value carries no write we could observe
        if let Some(value) = delta.value {
            self.value = V::deserialize(&value)?;
        }
        self.pending = None;
        Ok(())
    }

    pub(crate) fn from_register_delta(delta: &RegisterDelta) -> Result<Self, ReplicatedDataError> {
        let value = delta.value.as_ref().ok_or_else(|| {
            ReplicatedDataError::InvalidArgument(
                "a register can only be created with a value".into(),
            )
        })?;
        Ok(Self::new(V::deserialize(value)?))
    }
}

impl<V> fmt::Debug for ReplicatedRegister<V>
where
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Register({:?})", self.value)
    }
}

impl<V> ReplicatedData for ReplicatedRegister<V>
where
    V: AnyValue,
{
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta> {
        self.harvest(initial).map(ReplicatedDataDelta::Register)
    }

    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::Register(delta) => self.merge(delta),
            other => Err(ReplicatedDataError::invalid_delta("register", &other)),
        }
    }
}

impl<V> FromDelta for ReplicatedRegister<V>
where
    V: AnyValue,
{
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::Register(delta) => Self::from_register_delta(delta),
            other => Err(ReplicatedDataError::invalid_delta("register", other)),
        }
    }
}
