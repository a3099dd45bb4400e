// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Creation of replicated data from incoming deltas.
//!
//! A peer's delta may mention a map entry this replica has never seen. The map then needs a
//! fresh value of the right type to apply the delta to, and the only thing it knows about the
//! type is the delta's discriminant. [`create_for_delta`] makes that decision for maps whose
//! values are [`AnyReplicatedData`].
use super::{
    FromDelta, ReplicatedData, ReplicatedDataError, counter::ReplicatedCounter,
    counter_map::ReplicatedCounterMap, map::ReplicatedMap, multi_map::ReplicatedMultiMap,
    register::ReplicatedRegister, register_map::ReplicatedRegisterMap, set::ReplicatedSet,
    vote::Vote,
};
use crate::{delta::ReplicatedDataDelta, support::AnyValue};

/// A replicated data value of any type the factory can create.
///
/// Keys, elements and register values are all of type `T`; for maps with heterogeneous
/// contents `T` is typically [`SerializedAny`](crate::SerializedAny) or, with the `json`
/// feature, `serde_json::Value`.
#[derive(Debug, Clone)]
pub enum AnyReplicatedData<T> {
    Counter(ReplicatedCounter),
    Register(ReplicatedRegister<T>),
    ReplicatedSet(ReplicatedSet<T>),
    Vote(Vote),
    ReplicatedMap(ReplicatedMap<T, AnyReplicatedData<T>>),
    ReplicatedCounterMap(ReplicatedCounterMap<T>),
    ReplicatedRegisterMap(ReplicatedRegisterMap<T, T>),
    ReplicatedMultiMap(ReplicatedMultiMap<T, T>),
}

/// Creates an empty value of the type the delta belongs to.
///
/// The delta is not applied; pass it to [`ReplicatedData::apply_delta`] on the returned value.
///
/// # Errors
///
/// Fails with [`ReplicatedDataError::UnknownReplicatedDataType`] for deltas of types that are
/// never created on demand ([`Flag`](super::flag::Flag) and [`GSet`](super::gset::GSet)), and
/// with [`ReplicatedDataError::InvalidArgument`] for a register delta without a value.
pub fn create_for_delta<T>(
    delta: &ReplicatedDataDelta,
) -> Result<AnyReplicatedData<T>, ReplicatedDataError>
where
    T: AnyValue,
{
    Ok(match delta {
        ReplicatedDataDelta::Counter(_) => AnyReplicatedData::Counter(ReplicatedCounter::default()),
        ReplicatedDataDelta::ReplicatedSet(_) => {
            AnyReplicatedData::ReplicatedSet(ReplicatedSet::new())
        }
        ReplicatedDataDelta::Register(_) => {
            AnyReplicatedData::Register(ReplicatedRegister::create_for_delta(delta)?)
        }
        ReplicatedDataDelta::ReplicatedMap(_) => {
            AnyReplicatedData::ReplicatedMap(ReplicatedMap::new())
        }
        ReplicatedDataDelta::ReplicatedCounterMap(_) => {
            AnyReplicatedData::ReplicatedCounterMap(ReplicatedCounterMap::new())
        }
        ReplicatedDataDelta::ReplicatedRegisterMap(_) => {
            AnyReplicatedData::ReplicatedRegisterMap(ReplicatedRegisterMap::new())
        }
        ReplicatedDataDelta::ReplicatedMultiMap(_) => {
            AnyReplicatedData::ReplicatedMultiMap(ReplicatedMultiMap::new())
        }
        ReplicatedDataDelta::Vote(_) => AnyReplicatedData::Vote(Vote::new()),
        ReplicatedDataDelta::Flag(_) | ReplicatedDataDelta::GSet(_) => {
            return Err(ReplicatedDataError::UnknownReplicatedDataType(delta.kind()));
        }
    })
}

impl<T> AnyReplicatedData<T> {
    /// The protocol name of the contained type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Counter(_) => "counter",
            Self::Register(_) => "register",
            Self::ReplicatedSet(_) => "replicatedSet",
            Self::Vote(_) => "vote",
            Self::ReplicatedMap(_) => "replicatedMap",
            Self::ReplicatedCounterMap(_) => "replicatedCounterMap",
            Self::ReplicatedRegisterMap(_) => "replicatedRegisterMap",
            Self::ReplicatedMultiMap(_) => "replicatedMultiMap",
        }
    }
}

impl<T> ReplicatedData for AnyReplicatedData<T>
where
    T: AnyValue,
{
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta> {
        match self {
            Self::Counter(c) => c.get_and_reset_delta(initial),
            Self::Register(r) => r.get_and_reset_delta(initial),
            Self::ReplicatedSet(s) => s.get_and_reset_delta(initial),
            Self::Vote(v) => v.get_and_reset_delta(initial),
            Self::ReplicatedMap(m) => m.get_and_reset_delta(initial),
            Self::ReplicatedCounterMap(m) => m.get_and_reset_delta(initial),
            Self::ReplicatedRegisterMap(m) => m.get_and_reset_delta(initial),
            Self::ReplicatedMultiMap(m) => m.get_and_reset_delta(initial),
        }
    }

    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError> {
        match self {
            Self::Counter(c) => c.apply_delta(delta),
            Self::Register(r) => r.apply_delta(delta),
            Self::ReplicatedSet(s) => s.apply_delta(delta),
            Self::Vote(v) => v.apply_delta(delta),
            Self::ReplicatedMap(m) => m.apply_delta(delta),
            Self::ReplicatedCounterMap(m) => m.apply_delta(delta),
            Self::ReplicatedRegisterMap(m) => m.apply_delta(delta),
            Self::ReplicatedMultiMap(m) => m.apply_delta(delta),
        }
    }
}

impl<T> FromDelta for AnyReplicatedData<T>
where
    T: AnyValue,
{
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError> {
        create_for_delta(delta)
    }
}

impl<T> From<ReplicatedCounter> for AnyReplicatedData<T> {
    fn from(value: ReplicatedCounter) -> Self {
        Self::Counter(value)
    }
}

impl<T> From<ReplicatedRegister<T>> for AnyReplicatedData<T> {
    fn from(value: ReplicatedRegister<T>) -> Self {
        Self::Register(value)
    }
}

impl<T> From<ReplicatedSet<T>> for AnyReplicatedData<T> {
    fn from(value: ReplicatedSet<T>) -> Self {
        Self::ReplicatedSet(value)
    }
}

impl<T> From<Vote> for AnyReplicatedData<T> {
    fn from(value: Vote) -> Self {
        Self::Vote(value)
    }
}

impl<T> From<ReplicatedMap<T, AnyReplicatedData<T>>> for AnyReplicatedData<T> {
    fn from(value: ReplicatedMap<T, AnyReplicatedData<T>>) -> Self {
        Self::ReplicatedMap(value)
    }
}

impl<T> From<ReplicatedCounterMap<T>> for AnyReplicatedData<T> {
    fn from(value: ReplicatedCounterMap<T>) -> Self {
        Self::ReplicatedCounterMap(value)
    }
}

impl<T> From<ReplicatedRegisterMap<T, T>> for AnyReplicatedData<T> {
    fn from(value: ReplicatedRegisterMap<T, T>) -> Self {
        Self::ReplicatedRegisterMap(value)
    }
}

impl<T> From<ReplicatedMultiMap<T, T>> for AnyReplicatedData<T> {
    fn from(value: ReplicatedMultiMap<T, T>) -> Self {
        Self::ReplicatedMultiMap(value)
    }
}
