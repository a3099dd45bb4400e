// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The wire form of changes to replicated data.
//!
//! A [`ReplicatedDataDelta`] is a tagged union with one variant per replicated data type. With
//! the `serde` feature it is externally tagged using the names of the proxy protocol, so a
//! counter delta encodes as `{"counter":{"change":3}}`.
//!
//! The payload types live next to the type that produces them (for example
//! [`CounterDelta`](crate::crdts::counter::CounterDelta)); this module only holds the union
//! and the entry shapes shared by the map-like types.
use crate::{
    crdts::{
        counter::CounterDelta, flag::FlagDelta, gset::GSetDelta, map::ReplicatedMapDelta,
        register::RegisterDelta, set::ReplicatedSetDelta, vote::VoteDelta,
    },
    support::SerializedAny,
};

/// Changes to a replicated data type, not full state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[must_use = "deltas should be shipped to the proxy or applied to replicated data"]
pub enum ReplicatedDataDelta {
    Counter(CounterDelta),
    Register(RegisterDelta),
    Flag(FlagDelta),
    #[cfg_attr(feature = "serde", serde(rename = "gset"))]
    GSet(GSetDelta),
    ReplicatedSet(ReplicatedSetDelta),
    Vote(VoteDelta),
    ReplicatedMap(ReplicatedMapDelta),
    ReplicatedCounterMap(ReplicatedCounterMapDelta),
    ReplicatedRegisterMap(ReplicatedRegisterMapDelta),
    ReplicatedMultiMap(ReplicatedMultiMapDelta),
}

impl ReplicatedDataDelta {
    /// The protocol name of the variant held by this delta.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Counter(_) => "counter",
            Self::Register(_) => "register",
            Self::Flag(_) => "flag",
            Self::GSet(_) => "gset",
            Self::ReplicatedSet(_) => "replicatedSet",
            Self::Vote(_) => "vote",
            Self::ReplicatedMap(_) => "replicatedMap",
            Self::ReplicatedCounterMap(_) => "replicatedCounterMap",
            Self::ReplicatedRegisterMap(_) => "replicatedRegisterMap",
            Self::ReplicatedMultiMap(_) => "replicatedMultiMap",
        }
    }
}

/// The delta of a single map entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct EntryDelta<D> {
    pub key: SerializedAny,
    pub delta: D,
}

/// The delta of a map whose values are all of one fixed type.
///
/// Such maps create their values on demand, so every entry with a pending change is reported
/// as `updated`; there is no separate notion of an added entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FixedMapDelta<D> {
    pub cleared: bool,
    pub removed: Vec<SerializedAny>,
    pub updated: Vec<EntryDelta<D>>,
}

// NOTE: manual impl so that `D` doesn't need to implement Default.
impl<D> Default for FixedMapDelta<D> {
    fn default() -> Self {
        Self {
            cleared: false,
            removed: Vec::new(),
            updated: Vec::new(),
        }
    }
}

pub type ReplicatedCounterMapDelta = FixedMapDelta<CounterDelta>;
pub type ReplicatedRegisterMapDelta = FixedMapDelta<RegisterDelta>;
pub type ReplicatedMultiMapDelta = FixedMapDelta<ReplicatedSetDelta>;
