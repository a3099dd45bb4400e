// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! # replicated-data: Delta-Tracking Replicated Data Types
//!
//! This crate provides the client-side state machines of a family of conflict-free replicated
//! data types (CRDTs) that live inside an entity running behind a replication proxy. The proxy
//! owns the merge; the types in this crate own two things:
//!
//! 1. the **local state** a command handler reads and mutates, and
//! 2. the **delta**: the minimal change made since the last time the runtime harvested the
//!    type, ready to be shipped to the proxy.
//!
//! Deltas received from peers (via the proxy) are applied with
//! [`ReplicatedData::apply_delta`]. Applying a remote delta never re-enters the outgoing
//! delta, so remote changes are not echoed back.
//!
//! ## Types
//!
//! - [`ReplicatedCounter`]: an integer counter with commutative increments and decrements.
//! - [`ReplicatedRegister`]: a last-writer-wins cell whose conflict resolution is selected by a
//!   [`Clock`].
//! - [`Flag`]: a boolean that can only ever go from `false` to `true`.
//! - [`GSet`] and [`ReplicatedSet`]: grow-only and add-remove sets of opaque elements.
//! - [`Vote`]: a boolean vote whose aggregate tallies are computed by the proxy.
//! - [`ReplicatedMap`]: a map from keys to any other replicated data type.
//! - [`ReplicatedCounterMap`], [`ReplicatedRegisterMap`] and [`ReplicatedMultiMap`]: maps whose
//!   values are counters, registers and sets respectively, created on first write.
//!
//! ## Harvesting and applying
//!
//! ```rust
//! use replicated_data::{ReplicatedCounter, ReplicatedData, ReplicatedDataDelta, crdts::counter::CounterDelta};
//!
//! let mut counter = ReplicatedCounter::default();
//! counter.increment(5);
//! counter.decrement(2);
//!
//! // the runtime harvests the delta once...
//! let delta = counter.get_and_reset_delta(false);
//! assert_eq!(delta, Some(ReplicatedDataDelta::Counter(CounterDelta { change: 3 })));
//! // ...and there is nothing left to ship until the next mutation.
//! assert_eq!(counter.get_and_reset_delta(false), None);
//!
//! // a peer receives the delta and converges on the same value.
//! let mut peer = ReplicatedCounter::default();
//! peer.apply_delta(delta.unwrap()).unwrap();
//! assert_eq!(peer.value(), counter.value());
//! ```
//!
//! ## Keys and elements
//!
//! Set elements, map keys and register values travel on the wire as [`SerializedAny`]. Inside
//! the map- and set-shaped types they are indexed by a [`ComparableKey`] so that two values that
//! are logically equal collide even when they are distinct instances. Both conversions are
//! provided by the [`AnyValue`] trait, which is implemented for the primitive types and (with the
//! `json` feature) for [`serde_json::Value`].
//!
//! ## Nested data
//!
//! [`ReplicatedMap`] holds any type that implements [`ReplicatedData`] and [`FromDelta`]. When a
//! peer's delta mentions a key for the first time, the map uses [`FromDelta::create_for_delta`]
//! to instantiate the nested value from the delta's discriminant. [`AnyReplicatedData`] is the
//! dynamically-typed value for maps whose entries are not all of the same type.
//!
//! ## Threading
//!
//! Nothing in this crate blocks or locks. The runtime guarantees that at most one command (or
//! incoming delta) is processed per entity at a time, and each nested value is owned by exactly
//! one map entry.
//!
//! ## Features
//!
//! - `json`: Implements [`AnyValue`] for `serde_json::Value`. This feature is enabled by default.
//! - `serde`: Provides `serde` support for all delta and wire types.
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

use ahash::RandomState;
use std::{
    collections::{HashMap, HashSet},
    hash::BuildHasher,
    sync::atomic::{AtomicBool, Ordering},
};

// Use a constant seed for hashing to make performance benchmarks have less variance.
pub(crate) const DETERMINISTIC_HASHER: RandomState = RandomState::with_seeds(48, 1516, 23, 42);

pub mod support;
pub use support::{AnyValue, ComparableKey, SerializedAny, SupportError};
pub mod delta;
pub use delta::ReplicatedDataDelta;
pub mod crdts;
pub use crdts::{
    AnyReplicatedData, FromDelta, ReplicatedData, ReplicatedDataError,
    counter::ReplicatedCounter,
    counter_map::ReplicatedCounterMap,
    flag::Flag,
    gset::GSet,
    map::ReplicatedMap,
    multi_map::ReplicatedMultiMap,
    register::{Clock, ReplicatedRegister},
    register_map::ReplicatedRegisterMap,
    set::ReplicatedSet,
    vote::Vote,
};
#[cfg(feature = "json")]
pub mod json;

static ENABLE_DETERMINISM: AtomicBool = AtomicBool::new(false);

/// Makes all data structures behave deterministically.
///
/// This should only be enabled for testing, as it increases the odds of DoS
/// scenarios.
#[doc(hidden)]
pub fn enable_determinism() {
    ENABLE_DETERMINISM.store(true, Ordering::Release);
}

/// Checks if determinism is enabled.
///
/// Should be used internally and for testing.
#[doc(hidden)]
pub fn determinism_enabled() -> bool {
    ENABLE_DETERMINISM.load(Ordering::Acquire)
}

/// Create a random state for a hashmap.
/// If `enable_determinism` has been used, this will return a deterministic
/// decidedly non-random RandomState, useful in tests.
#[inline]
fn make_random_state() -> RandomState {
    if determinism_enabled() {
        DETERMINISTIC_HASHER
    } else {
        RandomState::new()
    }
}

/// The map every keyed type uses to index its contents by [`ComparableKey`].
pub(crate) type KeyMap<V> = HashMap<ComparableKey, V, ReplicatedRandomState>;

/// The set used to stage keys in a pending delta.
pub(crate) type KeySet = HashSet<ComparableKey, ReplicatedRandomState>;

fn create_map<V>() -> KeyMap<V> {
    HashMap::with_hasher(ReplicatedRandomState::default())
}

fn create_set() -> KeySet {
    HashSet::with_hasher(ReplicatedRandomState::default())
}

/// This is a small wrapper around the standard RandomState.
/// This allows us to easily switch to a non-random RandomState for use in tests.
#[derive(Clone)]
pub struct ReplicatedRandomState {
    inner: RandomState,
}

// Falls back on the regular ahash::RandomState except when 'enable_determinism' has been
// called, in which case a static only-for-test RandomState is used.
impl Default for ReplicatedRandomState {
    #[inline]
    fn default() -> Self {
        Self {
            inner: make_random_state(),
        }
    }
}

impl BuildHasher for ReplicatedRandomState {
    type Hasher = <RandomState as BuildHasher>::Hasher;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        self.inner.build_hasher()
    }
}
