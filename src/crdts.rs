// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! # Replicated Data Types
//!
//! Every type in this module implements two capabilities:
//!
//! - [`ReplicatedData`]: local mutations are recorded in a pending delta, which the runtime
//!   harvests with [`ReplicatedData::get_and_reset_delta`]; deltas from peers are merged in with
//!   [`ReplicatedData::apply_delta`].
//! - [`FromDelta`]: a fresh, empty instance can be created for an incoming delta, which is how
//!   maps instantiate nested values they have never seen before.
//!
//! ## Pending deltas
//!
//! The pending delta of a type only ever describes changes made through its own mutating
//! methods. Applying a remote delta updates the local state but leaves the pending delta alone
//! (or, for [`ReplicatedRegister`](register::ReplicatedRegister), discards it), so that remote
//! changes are not echoed back to the proxy.
//!
//! ## Composition
//!
//! [`map::ReplicatedMap`] holds any value that implements both capabilities. The fixed-value
//! maps ([`counter_map`], [`register_map`], [`multi_map`]) hold a single known type and create
//! it on demand. [`AnyReplicatedData`] is the dynamically typed value produced by the factory in
//! [`factory`].
use crate::{delta::ReplicatedDataDelta, support::SupportError};
use std::fmt;

pub mod counter;
pub mod counter_map;
pub mod factory;
mod fixed_map;
pub mod flag;
pub mod gset;
pub mod map;
pub mod multi_map;
pub mod register;
pub mod register_map;
pub mod set;
pub mod vote;

pub use factory::AnyReplicatedData;

#[cfg(test)]
pub(crate) mod test_util;

/// A data type that tracks its own changes as a delta and merges the deltas of its peers.
pub trait ReplicatedData {
    /// Returns the changes made since the last call, and resets them.
    ///
    /// Returns `None` if nothing changed, unless `initial` is set, in which case a delta is
    /// always produced. Maps use `initial` to ship values they have just added.
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta>;

    /// Merges a delta received from a peer into the local state.
    ///
    /// # Errors
    ///
    /// Fails if the delta belongs to a different type, or if a value it carries cannot be
    /// deserialized.
    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError>;
}

/// Creation of empty values for incoming deltas.
pub trait FromDelta: Sized {
    /// Creates a fresh instance that the given delta can be applied to.
    ///
    /// The delta is only inspected, not applied.
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError>;
}

/// Error returned when building or merging replicated data fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicatedDataError {
    /// A value required to construct a type was missing.
    InvalidArgument(String),
    /// A delta was applied to a type it does not belong to.
    InvalidDelta {
        expected: &'static str,
        found: &'static str,
    },
    /// The factory was asked to create a type it does not know how to create.
    UnknownReplicatedDataType(&'static str),
    /// A value in a delta could not be deserialized.
    Support(SupportError),
}

impl ReplicatedDataError {
    pub(crate) fn invalid_delta(expected: &'static str, found: &ReplicatedDataDelta) -> Self {
        Self::InvalidDelta {
            expected,
            found: found.kind(),
        }
    }
}

impl fmt::Display for ReplicatedDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::InvalidDelta { expected, found } => {
                write!(f, "cannot apply {found} delta, expected a {expected} delta")
            }
            Self::UnknownReplicatedDataType(kind) => {
                write!(f, "unknown replicated data type: {kind}")
            }
            Self::Support(e) => write!(f, "cannot decode value: {e}"),
        }
    }
}

impl std::error::Error for ReplicatedDataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Support(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SupportError> for ReplicatedDataError {
    fn from(e: SupportError) -> Self {
        Self::Support(e)
    }
}
