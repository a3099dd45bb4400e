// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{FromDelta, ReplicatedData, ReplicatedDataError};
use crate::delta::ReplicatedDataDelta;

/// A boolean that starts out `false` and, once enabled, stays `true` forever.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flag {
    value: bool,
    delta: bool,
}

/// The state of a [`Flag`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
pub struct FlagDelta {
    pub value: bool,
}

impl Flag {
    pub fn is_enabled(&self) -> bool {
        self.value
    }

    pub fn enable(&mut self) {
        if !self.value {
            self.value = true;
            self.delta = true;
        }
    }
}

impl ReplicatedData for Flag {
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta> {
        if !std::mem::take(&mut self.delta) && !initial {
            return None;
        }
        Some(ReplicatedDataDelta::Flag(FlagDelta { value: self.value }))
    }

    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::Flag(FlagDelta { value }) => {
                self.value |= value;
                Ok(())
            }
            other => Err(ReplicatedDataError::invalid_delta("flag", &other)),
        }
    }
}

impl FromDelta for Flag {
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::Flag(_) => Ok(Self::default()),
            other => Err(ReplicatedDataError::invalid_delta("flag", other)),
        }
    }
}
