// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use super::{FromDelta, ReplicatedData, ReplicatedDataError};
use crate::delta::ReplicatedDataDelta;

/// A boolean vote cast by this node, together with the tallies of all nodes.
///
/// Only the local vote is ever shipped. The number of votes for and the number of voters are
/// computed by the proxy and received through [`ReplicatedData::apply_delta`]; changing the
/// local vote adjusts the local tally right away so that it reflects the change until the next
/// update arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    self_vote: bool,
    votes_for: u32,
    total_voters: u32,
    delta: Option<bool>,
}

/// The vote of a node and, when received from the proxy, the tallies of all nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct VoteDelta {
    pub self_vote: bool,
    pub votes_for: u32,
    pub total_voters: u32,
}

impl Vote {
    /// A vote that has not seen any tallies yet; this node is its only voter.
    pub fn new() -> Self {
        Self {
            self_vote: false,
            votes_for: 0,
            total_voters: 1,
            delta: None,
        }
    }

    pub fn self_vote(&self) -> bool {
        self.self_vote
    }

    pub fn votes_for(&self) -> u32 {
        self.votes_for
    }

    pub fn total_voters(&self) -> u32 {
        self.total_voters
    }

    /// Casts this node's vote.
    pub fn set_vote(&mut self, vote: bool) {
        if self.self_vote == vote {
            return;
        }
        if vote {
            self.votes_for = self.votes_for.saturating_add(1);
        } else {
            self.votes_for = self.votes_for.saturating_sub(1);
        }
        self.self_vote = vote;
        self.delta = Some(vote);
    }

    /// Whether at least one node voted for.
    pub fn at_least_one(&self) -> bool {
        self.votes_for > 0
    }

    /// Whether more than half of all nodes voted for.
    pub fn majority(&self) -> bool {
        self.votes_for > self.total_voters / 2
    }

    /// Whether every node voted for.
    pub fn all(&self) -> bool {
        self.votes_for == self.total_voters
    }
}

impl Default for Vote {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicatedData for Vote {
    fn get_and_reset_delta(&mut self, initial: bool) -> Option<ReplicatedDataDelta> {
        if initial {
            self.delta = Some(self.self_vote);
        }
        let self_vote = self.delta.take()?;
        Some(ReplicatedDataDelta::Vote(VoteDelta {
            self_vote,
            // the proxy computes these
            votes_for: 0,
            total_voters: 0,
        }))
    }

    fn apply_delta(&mut self, delta: ReplicatedDataDelta) -> Result<(), ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::Vote(VoteDelta {
                self_vote,
                votes_for,
                total_voters,
            }) => {
                self.self_vote = self_vote;
                self.votes_for = votes_for;
                self.total_voters = total_voters;
                Ok(())
            }
            other => Err(ReplicatedDataError::invalid_delta("vote", &other)),
        }
    }
}

impl FromDelta for Vote {
    fn create_for_delta(delta: &ReplicatedDataDelta) -> Result<Self, ReplicatedDataError> {
        match delta {
            ReplicatedDataDelta::Vote(_) => Ok(Self::new()),
            other => Err(ReplicatedDataError::invalid_delta("vote", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outgoing(self_vote: bool) -> Option<ReplicatedDataDelta> {
        Some(ReplicatedDataDelta::Vote(VoteDelta {
            self_vote,
            votes_for: 0,
            total_voters: 0,
        }))
    }

    #[test]
    fn vote_is_shipped_once() {
        let mut vote = Vote::new();
        vote.set_vote(true);
        assert_eq!(vote.get_and_reset_delta(false), outgoing(true));
        vote.set_vote(true);
        assert_eq!(vote.get_and_reset_delta(false), None);
        assert_eq!(vote.votes_for(), 1);
        assert!(vote.all());
    }

    #[test]
    fn withdrawing_a_vote() {
        let mut vote = Vote::new();
        vote.set_vote(true);
        vote.set_vote(false);
        assert_eq!(vote.votes_for(), 0);
        // the latest intent is what ships
        assert_eq!(vote.get_and_reset_delta(false), outgoing(false));
    }

    #[test]
    fn initial_ships_current_vote() {
        let mut vote = Vote::new();
        assert_eq!(vote.get_and_reset_delta(true), outgoing(false));
        assert_eq!(vote.get_and_reset_delta(false), None);
    }

    #[test]
    fn voting_at_the_tally_limit_does_not_overflow() {
        let mut vote = Vote::new();
        vote.apply_delta(ReplicatedDataDelta::Vote(VoteDelta {
            self_vote: false,
            votes_for: u32::MAX,
            total_voters: u32::MAX,
        }))
        .unwrap();
        vote.set_vote(true);
        assert_eq!(vote.votes_for(), u32::MAX);
        assert!(vote.all());
    }

    #[test]
    fn tallies_come_from_the_proxy() {
        let mut vote = Vote::new();
        vote.apply_delta(ReplicatedDataDelta::Vote(VoteDelta {
            self_vote: true,
            votes_for: 2,
            total_voters: 5,
        }))
        .unwrap();
        assert!(vote.self_vote());
        assert_eq!(vote.total_voters(), 5);
        assert!(vote.at_least_one());
        assert!(!vote.majority());
        assert!(!vote.all());
        assert_eq!(vote.get_and_reset_delta(false), None);

        vote.apply_delta(ReplicatedDataDelta::Vote(VoteDelta {
            self_vote: true,
            votes_for: 3,
            total_voters: 5,
        }))
        .unwrap();
        assert!(vote.majority());
    }
}
