//! The pause/exit-vote state machine.
//!
//! `Idle → Open (START) → {Passed | Failed | Cancelled} → Idle`. Quorum is
//! `total / 2 + 1` of the participants present when the vote opened. A
//! passed vote saves the session and ends local play.

use std::collections::HashSet;

use uuid::Uuid;

/// Terminal result of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Yes reached quorum; the session transitions to `Saved`.
    Passed,
    /// No reached quorum, or everyone voted without a yes quorum.
    Failed,
    /// The initiator withdrew the vote.
    Cancelled,
}

/// An open ballot.
#[derive(Debug, Clone)]
pub struct Ballot {
    /// Who opened the vote.
    pub initiator: Uuid,
    /// Participant count snapshotted at open; fixes the quorum.
    pub total: usize,
    yes: HashSet<Uuid>,
    no: HashSet<Uuid>,
}

impl Ballot {
    /// Votes required to pass or fail: floor(total / 2) + 1.
    #[must_use]
    pub const fn quorum(&self) -> usize {
        self.total / 2 + 1
    }

    /// Current yes count.
    #[must_use]
    pub fn yes_count(&self) -> usize {
        self.yes.len()
    }

    /// Current no count.
    #[must_use]
    pub fn no_count(&self) -> usize {
        self.no.len()
    }
}

/// The vote state machine.
#[derive(Debug, Clone, Default)]
pub enum VoteState {
    /// No vote open.
    #[default]
    Idle,
    /// A ballot is being collected.
    Open(Ballot),
}

impl VoteState {
    /// Fresh idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::Idle
    }

    /// Opens a vote. A START while one is already open is a no-op.
    pub fn start(&mut self, initiator: Uuid, total_participants: usize) -> bool {
        match self {
            Self::Idle => {
                *self = Self::Open(Ballot {
                    initiator,
                    total: total_participants,
                    yes: HashSet::new(),
                    no: HashSet::new(),
                });
                true
            }
            Self::Open(_) => {
                tracing::debug!("vote start ignored: vote already open");
                false
            }
        }
    }

    /// Casts a ballot. A voter's first ballot counts; repeats are ignored.
    /// Returns the outcome when this ballot resolves the vote, upon which
    /// the machine returns to `Idle`.
    pub fn cast(&mut self, voter: Uuid, approve: bool) -> Option<VoteOutcome> {
        let Self::Open(ballot) = self else {
            tracing::debug!(%voter, "ballot without open vote ignored");
            return None;
        };
        if ballot.yes.contains(&voter) || ballot.no.contains(&voter) {
            tracing::debug!(%voter, "repeat ballot ignored");
            return None;
        }
        if approve {
            ballot.yes.insert(voter);
        } else {
            ballot.no.insert(voter);
        }

        let quorum = ballot.quorum();
        let outcome = if ballot.yes.len() >= quorum {
            Some(VoteOutcome::Passed)
        } else if ballot.no.len() >= quorum || ballot.yes.len() + ballot.no.len() >= ballot.total {
            Some(VoteOutcome::Failed)
        } else {
            None
        };

        if outcome.is_some() {
            *self = Self::Idle;
        }
        outcome
    }

    /// Withdraws the vote. Only the initiator may cancel; anyone else is a
    /// no-op.
    pub fn cancel(&mut self, by: Uuid) -> Option<VoteOutcome> {
        match self {
            Self::Open(ballot) if ballot.initiator == by => {
                *self = Self::Idle;
                Some(VoteOutcome::Cancelled)
            }
            Self::Open(_) => {
                tracing::debug!(%by, "cancel from non-initiator ignored");
                None
            }
            Self::Idle => None,
        }
    }

    /// Whether a vote is currently open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voters(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_three_yes_of_five_passes() {
        let v = voters(5);
        let mut vote = VoteState::new();
        vote.start(v[0], 5);

        assert_eq!(vote.cast(v[0], true), None);
        assert_eq!(vote.cast(v[1], true), None);
        assert_eq!(vote.cast(v[2], true), Some(VoteOutcome::Passed));
        assert!(!vote.is_open());
    }

    #[test]
    fn test_three_no_of_five_fails() {
        let v = voters(5);
        let mut vote = VoteState::new();
        vote.start(v[0], 5);

        assert_eq!(vote.cast(v[1], false), None);
        assert_eq!(vote.cast(v[2], false), None);
        assert_eq!(vote.cast(v[3], false), Some(VoteOutcome::Failed));
    }

    #[test]
    fn test_all_voted_without_quorum_fails() {
        let v = voters(5);
        let mut vote = VoteState::new();
        vote.start(v[0], 5);

        vote.cast(v[0], true);
        vote.cast(v[1], true);
        vote.cast(v[2], false);
        vote.cast(v[3], false);
        assert_eq!(vote.cast(v[4], false), Some(VoteOutcome::Failed));
    }

    #[test]
    fn test_only_initiator_cancels() {
        let v = voters(3);
        let mut vote = VoteState::new();
        vote.start(v[0], 3);

        assert_eq!(vote.cancel(v[1]), None);
        assert!(vote.is_open());
        assert_eq!(vote.cancel(v[0]), Some(VoteOutcome::Cancelled));
        assert!(!vote.is_open());
    }

    #[test]
    fn test_repeat_ballots_ignored() {
        let v = voters(4);
        let mut vote = VoteState::new();
        vote.start(v[0], 4);

        vote.cast(v[1], true);
        assert_eq!(vote.cast(v[1], true), None);
        assert_eq!(vote.cast(v[1], false), None);
        if let VoteState::Open(ballot) = &vote {
            assert_eq!(ballot.yes_count(), 1);
            assert_eq!(ballot.no_count(), 0);
        } else {
            panic!("vote should still be open");
        }
    }
}
