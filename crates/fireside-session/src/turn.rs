//! Per-round turn bookkeeping.

use uuid::Uuid;

/// One collected action, attributed to its player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedAction {
    /// The submitting player's display name.
    pub name: String,
    /// The action text, verbatim.
    pub text: String,
}

/// Where the round currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// No round open.
    Idle,
    /// Collecting one action per eligible participant.
    AwaitingPlayers,
    /// Every action collected; the combine step may fire.
    AllCollected,
    /// A narration call is in flight for this round.
    Narrating,
}

/// Turn aggregation state for the current round.
#[derive(Debug, Clone)]
pub struct TurnState {
    /// Identity of the open round; guards stale narration resolutions.
    pub round_id: Option<Uuid>,
    /// Display names still owed an action. Never contains duplicates and
    /// never contains the GM.
    pub waiting_for: Vec<String>,
    /// Actions collected so far, in submission order.
    pub collected: Vec<SubmittedAction>,
    /// Current phase.
    pub phase: TurnPhase,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            round_id: None,
            waiting_for: Vec::new(),
            collected: Vec::new(),
            phase: TurnPhase::Idle,
        }
    }
}

impl TurnState {
    /// Fresh idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new round waiting on `names`. Duplicates are dropped;
    /// callers have already excluded the GM. Previous collected actions
    /// are discarded.
    pub fn open_round(&mut self, round_id: Uuid, names: &[String]) {
        self.round_id = Some(round_id);
        self.waiting_for.clear();
        for name in names {
            if !self.waiting_for.contains(name) {
                self.waiting_for.push(name.clone());
            }
        }
        self.collected.clear();
        self.phase = if self.waiting_for.is_empty() {
            TurnPhase::AllCollected
        } else {
            TurnPhase::AwaitingPlayers
        };
    }

    /// Records a participant's single action for the round. Returns `true`
    /// exactly when this submission completed the round. Submissions from
    /// names not in `waiting_for` (already submitted, or never eligible)
    /// are a no-op.
    pub fn submit(&mut self, name: &str, text: &str) -> bool {
        if self.phase != TurnPhase::AwaitingPlayers {
            tracing::debug!(%name, "submission outside awaiting phase ignored");
            return false;
        }
        let Some(position) = self.waiting_for.iter().position(|n| n == name) else {
            tracing::debug!(%name, "submission from non-waiting participant ignored");
            return false;
        };
        self.waiting_for.remove(position);
        self.collected.push(SubmittedAction {
            name: name.to_owned(),
            text: text.to_owned(),
        });
        if self.waiting_for.is_empty() {
            self.phase = TurnPhase::AllCollected;
            true
        } else {
            false
        }
    }

    /// Moves into the narrating phase. Only valid from `AllCollected` for
    /// the open round.
    pub fn begin_narration(&mut self, round_id: Uuid) -> bool {
        if self.round_id == Some(round_id) && self.phase == TurnPhase::AllCollected {
            self.phase = TurnPhase::Narrating;
            true
        } else {
            false
        }
    }

    /// Returns the round to `AllCollected` after a failed narration so the
    /// same submitted actions can be retried. `waiting_for` is untouched.
    pub fn narration_failed(&mut self, round_id: Uuid) {
        if self.round_id == Some(round_id) && self.phase == TurnPhase::Narrating {
            self.phase = TurnPhase::AllCollected;
        }
    }

    /// Closes the round after its narration landed.
    pub fn complete(&mut self, round_id: Uuid) {
        if self.round_id == Some(round_id) {
            self.round_id = None;
            self.waiting_for.clear();
            self.collected.clear();
            self.phase = TurnPhase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_closes_exactly_once_in_any_order() {
        let names: Vec<String> = ["A", "B", "C"].iter().map(|s| (*s).to_owned()).collect();
        let orders = [["A", "B", "C"], ["C", "A", "B"], ["B", "C", "A"]];

        for order in orders {
            let mut turn = TurnState::new();
            turn.open_round(Uuid::new_v4(), &names);

            let mut completions = 0;
            for name in order {
                if turn.submit(name, "acts") {
                    completions += 1;
                }
            }

            assert_eq!(completions, 1);
            assert_eq!(turn.phase, TurnPhase::AllCollected);
            assert_eq!(turn.collected.len(), 3);
        }
    }

    #[test]
    fn test_duplicate_submission_ignored() {
        let mut turn = TurnState::new();
        turn.open_round(Uuid::new_v4(), &["A".to_owned(), "B".to_owned()]);

        assert!(!turn.submit("A", "first"));
        assert!(!turn.submit("A", "again"));
        assert_eq!(turn.collected.len(), 1);
        assert_eq!(turn.waiting_for, vec!["B".to_owned()]);
    }

    #[test]
    fn test_open_round_drops_duplicate_names() {
        let mut turn = TurnState::new();
        turn.open_round(
            Uuid::new_v4(),
            &["A".to_owned(), "A".to_owned(), "B".to_owned()],
        );
        assert_eq!(turn.waiting_for, vec!["A".to_owned(), "B".to_owned()]);
    }

    #[test]
    fn test_failed_narration_keeps_collected_actions() {
        let mut turn = TurnState::new();
        let round = Uuid::new_v4();
        turn.open_round(round, &["A".to_owned()]);
        turn.submit("A", "opens the door");

        assert!(turn.begin_narration(round));
        turn.narration_failed(round);

        assert_eq!(turn.phase, TurnPhase::AllCollected);
        assert_eq!(turn.collected.len(), 1);
        assert!(turn.waiting_for.is_empty());
    }
}
