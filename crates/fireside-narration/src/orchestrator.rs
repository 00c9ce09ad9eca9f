//! The turn orchestrator.
//!
//! Owns the narration conversation for one session: combines the round's
//! collected actions into a prompt, runs the fallback ladder, and parses
//! roll directives out of the response. The driving event loop applies the
//! returned turn (reveal, broadcast, persist, gates) — and discards it if
//! the round changed while the call was in flight.

use uuid::Uuid;

use fireside_core::error::EngineError;
use fireside_core::narration::{HistoryEntry, SpeakerRole};
use fireside_session::turn::SubmittedAction;

use crate::directive::{RollDemand, extract_directives};
use crate::ladder::FallbackLadder;
use crate::prompt::{PRIMING_PROMPT, build_request, combine_actions};

/// One produced narration turn, ready to reveal and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationTurn {
    /// The round this turn answers. Checked against the live round before
    /// the result is applied; a mismatch means the response is stale.
    pub round_id: Uuid,
    /// Narration text with directives stripped, ready for display.
    pub text: String,
    /// The ladder tier that produced it.
    pub used_tier: String,
    /// Forced-roll demands parsed out of the text.
    pub demands: Vec<RollDemand>,
}

/// Aggregates rounds into narration turns.
pub struct TurnOrchestrator {
    ladder: FallbackLadder,
    history: Vec<HistoryEntry>,
}

impl TurnOrchestrator {
    /// Creates an orchestrator with an empty conversation.
    #[must_use]
    pub fn new(ladder: FallbackLadder) -> Self {
        Self {
            ladder,
            history: Vec::new(),
        }
    }

    /// Seeds the conversation, used when resuming a persisted session.
    pub fn seed_history(&mut self, entries: Vec<HistoryEntry>) {
        self.history = entries;
    }

    /// The ordered conversation so far.
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Combines collected actions into one prompt and produces exactly one
    /// narration turn for the round.
    ///
    /// On success the exchange is appended to the conversation history (the
    /// model entry keeps its directives so the model can see what it asked
    /// for). On failure the history is untouched and the caller leaves the
    /// round open so the same actions can be retried.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NarrationExhausted` when every ladder tier
    /// failed.
    pub async fn combine_and_narrate(
        &mut self,
        round_id: Uuid,
        actions: &[SubmittedAction],
    ) -> Result<NarrationTurn, EngineError> {
        let prompt = combine_actions(actions);
        self.narrate_prompt(round_id, prompt).await
    }

    /// Issues the automatic opening turn for a session with no prior
    /// narration, without waiting for any participant action.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NarrationExhausted` when every ladder tier
    /// failed.
    pub async fn prime(&mut self, round_id: Uuid) -> Result<NarrationTurn, EngineError> {
        self.narrate_prompt(round_id, PRIMING_PROMPT.to_owned()).await
    }

    async fn narrate_prompt(
        &mut self,
        round_id: Uuid,
        prompt: String,
    ) -> Result<NarrationTurn, EngineError> {
        let request = build_request(prompt.clone(), self.history.clone());
        let outcome = self.ladder.narrate(&request).await?;

        let (text, demands) = extract_directives(&outcome.text);
        self.history.push(HistoryEntry {
            role: SpeakerRole::User,
            text: prompt,
        });
        self.history.push(HistoryEntry {
            role: SpeakerRole::Model,
            text: outcome.text,
        });

        tracing::info!(%round_id, tier = %outcome.used_tier, "narration turn produced");
        Ok(NarrationTurn {
            round_id,
            text,
            used_tier: outcome.used_tier,
            demands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use fireside_protocol::model::{DiceKind, RollTargets};
    use fireside_test_support::{FailingNarrator, ScriptedNarrator};

    fn actions() -> Vec<SubmittedAction> {
        vec![
            SubmittedAction {
                name: "P1".to_owned(),
                text: "open the door".to_owned(),
            },
            SubmittedAction {
                name: "P2".to_owned(),
                text: "light a torch".to_owned(),
            },
        ]
    }

    #[tokio::test]
    async fn test_prompt_carries_each_action_verbatim() {
        let scripted = Arc::new(ScriptedNarrator::new(
            "tier-1",
            vec!["Light floods the hall.".to_owned()],
        ));
        let mut orchestrator =
            TurnOrchestrator::new(FallbackLadder::new(vec![Arc::clone(&scripted) as _]));

        orchestrator
            .combine_and_narrate(Uuid::new_v4(), &actions())
            .await
            .unwrap();

        let request = &scripted.requests()[0];
        assert!(request.prompt.contains("P1: open the door"));
        assert!(request.prompt.contains("P2: light a torch"));
    }

    #[tokio::test]
    async fn test_fallback_reaches_lower_tier() {
        let mut orchestrator = TurnOrchestrator::new(FallbackLadder::new(vec![
            Arc::new(FailingNarrator::new("tier-1", "rate limited")),
            Arc::new(ScriptedNarrator::new("tier-2", vec!["Onward.".to_owned()])),
        ]));

        let turn = orchestrator
            .combine_and_narrate(Uuid::new_v4(), &actions())
            .await
            .unwrap();

        assert_eq!(turn.used_tier, "tier-2");
        assert_eq!(turn.text, "Onward.");
    }

    #[tokio::test]
    async fn test_total_failure_leaves_history_untouched() {
        let mut orchestrator = TurnOrchestrator::new(FallbackLadder::new(vec![Arc::new(
            FailingNarrator::new("tier-1", "down"),
        )]));

        let result = orchestrator
            .combine_and_narrate(Uuid::new_v4(), &actions())
            .await;

        assert!(result.is_err());
        assert!(orchestrator.history().is_empty());
    }

    #[tokio::test]
    async fn test_directives_become_demands_and_history_keeps_raw_text() {
        let mut orchestrator = TurnOrchestrator::new(FallbackLadder::new(vec![Arc::new(
            ScriptedNarrator::new(
                "tier-1",
                vec!["The rope frays. [ROLL D20 P1]".to_owned()],
            ),
        )]));

        let turn = orchestrator
            .combine_and_narrate(Uuid::new_v4(), &actions())
            .await
            .unwrap();

        assert_eq!(turn.text, "The rope frays.");
        assert_eq!(
            turn.demands,
            vec![crate::directive::RollDemand {
                kind: DiceKind::D20,
                targets: RollTargets::Named(vec!["P1".to_owned()]),
            }]
        );
        // The model entry keeps the directive for future context.
        assert!(orchestrator.history()[1].text.contains("[ROLL D20 P1]"));
    }

    #[tokio::test]
    async fn test_priming_turn_uses_fixed_prompt() {
        let scripted = Arc::new(ScriptedNarrator::new(
            "tier-1",
            vec!["You wake in a cold cell.".to_owned()],
        ));
        let mut orchestrator =
            TurnOrchestrator::new(FallbackLadder::new(vec![Arc::clone(&scripted) as _]));

        orchestrator.prime(Uuid::new_v4()).await.unwrap();

        assert_eq!(scripted.requests()[0].prompt, PRIMING_PROMPT);
    }
}
