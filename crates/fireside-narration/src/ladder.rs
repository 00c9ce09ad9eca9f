//! The narration fallback ladder.

use std::sync::Arc;

use fireside_core::error::EngineError;
use fireside_core::narration::{NarrationRequest, Narrator};

/// A successful narration, with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationOutcome {
    /// The generated text, verbatim (directives not yet stripped).
    pub text: String,
    /// Which tier answered.
    pub used_tier: String,
}

/// An ordered list of narration tiers, tried capability-descending.
///
/// Any single tier may be rate-limited or unavailable at any moment; the
/// ladder stops at the first success and surfaces the last error when
/// every tier fails. The order is fixed, never randomized.
pub struct FallbackLadder {
    tiers: Vec<Arc<dyn Narrator>>,
}

impl FallbackLadder {
    /// Builds a ladder from tiers in descending capability order.
    #[must_use]
    pub fn new(tiers: Vec<Arc<dyn Narrator>>) -> Self {
        Self { tiers }
    }

    /// Tries each tier in order.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NarrationExhausted` when every tier failed,
    /// carrying the last tier's error.
    pub async fn narrate(
        &self,
        request: &NarrationRequest,
    ) -> Result<NarrationOutcome, EngineError> {
        let mut last_error = "no narration tiers configured".to_owned();
        for tier in &self.tiers {
            match tier.narrate(request).await {
                Ok(text) => {
                    return Ok(NarrationOutcome {
                        text,
                        used_tier: tier.tier().to_owned(),
                    });
                }
                Err(err) => {
                    tracing::warn!(tier = tier.tier(), error = %err, "narration tier failed");
                    last_error = err.to_string();
                }
            }
        }
        Err(EngineError::NarrationExhausted {
            attempted: self.tiers.len(),
            last: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fireside_test_support::{FailingNarrator, ScriptedNarrator};

    fn request() -> NarrationRequest {
        NarrationRequest {
            system: "narrate".to_owned(),
            prompt: "Ash: opens the door".to_owned(),
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_first_success_wins_and_reports_tier() {
        let ladder = FallbackLadder::new(vec![
            Arc::new(FailingNarrator::new("tier-1", "rate limited")),
            Arc::new(FailingNarrator::new("tier-2", "unavailable")),
            Arc::new(ScriptedNarrator::new(
                "tier-3",
                vec!["The hinges scream.".to_owned()],
            )),
        ]);

        let outcome = ladder.narrate(&request()).await.unwrap();

        assert_eq!(outcome.text, "The hinges scream.");
        assert_eq!(outcome.used_tier, "tier-3");
    }

    #[tokio::test]
    async fn test_exhausted_ladder_surfaces_last_error() {
        let ladder = FallbackLadder::new(vec![
            Arc::new(FailingNarrator::new("tier-1", "rate limited")),
            Arc::new(FailingNarrator::new("tier-2", "overloaded")),
        ]);

        let err = ladder.narrate(&request()).await.unwrap_err();

        match err {
            EngineError::NarrationExhausted { attempted, last } => {
                assert_eq!(attempted, 2);
                assert!(last.contains("overloaded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_earlier_tiers_are_preferred() {
        let top = Arc::new(ScriptedNarrator::new("tier-1", vec!["From the top.".to_owned()]));
        let ladder = FallbackLadder::new(vec![
            Arc::clone(&top) as Arc<dyn Narrator>,
            Arc::new(ScriptedNarrator::new("tier-2", vec!["Never used.".to_owned()])),
        ]);

        let outcome = ladder.narrate(&request()).await.unwrap();

        assert_eq!(outcome.used_tier, "tier-1");
        assert_eq!(top.requests().len(), 1);
    }
}
