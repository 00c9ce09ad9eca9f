//! Engine error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for the session engine.
///
/// Each variant corresponds to one failure class of the protocol. Every
/// failure is contained at the operation boundary that produced it; none of
/// them may tear down a running client session.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A publish or subscribe on the broadcast transport failed. Message
    /// loss itself is tolerated and never surfaces as an error.
    #[error("transport error: {0}")]
    Transport(String),

    /// A single narration tier declined or failed.
    #[error("narration tier {tier} failed: {reason}")]
    NarrationTier {
        /// The tier that failed.
        tier: String,
        /// Why it failed.
        reason: String,
    },

    /// Every tier of the narration fallback ladder failed. Carries the last
    /// tier's error so the caller can surface it.
    #[error("narration failed after {attempted} tier(s): {last}")]
    NarrationExhausted {
        /// Number of tiers attempted.
        attempted: usize,
        /// The final tier's error message.
        last: String,
    },

    /// A mutation referenced a participant, roll, or token that does not
    /// exist. Reducers treat this as a safe no-op; the variant exists for
    /// intent-side validation.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A durable store operation failed. Write-behind callers log this and
    /// never roll back the already-applied mutation.
    #[error("store error: {0}")]
    Store(String),

    /// An asynchronous result resolved after its originating round ended
    /// and was discarded.
    #[error("stale response for round {0}")]
    StaleRound(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_display_includes_last_tier_error() {
        let err = EngineError::NarrationExhausted {
            attempted: 3,
            last: "rate limited".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "narration failed after 3 tier(s): rate limited"
        );
    }
}
