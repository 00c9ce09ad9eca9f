//! Narration capability abstraction.
//!
//! "Produce narration text for a prompt plus history, or fail." A concrete
//! backend sits behind this trait; the orchestrator only sees an ordered
//! list of tiers it can try.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Who authored a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    /// A participant's submitted action or message.
    User,
    /// A previous narration turn.
    Model,
}

/// One entry of the ordered conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who authored the entry.
    pub role: SpeakerRole,
    /// The entry text.
    pub text: String,
}

/// A single narration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationRequest {
    /// Fixed system instruction describing narration rules and the inline
    /// dice-directive syntax the model must use.
    pub system: String,
    /// The turn prompt, one "Name: action" line per collected action.
    pub prompt: String,
    /// Full ordered history of the session so far.
    pub history: Vec<HistoryEntry>,
}

/// One quality tier of the narration service.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Identifier for this tier, reported back as `used_tier` on success.
    fn tier(&self) -> &str;

    /// Generate narration text for the request.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NarrationTier` when this tier is unavailable
    /// or declined the request; the ladder then moves on to the next tier.
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, EngineError>;
}
