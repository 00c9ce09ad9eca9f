//! Narrator doubles — scripted and always-failing tiers.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use fireside_core::error::EngineError;
use fireside_core::narration::{NarrationRequest, Narrator};

/// A narration tier that replies from a predetermined script and records
/// every request it receives.
#[derive(Debug)]
pub struct ScriptedNarrator {
    tier: String,
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<NarrationRequest>>,
}

impl ScriptedNarrator {
    /// Creates a tier named `tier` that will return `replies` in order,
    /// then fail once exhausted.
    #[must_use]
    pub fn new(tier: impl Into<String>, replies: Vec<String>) -> Self {
        Self {
            tier: tier.into(),
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request this tier has seen.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<NarrationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Narrator for ScriptedNarrator {
    fn tier(&self) -> &str {
        &self.tier
    }

    async fn narrate(&self, request: &NarrationRequest) -> Result<String, EngineError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| EngineError::NarrationTier {
                tier: self.tier.clone(),
                reason: "script exhausted".to_owned(),
            })
    }
}

/// A narration tier that always fails, for exercising the fallback ladder.
#[derive(Debug)]
pub struct FailingNarrator {
    tier: String,
    reason: String,
}

impl FailingNarrator {
    /// Creates a tier named `tier` failing with `reason`.
    #[must_use]
    pub fn new(tier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Narrator for FailingNarrator {
    fn tier(&self) -> &str {
        &self.tier
    }

    async fn narrate(&self, _request: &NarrationRequest) -> Result<String, EngineError> {
        Err(EngineError::NarrationTier {
            tier: self.tier.clone(),
            reason: self.reason.clone(),
        })
    }
}
