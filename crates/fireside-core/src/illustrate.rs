//! Scene illustration capability.

use async_trait::async_trait;

use crate::error::EngineError;

/// Fire-and-forget request for an illustration keyed off narration text.
///
/// Invoked after each successful narration turn. Failure is logged by the
/// caller and must never fail the turn itself.
#[async_trait]
pub trait SceneIllustrator: Send + Sync {
    /// Request an illustration for the given narration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` on backend failure; callers log and move on.
    async fn illustrate(&self, narration: &str) -> Result<(), EngineError>;
}

/// Illustrator that does nothing. Used when no image backend is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIllustrator;

#[async_trait]
impl SceneIllustrator for NoopIllustrator {
    async fn illustrate(&self, _narration: &str) -> Result<(), EngineError> {
        Ok(())
    }
}
