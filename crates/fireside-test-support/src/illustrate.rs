//! Illustrator doubles.

use std::sync::Mutex;

use async_trait::async_trait;
use fireside_core::error::EngineError;
use fireside_core::illustrate::SceneIllustrator;

/// An illustrator that records every narration it was asked to draw.
#[derive(Debug, Default)]
pub struct RecordingIllustrator {
    narrations: Mutex<Vec<String>>,
}

impl RecordingIllustrator {
    /// Fresh recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The narrations received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn narrations(&self) -> Vec<String> {
        self.narrations.lock().unwrap().clone()
    }
}

#[async_trait]
impl SceneIllustrator for RecordingIllustrator {
    async fn illustrate(&self, narration: &str) -> Result<(), EngineError> {
        self.narrations.lock().unwrap().push(narration.to_owned());
        Ok(())
    }
}

/// An illustrator that always fails, for asserting that illustration
/// failure never fails a narration turn.
#[derive(Debug, Default)]
pub struct FailingIllustrator;

#[async_trait]
impl SceneIllustrator for FailingIllustrator {
    async fn illustrate(&self, _narration: &str) -> Result<(), EngineError> {
        Err(EngineError::Transport("image backend unavailable".to_owned()))
    }
}
