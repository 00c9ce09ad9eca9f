//! Authoring-side typing reveal.
//!
//! Narration is revealed incrementally on the authoring client only; the
//! network never carries character-by-character traffic. Peers receive the
//! complete message exactly once, when the reveal finishes.

use chrono::TimeDelta;
use uuid::Uuid;

/// Characters revealed per tick.
const CHARS_PER_TICK: usize = 3;

/// Interval at which the engine ticks an active reveal.
#[must_use]
pub fn reveal_interval() -> TimeDelta {
    TimeDelta::milliseconds(40)
}

/// Progress of one reveal tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStep {
    /// More text remains.
    Revealing,
    /// The full text is visible; time to broadcast and persist.
    Complete,
}

/// An in-progress typing reveal of one narrator message.
#[derive(Debug, Clone)]
pub struct TypingReveal {
    /// The chat message being revealed.
    pub message_id: Uuid,
    /// The round this narration belongs to.
    pub round_id: Uuid,
    text: String,
    total_chars: usize,
    revealed_chars: usize,
}

impl TypingReveal {
    /// Starts a reveal at zero characters.
    #[must_use]
    pub fn new(message_id: Uuid, round_id: Uuid, text: String) -> Self {
        let total_chars = text.chars().count();
        Self {
            message_id,
            round_id,
            text,
            total_chars,
            revealed_chars: 0,
        }
    }

    /// Advances the reveal by one tick.
    pub fn tick(&mut self) -> RevealStep {
        self.revealed_chars = (self.revealed_chars + CHARS_PER_TICK).min(self.total_chars);
        if self.revealed_chars >= self.total_chars {
            RevealStep::Complete
        } else {
            RevealStep::Revealing
        }
    }

    /// The currently visible prefix, always on a character boundary.
    #[must_use]
    pub fn visible(&self) -> &str {
        let end = self
            .text
            .char_indices()
            .nth(self.revealed_chars)
            .map_or(self.text.len(), |(index, _)| index);
        &self.text[..end]
    }

    /// The full text being revealed.
    #[must_use]
    pub fn full_text(&self) -> &str {
        &self.text
    }

    /// Whether the reveal has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.revealed_chars >= self.total_chars
    }
}
