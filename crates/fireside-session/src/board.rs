//! Token board, stats, and ambient effect cues.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

/// A token on the shared board.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenState {
    /// Token identity.
    pub id: Uuid,
    /// Label rendered with the token.
    pub label: String,
    /// Board x.
    pub x: f32,
    /// Board y.
    pub y: f32,
}

/// Local camera over the shared board. Every client frames its own view;
/// this is never broadcast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// View center x.
    pub x: f32,
    /// View center y.
    pub y: f32,
    /// Zoom factor, 1.0 = default framing.
    pub zoom: f32,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// The shared-board portion of session state: tokens, per-participant
/// stats, ambient effect cues, and transient cursor presence.
#[derive(Debug, Clone, Default)]
pub struct Board {
    tokens: BTreeMap<Uuid, TokenState>,
    stats: HashMap<Uuid, BTreeMap<String, i32>>,
    /// Latest environment effect cue, if any. Latest wins.
    pub env_fx: Option<String>,
    /// Latest audio cue, if any.
    pub audio_cue: Option<String>,
    cursors: HashMap<Uuid, (f32, f32)>,
}

impl Board {
    /// An empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token. Duplicate ids are a no-op.
    pub fn spawn_token(&mut self, token: TokenState) -> bool {
        if self.tokens.contains_key(&token.id) {
            tracing::debug!(id = %token.id, "spawn ignored: token already exists");
            return false;
        }
        self.tokens.insert(token.id, token);
        true
    }

    /// Moves a token. Unknown ids are a no-op.
    pub fn move_token(&mut self, token_id: Uuid, x: f32, y: f32) -> bool {
        match self.tokens.get_mut(&token_id) {
            Some(token) => {
                token.x = x;
                token.y = y;
                true
            }
            None => {
                tracing::debug!(id = %token_id, "move for unknown token ignored");
                false
            }
        }
    }

    /// Removes every token.
    pub fn clear_tokens(&mut self) {
        self.tokens.clear();
    }

    /// Tokens in id order.
    #[must_use]
    pub fn tokens(&self) -> impl Iterator<Item = &TokenState> {
        self.tokens.values()
    }

    /// Applies a commutative stat delta. The caller has already validated
    /// that the participant exists.
    pub fn apply_stat_delta(&mut self, participant_id: Uuid, stat: &str, delta: i32) {
        let entry = self
            .stats
            .entry(participant_id)
            .or_default()
            .entry(stat.to_owned())
            .or_insert(0);
        *entry = entry.saturating_add(delta);
    }

    /// Current value of a stat, zero if never touched.
    #[must_use]
    pub fn stat(&self, participant_id: Uuid, stat: &str) -> i32 {
        self.stats
            .get(&participant_id)
            .and_then(|s| s.get(stat))
            .copied()
            .unwrap_or(0)
    }

    /// Updates a participant's transient cursor position.
    pub fn set_cursor(&mut self, participant_id: Uuid, x: f32, y: f32) {
        self.cursors.insert(participant_id, (x, y));
    }

    /// A participant's last known cursor position.
    #[must_use]
    pub fn cursor(&self, participant_id: Uuid) -> Option<(f32, f32)> {
        self.cursors.get(&participant_id).copied()
    }

    /// Drops presence state for a departed participant.
    pub fn forget_participant(&mut self, participant_id: Uuid) {
        self.cursors.remove(&participant_id);
    }
}
