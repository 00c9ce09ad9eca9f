//! Chat log and the single-narration-in-flight invariant.

use uuid::Uuid;

use fireside_protocol::model::{ChatKind, ChatMessage};

/// Ordered chat history for a session.
///
/// Messages are immutable once pushed. At most one narrator message may be
/// "in flight" (being incrementally revealed on the authoring client) at a
/// time; a second narration cannot start until the first completes or is
/// superseded.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    events: Vec<ChatMessage>,
    inflight_narration: Option<Uuid>,
}

impl ChatLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message. A message whose id is already present is a
    /// no-op — ids are minted client-side exactly so replays are cheap to
    /// drop.
    pub fn push(&mut self, message: ChatMessage) -> bool {
        if self.events.iter().any(|m| m.id == message.id) {
            tracing::debug!(id = %message.id, "duplicate chat event ignored");
            return false;
        }
        self.events.push(message);
        true
    }

    /// Marks a narration as in flight. Fails (returning `false`) while
    /// another narration is still revealing, unless `supersede` is set.
    pub fn begin_narration(&mut self, message_id: Uuid, supersede: bool) -> bool {
        match self.inflight_narration {
            Some(current) if !supersede => {
                tracing::debug!(%current, "narration already in flight");
                false
            }
            _ => {
                self.inflight_narration = Some(message_id);
                true
            }
        }
    }

    /// Clears the in-flight marker once the reveal finishes. Ids that are
    /// not the in-flight narration are a no-op.
    pub fn finish_narration(&mut self, message_id: Uuid) {
        if self.inflight_narration == Some(message_id) {
            self.inflight_narration = None;
        }
    }

    /// The narration currently being revealed, if any.
    #[must_use]
    pub fn inflight_narration(&self) -> Option<Uuid> {
        self.inflight_narration
    }

    /// All messages in arrival order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.events
    }

    /// Whether any narration has ever landed. Gates the automatic priming
    /// turn at session start.
    #[must_use]
    pub fn has_narration(&self) -> bool {
        self.events.iter().any(|m| m.kind == ChatKind::Narrator)
    }
}
