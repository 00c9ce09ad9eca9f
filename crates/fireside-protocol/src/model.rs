//! Shared wire and domain DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fixed set of dice the table supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiceKind {
    /// Four-sided die.
    D4,
    /// Six-sided die.
    D6,
    /// Eight-sided die.
    D8,
    /// Ten-sided die.
    D10,
    /// Twelve-sided die.
    D12,
    /// Twenty-sided die.
    D20,
    /// Percentile die.
    D100,
}

impl DiceKind {
    /// Number of faces.
    #[must_use]
    pub const fn faces(self) -> u32 {
        match self {
            Self::D4 => 4,
            Self::D6 => 6,
            Self::D8 => 8,
            Self::D10 => 10,
            Self::D12 => 12,
            Self::D20 => 20,
            Self::D100 => 100,
        }
    }

    /// Canonical uppercase name (`"D20"`), as used in dice directives.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::D4 => "D4",
            Self::D6 => "D6",
            Self::D8 => "D8",
            Self::D10 => "D10",
            Self::D12 => "D12",
            Self::D20 => "D20",
            Self::D100 => "D100",
        }
    }

    /// Parses a directive token (case-insensitive) into a kind.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "D4" => Some(Self::D4),
            "D6" => Some(Self::D6),
            "D8" => Some(Self::D8),
            "D10" => Some(Self::D10),
            "D12" => Some(Self::D12),
            "D20" => Some(Self::D20),
            "D100" => Some(Self::D100),
            _ => None,
        }
    }
}

/// Who a forced roll targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollTargets {
    /// Every non-GM participant.
    All,
    /// The named participants, by display name.
    Named(Vec<String>),
}

/// Chat channel a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatChannel {
    /// Player-to-player chatter; does not consume a turn.
    Party,
    /// The GM-facing channel.
    Gm,
}

/// Kind of chat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// A participant-authored message.
    Player,
    /// A narration turn.
    Narrator,
    /// An engine-authored status line.
    System,
}

/// An immutable chat event. Identity is minted client-side at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Globally unique message id.
    pub id: Uuid,
    /// The authoring participant.
    pub sender_id: Uuid,
    /// Channel the message was sent on.
    pub channel: ChatChannel,
    /// Author kind.
    pub kind: ChatKind,
    /// Message body.
    pub text: String,
    /// Creation time on the authoring client.
    pub sent_at: DateTime<Utc>,
}

/// Participant role within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The session creator.
    Host,
    /// A playing participant.
    Player,
    /// A non-playing observer.
    Spectator,
}

/// A human attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant identity.
    pub id: Uuid,
    /// Display name shown at the table.
    pub display_name: String,
    /// Readiness flag, mutable only by its owner.
    pub ready: bool,
    /// Role within the session.
    pub role: Role,
}

impl Participant {
    /// Whether the participant counts as ready. The host is implicitly
    /// ready regardless of the flag.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.role, Role::Host) || self.ready
    }
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Lobby open, not yet started.
    Waiting,
    /// Live play.
    Playing,
    /// Saved by a passed exit vote.
    Saved,
}

/// Who narrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GmKind {
    /// AI-driven narration.
    Ai,
    /// A human participant narrates.
    Human,
}

/// Session metadata shared by every client's local view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Session identity (the "room").
    pub id: Uuid,
    /// Host participant identity.
    pub host_id: Uuid,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Narration mode.
    pub gm_kind: GmKind,
    /// Maximum participant count, including the host.
    pub max_participants: usize,
}

/// One signal of the pause/exit-vote protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteSignal {
    /// Opens a vote.
    Start {
        /// Who opened it.
        initiator: Uuid,
    },
    /// Casts a ballot.
    Cast {
        /// Who voted.
        voter: Uuid,
        /// Yes or no.
        approve: bool,
    },
    /// Withdraws the vote. Only honored from the initiator.
    Cancel {
        /// Who asked to cancel.
        by: Uuid,
    },
}
