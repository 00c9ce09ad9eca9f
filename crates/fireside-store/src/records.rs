//! Row DTOs bridging session state and stored records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use fireside_core::store::{Record, Table};
use fireside_protocol::model::{ChatMessage, Participant, SessionMeta};
use fireside_session::board::TokenState;

/// A persisted session row. The payload is the session metadata itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    /// Session metadata.
    #[serde(flatten)]
    pub meta: SessionMeta,
}

impl SessionRow {
    /// Builds the stored record, keyed by session id.
    #[must_use]
    pub fn to_record(&self, now: DateTime<Utc>) -> Record {
        Record {
            table: Table::Sessions,
            key: self.meta.id,
            data: serde_json::to_value(self).expect("row serialization is infallible"),
            updated_at: now,
        }
    }

    /// Decodes a stored record; `None` (with a debug log) on shape
    /// mismatch, never an error — a bad row must not break bootstrap.
    #[must_use]
    pub fn from_record(record: &Record) -> Option<Self> {
        decode(record)
    }
}

/// A persisted participant row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRow {
    /// The session this participant belongs to.
    pub session_id: Uuid,
    /// The participant.
    #[serde(flatten)]
    pub participant: Participant,
}

impl ParticipantRow {
    /// Builds the stored record, keyed by participant id.
    #[must_use]
    pub fn to_record(&self, now: DateTime<Utc>) -> Record {
        Record {
            table: Table::Participants,
            key: self.participant.id,
            data: serde_json::to_value(self).expect("row serialization is infallible"),
            updated_at: now,
        }
    }

    /// Decodes a stored record.
    #[must_use]
    pub fn from_record(record: &Record) -> Option<Self> {
        decode(record)
    }
}

/// A persisted chat event row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRow {
    /// The session this message belongs to.
    pub session_id: Uuid,
    /// The message.
    #[serde(flatten)]
    pub message: ChatMessage,
}

impl ChatRow {
    /// Builds the stored record, keyed by message id.
    #[must_use]
    pub fn to_record(&self, now: DateTime<Utc>) -> Record {
        Record {
            table: Table::ChatEvents,
            key: self.message.id,
            data: serde_json::to_value(self).expect("row serialization is infallible"),
            updated_at: now,
        }
    }

    /// Decodes a stored record.
    #[must_use]
    pub fn from_record(record: &Record) -> Option<Self> {
        decode(record)
    }
}

/// A persisted token row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRow {
    /// The session this token belongs to.
    pub session_id: Uuid,
    /// Token identity.
    pub token_id: Uuid,
    /// Token label.
    pub label: String,
    /// Board x.
    pub x: f32,
    /// Board y.
    pub y: f32,
}

impl TokenRow {
    /// Builds a row from board state.
    #[must_use]
    pub fn from_token(session_id: Uuid, token: &TokenState) -> Self {
        Self {
            session_id,
            token_id: token.id,
            label: token.label.clone(),
            x: token.x,
            y: token.y,
        }
    }

    /// The board-state form of this row.
    #[must_use]
    pub fn into_token(self) -> TokenState {
        TokenState {
            id: self.token_id,
            label: self.label,
            x: self.x,
            y: self.y,
        }
    }

    /// Builds the stored record, keyed by token id.
    #[must_use]
    pub fn to_record(&self, now: DateTime<Utc>) -> Record {
        Record {
            table: Table::Tokens,
            key: self.token_id,
            data: serde_json::to_value(self).expect("row serialization is infallible"),
            updated_at: now,
        }
    }

    /// Decodes a stored record.
    #[must_use]
    pub fn from_record(record: &Record) -> Option<Self> {
        decode(record)
    }
}

/// The filter value selecting every row of one session.
#[must_use]
pub fn session_filter(session_id: Uuid) -> fireside_core::store::Filter {
    fireside_core::store::Filter::all().eq("session_id", json!(session_id))
}

fn decode<T: serde::de::DeserializeOwned>(record: &Record) -> Option<T> {
    match serde_json::from_value(record.data.clone()) {
        Ok(row) => Some(row),
        Err(err) => {
            tracing::debug!(key = %record.key, error = %err, "skipping malformed record");
            None
        }
    }
}
