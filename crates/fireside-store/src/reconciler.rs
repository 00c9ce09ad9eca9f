//! Write-behind persistence and bootstrap loading.
//!
//! Every durable mutation follows three independent, explicitly-ordered
//! steps: apply locally, broadcast, write behind. This module is step
//! three — a spawned, logged, best-effort write that never blocks the live
//! protocol and never rolls back the mutation it trails. Bootstrap is the
//! inverse: a reloading client reads everything from the store (the
//! transport has no replay) and only then joins the live stream.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use fireside_core::clock::Clock;
use fireside_core::error::EngineError;
use fireside_core::store::{Filter, Record, RecordStore, Table};
use fireside_protocol::model::{ChatMessage, Participant, SessionMeta, SessionStatus};
use fireside_session::board::TokenState;
use fireside_session::state::SessionState;

use crate::records::{ChatRow, ParticipantRow, SessionRow, TokenRow, session_filter};

/// Issues write-behind persistence and bootstrap reads.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    /// Creates a reconciler over a store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Persists session metadata (status, capacity, GM mode).
    pub fn persist_session(&self, meta: &SessionMeta) {
        let row = SessionRow { meta: meta.clone() };
        self.write_behind(row.to_record(self.clock.now()));
    }

    /// Persists a participant (including the ready flag).
    pub fn persist_participant(&self, session_id: Uuid, participant: &Participant) {
        let row = ParticipantRow {
            session_id,
            participant: participant.clone(),
        };
        self.write_behind(row.to_record(self.clock.now()));
    }

    /// Persists a chat event.
    pub fn persist_chat(&self, session_id: Uuid, message: &ChatMessage) {
        let row = ChatRow {
            session_id,
            message: message.clone(),
        };
        self.write_behind(row.to_record(self.clock.now()));
    }

    /// Persists a token position.
    pub fn persist_token(&self, session_id: Uuid, token: &TokenState) {
        let row = TokenRow::from_token(session_id, token);
        self.write_behind(row.to_record(self.clock.now()));
    }

    /// Fires one asynchronous last-write-wins upsert. Failure is logged
    /// and does not surface: the local mutation and broadcast already
    /// happened and stay as they are.
    pub fn write_behind(&self, record: Record) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(err) = store.upsert(record).await {
                tracing::warn!(error = %err, "write-behind persistence failed");
            }
        });
    }

    /// Fires one asynchronous row removal, same failure policy as
    /// [`Self::write_behind`]. Used when a participant leaves or the board
    /// is cleared.
    pub fn remove_behind(&self, table: Table, key: Uuid) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(err) = store.delete(table, key).await {
                tracing::warn!(error = %err, "write-behind removal failed");
            }
        });
    }

    /// Loads a full session view from the store for a late joiner or a
    /// reloading client. A saved session reopens in the lobby.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` when the session row is missing or the
    /// backend fails; individual malformed rows are skipped, not fatal.
    pub async fn bootstrap(&self, session_id: Uuid) -> Result<SessionState, EngineError> {
        let sessions = self
            .store
            .select(Table::Sessions, &Filter::all().eq("id", json!(session_id)))
            .await?;
        let mut meta = sessions
            .first()
            .and_then(SessionRow::from_record)
            .map(|row| row.meta)
            .ok_or_else(|| EngineError::Store(format!("unknown session {session_id}")))?;

        // A quorum exit saved the session; reloading it reopens the lobby.
        if meta.status == SessionStatus::Saved {
            meta.status = SessionStatus::Waiting;
        }

        let mut state = SessionState::new(meta);

        let participants = self
            .store
            .select(Table::Participants, &session_filter(session_id))
            .await?;
        for record in &participants {
            if let Some(row) = ParticipantRow::from_record(record) {
                state
                    .roster
                    .join(row.participant, state.meta.max_participants);
            }
        }

        let mut chat_rows: Vec<ChatRow> = self
            .store
            .select(Table::ChatEvents, &session_filter(session_id))
            .await?
            .iter()
            .filter_map(ChatRow::from_record)
            .collect();
        chat_rows.sort_by_key(|row| row.message.sent_at);
        for row in chat_rows {
            state.chat.push(row.message);
        }

        let tokens = self
            .store
            .select(Table::Tokens, &session_filter(session_id))
            .await?;
        for record in &tokens {
            if let Some(row) = TokenRow::from_record(record) {
                state.board.spawn_token(row.into_token());
            }
        }

        tracing::info!(
            %session_id,
            participants = state.roster.len(),
            messages = state.chat.messages().len(),
            "session bootstrapped from store"
        );
        Ok(state)
    }
}
