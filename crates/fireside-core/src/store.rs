//! Durable record store abstraction.
//!
//! A keyed record store with insert/update/upsert, equality-filtered
//! select, and a change feed keyed by table. The live protocol never waits
//! on it: writes are issued behind already-applied mutations, and reads
//! happen only when a client bootstraps after load or reload.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::EngineError;

/// The tables the engine persists into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Session rows (status, host, capacity).
    Sessions,
    /// Participant rows (name, role, ready flag).
    Participants,
    /// Chat event rows.
    ChatEvents,
    /// Token board rows.
    Tokens,
}

impl Table {
    /// Returns the table name used by storage backends.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sessions => "sessions",
            Self::Participants => "participants",
            Self::ChatEvents => "chat_events",
            Self::Tokens => "tokens",
        }
    }
}

/// A stored row: a key plus a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The table this record belongs to.
    pub table: Table,
    /// Row key.
    pub key: Uuid,
    /// Row payload.
    pub data: Value,
    /// Last write time, set by the caller.
    pub updated_at: DateTime<Utc>,
}

/// An equality filter over record payload fields.
///
/// Backends interpret each `(field, value)` pair as `data.field == value`;
/// an empty filter matches every row of the table.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    fields: Vec<(String, Value)>,
}

impl Filter {
    /// An empty filter matching all rows.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds an equality condition on a payload field.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.push((field.into(), value));
        self
    }

    /// Returns the conditions in insertion order.
    #[must_use]
    pub fn conditions(&self) -> &[(String, Value)] {
        &self.fields
    }
}

/// Kind of mutation a change-feed entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A row was created.
    Inserted,
    /// An existing row was overwritten.
    Updated,
}

/// One entry of the change feed.
#[derive(Debug, Clone)]
pub struct RecordChange {
    /// What happened.
    pub kind: ChangeKind,
    /// The record after the mutation.
    pub record: Record,
}

/// Durable record store consumed by the persistence reconciler.
///
/// Conflict policy is last-write-wins at the row level; there is no merge.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new row. Fails if the key already exists.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` on backend failure or key conflict.
    async fn insert(&self, record: Record) -> Result<(), EngineError>;

    /// Update an existing row. Fails if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` on backend failure or missing key.
    async fn update(&self, record: Record) -> Result<(), EngineError>;

    /// Insert or overwrite a row (last write wins).
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` on backend failure.
    async fn upsert(&self, record: Record) -> Result<(), EngineError>;

    /// Remove a row. Missing keys are not an error — a delete races its
    /// own write-behind insert and either order must converge.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` on backend failure.
    async fn delete(&self, table: Table, key: Uuid) -> Result<(), EngineError>;

    /// Select rows of a table matching an equality filter.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` on backend failure.
    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Record>, EngineError>;

    /// Subscribe to mutations of a table made through this store.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the feed could not be established.
    async fn watch(&self, table: Table) -> Result<mpsc::Receiver<RecordChange>, EngineError>;
}
