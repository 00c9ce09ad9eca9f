//! In-memory record store, for local play and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use fireside_core::error::EngineError;
use fireside_core::store::{ChangeKind, Filter, Record, RecordChange, RecordStore, Table};

/// A `RecordStore` kept entirely in process memory.
///
/// Same visible semantics as the PostgreSQL backend: keyed rows,
/// last-write-wins upsert, equality-filtered select, per-table change
/// feed. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    rows: Mutex<HashMap<Table, HashMap<Uuid, Record>>>,
    watchers: Mutex<HashMap<Table, Vec<mpsc::Sender<RecordChange>>>>,
}

impl MemoryRecordStore {
    /// Fresh empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, kind: ChangeKind, record: &Record) {
        let mut watchers = self.watchers.lock().unwrap();
        if let Some(senders) = watchers.get_mut(&record.table) {
            senders.retain(|sender| {
                sender
                    .try_send(RecordChange {
                        kind,
                        record: record.clone(),
                    })
                    .is_ok()
            });
        }
    }
}

fn matches(record: &Record, filter: &Filter) -> bool {
    filter
        .conditions()
        .iter()
        .all(|(field, value)| record.data.get(field) == Some(value))
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: Record) -> Result<(), EngineError> {
        {
            let mut rows = self.rows.lock().unwrap();
            let table = rows.entry(record.table).or_default();
            if table.contains_key(&record.key) {
                return Err(EngineError::Store(format!(
                    "duplicate key {} in {}",
                    record.key,
                    record.table.as_str()
                )));
            }
            table.insert(record.key, record.clone());
        }
        self.notify(ChangeKind::Inserted, &record);
        Ok(())
    }

    async fn update(&self, record: Record) -> Result<(), EngineError> {
        {
            let mut rows = self.rows.lock().unwrap();
            let table = rows.entry(record.table).or_default();
            if !table.contains_key(&record.key) {
                return Err(EngineError::Store(format!(
                    "missing key {} in {}",
                    record.key,
                    record.table.as_str()
                )));
            }
            table.insert(record.key, record.clone());
        }
        self.notify(ChangeKind::Updated, &record);
        Ok(())
    }

    async fn upsert(&self, record: Record) -> Result<(), EngineError> {
        let kind = {
            let mut rows = self.rows.lock().unwrap();
            let table = rows.entry(record.table).or_default();
            let kind = if table.contains_key(&record.key) {
                ChangeKind::Updated
            } else {
                ChangeKind::Inserted
            };
            table.insert(record.key, record.clone());
            kind
        };
        self.notify(kind, &record);
        Ok(())
    }

    async fn delete(&self, table: Table, key: Uuid) -> Result<(), EngineError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(table_rows) = rows.get_mut(&table) {
            table_rows.remove(&key);
        }
        Ok(())
    }

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Record>, EngineError> {
        let rows = self.rows.lock().unwrap();
        let mut found: Vec<Record> = rows
            .get(&table)
            .map(|rows| {
                rows.values()
                    .filter(|record| matches(record, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        found.sort_by_key(|record| record.updated_at);
        Ok(found)
    }

    async fn watch(&self, table: Table) -> Result<mpsc::Receiver<RecordChange>, EngineError> {
        let (tx, rx) = mpsc::channel(64);
        self.watchers.lock().unwrap().entry(table).or_default().push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn record(table: Table, key: Uuid, data: serde_json::Value) -> Record {
        Record {
            table,
            key,
            data,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_keys() {
        let store = MemoryRecordStore::new();
        let key = Uuid::new_v4();

        store
            .insert(record(Table::Tokens, key, json!({"label": "a"})))
            .await
            .unwrap();
        let second = store
            .insert(record(Table::Tokens, key, json!({"label": "b"})))
            .await;

        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let store = MemoryRecordStore::new();
        let key = Uuid::new_v4();

        store
            .upsert(record(Table::Tokens, key, json!({"x": 1})))
            .await
            .unwrap();
        store
            .upsert(record(Table::Tokens, key, json!({"x": 2})))
            .await
            .unwrap();

        let rows = store.select(Table::Tokens, &Filter::all()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data["x"], 2);
    }

    #[tokio::test]
    async fn test_select_applies_equality_filter() {
        let store = MemoryRecordStore::new();
        let session = Uuid::new_v4();
        store
            .upsert(record(
                Table::ChatEvents,
                Uuid::new_v4(),
                json!({"session_id": session, "text": "in"}),
            ))
            .await
            .unwrap();
        store
            .upsert(record(
                Table::ChatEvents,
                Uuid::new_v4(),
                json!({"session_id": Uuid::new_v4(), "text": "out"}),
            ))
            .await
            .unwrap();

        let rows = store
            .select(
                Table::ChatEvents,
                &Filter::all().eq("session_id", json!(session)),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data["text"], "in");
    }

    #[tokio::test]
    async fn test_watch_sees_changes() {
        let store = MemoryRecordStore::new();
        let mut feed = store.watch(Table::Sessions).await.unwrap();

        store
            .upsert(record(Table::Sessions, Uuid::new_v4(), json!({"status": "waiting"})))
            .await
            .unwrap();

        let change = feed.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Inserted);
        assert_eq!(change.record.data["status"], "waiting");
    }
}
