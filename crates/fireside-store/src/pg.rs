//! `PostgreSQL` implementation of the `RecordStore` trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use tokio::sync::mpsc;
use uuid::Uuid;

use fireside_core::error::EngineError;
use fireside_core::store::{ChangeKind, Filter, Record, RecordChange, RecordStore, Table};

/// PostgreSQL-backed record store.
///
/// One generic `records` table keyed by `(table_name, key)` with a JSONB
/// payload; equality filters become JSONB containment. The change feed is
/// fanned out in process, per store handle — peers observe each other's
/// writes through the broadcast protocol, not through this feed.
#[derive(Debug)]
pub struct PgRecordStore {
    pool: PgPool,
    watchers: Mutex<HashMap<Table, Vec<mpsc::Sender<RecordChange>>>>,
}

impl PgRecordStore {
    /// Creates a new `PgRecordStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            watchers: Mutex::new(HashMap::new()),
        }
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

fn store_err(err: sqlx::Error) -> EngineError {
    EngineError::Store(err.to_string())
}

fn containment(filter: &Filter) -> Value {
    let mut object = serde_json::Map::new();
    for (field, value) in filter.conditions() {
        object.insert(field.clone(), value.clone());
    }
    Value::Object(object)
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, record: Record) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO records (table_name, key, data, updated_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(record.table.as_str())
        .bind(record.key)
        .bind(&record.data)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        self.notify(ChangeKind::Inserted, &record);
        Ok(())
    }

    async fn update(&self, record: Record) -> Result<(), EngineError> {
        let result = sqlx::query(
            "UPDATE records SET data = $3, updated_at = $4 WHERE table_name = $1 AND key = $2",
        )
        .bind(record.table.as_str())
        .bind(record.key)
        .bind(&record.data)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(EngineError::Store(format!(
                "missing key {} in {}",
                record.key,
                record.table.as_str()
            )));
        }
        self.notify(ChangeKind::Updated, &record);
        Ok(())
    }

    async fn upsert(&self, record: Record) -> Result<(), EngineError> {
        // `xmax = 0` distinguishes a fresh insert from a conflict update.
        let row = sqlx::query(
            "INSERT INTO records (table_name, key, data, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (table_name, key)
             DO UPDATE SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
             RETURNING (xmax = 0) AS inserted",
        )
        .bind(record.table.as_str())
        .bind(record.key)
        .bind(&record.data)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        let inserted: bool = row.get("inserted");
        let kind = if inserted {
            ChangeKind::Inserted
        } else {
            ChangeKind::Updated
        };
        self.notify(kind, &record);
        Ok(())
    }

    async fn delete(&self, table: Table, key: Uuid) -> Result<(), EngineError> {
        sqlx::query("DELETE FROM records WHERE table_name = $1 AND key = $2")
            .bind(table.as_str())
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Record>, EngineError> {
        let rows = sqlx::query(
            "SELECT key, data, updated_at FROM records
             WHERE table_name = $1 AND data @> $2
             ORDER BY updated_at",
        )
        .bind(table.as_str())
        .bind(containment(filter))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(rows
            .into_iter()
            .map(|row| Record {
                table,
                key: row.get::<Uuid, _>("key"),
                data: row.get::<Value, _>("data"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    async fn watch(&self, table: Table) -> Result<mpsc::Receiver<RecordChange>, EngineError> {
        let (tx, rx) = mpsc::channel(64);
        self.watchers.lock().unwrap().entry(table).or_default().push(tx);
        Ok(rx)
    }
}
