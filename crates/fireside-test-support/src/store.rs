//! Record store doubles.

use async_trait::async_trait;
use fireside_core::error::EngineError;
use fireside_core::store::{Filter, Record, RecordChange, RecordStore, Table};
use tokio::sync::mpsc;
use uuid::Uuid;

/// A record store whose every operation fails, for exercising the
/// write-behind failure policy: logged, never propagated, never rolled
/// back.
#[derive(Debug, Default)]
pub struct FailingRecordStore;

fn refused() -> EngineError {
    EngineError::Store("connection refused".to_owned())
}

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn insert(&self, _record: Record) -> Result<(), EngineError> {
        Err(refused())
    }

    async fn update(&self, _record: Record) -> Result<(), EngineError> {
        Err(refused())
    }

    async fn upsert(&self, _record: Record) -> Result<(), EngineError> {
        Err(refused())
    }

    async fn delete(&self, _table: Table, _key: Uuid) -> Result<(), EngineError> {
        Err(refused())
    }

    async fn select(&self, _table: Table, _filter: &Filter) -> Result<Vec<Record>, EngineError> {
        Err(refused())
    }

    async fn watch(&self, _table: Table) -> Result<mpsc::Receiver<RecordChange>, EngineError> {
        Err(refused())
    }
}
