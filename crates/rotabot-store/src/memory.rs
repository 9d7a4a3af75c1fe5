//! In-memory history store for tests.
//!
//! Same contract as the SQLite backend, plus an injectable fault so
//! callers can exercise their store-error paths.

use async_trait::async_trait;
use tokio::sync::RwLock;

use rotabot_core::error::{Result, RotaBotError};
use rotabot_core::traits::HistoryStore;
use rotabot_core::types::HistoryRecord;

/// Which store fault the next calls should surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Fault {
    #[default]
    None,
    Unavailable,
    Throttled,
    Internal,
}

#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
    fault: RwLock<Fault>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records.
    pub fn with_records(records: Vec<HistoryRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            fault: RwLock::new(Fault::None),
        }
    }

    /// All subsequent scan/put calls fail with the given fault until
    /// cleared with `Fault::None`.
    pub async fn inject_fault(&self, fault: Fault) {
        *self.fault.write().await = fault;
    }

    async fn check_fault(&self) -> Result<()> {
        match *self.fault.read().await {
            Fault::None => Ok(()),
            Fault::Unavailable => Err(RotaBotError::StoreUnavailable("injected".into())),
            Fault::Throttled => Err(RotaBotError::StoreThrottled("injected".into())),
            Fault::Internal => Err(RotaBotError::StoreInternal("injected".into())),
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn scan_all(&self) -> Result<Vec<HistoryRecord>> {
        self.check_fault().await?;
        Ok(self.records.read().await.clone())
    }

    async fn put(&self, record: HistoryRecord) -> Result<()> {
        self.check_fault().await?;
        self.records.write().await.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_put_and_scan() {
        let store = InMemoryHistoryStore::new();
        store
            .put(HistoryRecord::new("RC", "sc", Utc::now()))
            .await
            .unwrap();
        assert_eq!(store.scan_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fault_injection_and_clear() {
        let store = InMemoryHistoryStore::new();
        store.inject_fault(Fault::Throttled).await;
        assert!(matches!(
            store.scan_all().await,
            Err(RotaBotError::StoreThrottled(_))
        ));

        store.inject_fault(Fault::None).await;
        assert!(store.scan_all().await.is_ok());
    }
}
