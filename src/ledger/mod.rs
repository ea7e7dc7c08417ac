//! Durable delivery ledger.
//!
//! Append-only record of every delivery attempt. The `sent` subset for an
//! event, read once per run, is what makes re-runs idempotent.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::types::{normalize_email, DeliveryAttempt, DeliveryStatus};

/// Append/query interface over the delivery-attempt history.
#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    /// Appends one immutable attempt row.
    async fn append(&self, attempt: DeliveryAttempt) -> Result<(), StoreError>;

    /// All attempts recorded for an event, in append order.
    async fn by_event(&self, event_id: &str) -> Result<Vec<DeliveryAttempt>, StoreError>;

    /// Normalized emails with at least one `sent` row for an event.
    async fn sent_emails(&self, event_id: &str) -> Result<HashSet<String>, StoreError> {
        let attempts = self.by_event(event_id).await?;
        Ok(attempts
            .into_iter()
            .filter(|a| a.status == DeliveryStatus::Sent)
            .map(|a| normalize_email(&a.email))
            .collect())
    }
}

/// In-memory ledger for tests and embedded use.
#[derive(Default)]
pub struct InMemoryLedger {
    rows: Mutex<Vec<DeliveryAttempt>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row, in append order.
    pub fn rows(&self) -> Vec<DeliveryAttempt> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DeliveryLedger for InMemoryLedger {
    async fn append(&self, attempt: DeliveryAttempt) -> Result<(), StoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::append("ledger mutex poisoned"))?;
        rows.push(attempt);
        Ok(())
    }

    async fn by_event(&self, event_id: &str) -> Result<Vec<DeliveryAttempt>, StoreError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::read("ledger mutex poisoned"))?;
        Ok(rows.iter().filter(|a| a.event_id == event_id).cloned().collect())
    }
}
