//! Order Store Port
//!
//! Flat key-by-id order records. Writes are optimistic: `update` only succeeds
//! when the caller saw the latest version.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Order, OrderStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Order {0} not found")]
    NotFound(u64),

    #[error("Order {0} already exists")]
    Duplicate(u64),

    #[error("Order {id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict { id: u64, expected: u64, found: u64 },

    #[error("Failed to serialize orders: {0}")]
    SerializationError(String),

    #[error("Failed to write order file: {0}")]
    WriteError(String),

    #[error("Failed to read order file: {0}")]
    ReadError(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Reserve the next order id
    async fn next_id(&self) -> Result<u64, StoreError>;

    /// Persist a freshly created order
    async fn insert(&self, order: Order) -> Result<Order, StoreError>;

    async fn get(&self, id: u64) -> Result<Option<Order>, StoreError>;

    async fn find_by_personal_id(&self, personal_id: &str) -> Result<Option<Order>, StoreError>;

    /// Orders in any of the given statuses, oldest first
    async fn list_by_status(&self, statuses: &[OrderStatus]) -> Result<Vec<Order>, StoreError>;

    /// Write back `order`; fails with `VersionConflict` when `order.version` is stale.
    /// Returns the stored record with its bumped version.
    async fn update(&self, order: &Order) -> Result<Order, StoreError>;
}

/// Operator ids the admin manages at runtime
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// `None` until the admin changes the roster for the first time
    async fn load_operators(&self) -> Result<Option<Vec<i64>>, StoreError>;

    async fn save_operators(&self, operators: &[i64]) -> Result<(), StoreError>;
}

/// Read order `id`, apply `change` and write it back. On a version conflict the
/// order is re-read and `change` re-applied, at most `max_retries` more times.
pub async fn update_with_retry<T, E, F>(
    store: &dyn OrderStore,
    id: u64,
    max_retries: usize,
    mut change: F,
) -> Result<(Order, T), E>
where
    F: FnMut(&mut Order) -> Result<T, E> + Send,
    T: Send,
    E: From<StoreError> + Send,
{
    let mut attempt = 0;
    loop {
        let mut order = store.get(id).await?.ok_or(StoreError::NotFound(id))?;
        let output = change(&mut order)?;

        match store.update(&order).await {
            Ok(saved) => return Ok((saved, output)),
            Err(StoreError::VersionConflict { expected, found, .. }) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    "Order {} changed underneath us (v{} vs v{}), retry {}/{}",
                    id,
                    expected,
                    found,
                    attempt,
                    max_retries
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
}
