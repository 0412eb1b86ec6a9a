//! JSON File Order Store
//!
//! Keeps the order table in memory and rewrites the whole file after every
//! mutation, so a restart picks up where the bot left off.

use std::fs;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Order, OrderStatus};
use crate::ports::store::{OrderStore, RosterStore, StoreError};
use super::memory::OrderTable;

/// Default order file name
pub const DEFAULT_ORDER_FILE: &str = "orders.json";

#[derive(Debug)]
pub struct JsonOrderStore {
    path: PathBuf,
    table: Mutex<OrderTable>,
}

impl JsonOrderStore {
    /// Open an existing order file, or start empty when there is none
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = Self::load(&path)?;

        tracing::info!(
            "Order store opened: {} ({} orders)",
            path.display(),
            table.orders.len()
        );

        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    fn load(path: &Path) -> Result<OrderTable, StoreError> {
        if !path.exists() {
            return Ok(OrderTable::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| StoreError::ReadError(e.to_string()))?;

        if content.trim().is_empty() {
            return Ok(OrderTable::default());
        }

        serde_json::from_str(&content)
            .map_err(|e| StoreError::SerializationError(e.to_string()))
    }

    /// Write to a sibling temp file, then rename over the original
    fn flush(&self, table: &OrderTable) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::WriteError(e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(table)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| StoreError::WriteError(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::WriteError(e.to_string()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OrderStore for JsonOrderStore {
    async fn next_id(&self) -> Result<u64, StoreError> {
        let mut table = self.table.lock().await;
        let id = table.next_id();
        self.flush(&table)?;
        Ok(id)
    }

    async fn insert(&self, order: Order) -> Result<Order, StoreError> {
        let mut table = self.table.lock().await;
        let order = table.insert(order)?;
        self.flush(&table)?;
        Ok(order)
    }

    async fn get(&self, id: u64) -> Result<Option<Order>, StoreError> {
        Ok(self.table.lock().await.orders.get(&id).cloned())
    }

    async fn find_by_personal_id(&self, personal_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.table.lock().await.find_by_personal_id(personal_id))
    }

    async fn list_by_status(&self, statuses: &[OrderStatus]) -> Result<Vec<Order>, StoreError> {
        Ok(self.table.lock().await.list_by_status(statuses))
    }

    async fn update(&self, order: &Order) -> Result<Order, StoreError> {
        let mut table = self.table.lock().await;
        let updated = table.update(order)?;
        self.flush(&table)?;
        Ok(updated)
    }
}

#[async_trait]
impl RosterStore for JsonOrderStore {
    async fn load_operators(&self) -> Result<Option<Vec<i64>>, StoreError> {
        Ok(self.table.lock().await.operators.clone())
    }

    async fn save_operators(&self, operators: &[i64]) -> Result<(), StoreError> {
        let mut table = self.table.lock().await;
        table.operators = Some(operators.to_vec());
        self.flush(&table)
    }
}
