//! In-memory order store

use std::collections::BTreeMap;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Order, OrderStatus};
use crate::ports::store::{OrderStore, RosterStore, StoreError};

/// Orders keyed by id, the id counter and the saved operator roster
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct OrderTable {
    pub last_id: u64,
    pub orders: BTreeMap<u64, Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<i64>>,
}

impl OrderTable {
    pub fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    pub fn insert(&mut self, mut order: Order) -> Result<Order, StoreError> {
        if self.orders.contains_key(&order.id) {
            return Err(StoreError::Duplicate(order.id));
        }
        self.last_id = self.last_id.max(order.id);
        order.version = 1;
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    pub fn find_by_personal_id(&self, personal_id: &str) -> Option<Order> {
        self.orders
            .values()
            .find(|o| o.personal_id == personal_id)
            .cloned()
    }

    pub fn list_by_status(&self, statuses: &[OrderStatus]) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|o| statuses.contains(&o.status))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }

    /// Compare-and-swap on `version`
    pub fn update(&mut self, order: &Order) -> Result<Order, StoreError> {
        let stored = self
            .orders
            .get_mut(&order.id)
            .ok_or(StoreError::NotFound(order.id))?;

        if stored.version != order.version {
            return Err(StoreError::VersionConflict {
                id: order.id,
                expected: order.version,
                found: stored.version,
            });
        }

        let mut updated = order.clone();
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }
}

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    table: RwLock<OrderTable>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn next_id(&self) -> Result<u64, StoreError> {
        Ok(self.table.write().await.next_id())
    }

    async fn insert(&self, order: Order) -> Result<Order, StoreError> {
        self.table.write().await.insert(order)
    }

    async fn get(&self, id: u64) -> Result<Option<Order>, StoreError> {
        Ok(self.table.read().await.orders.get(&id).cloned())
    }

    async fn find_by_personal_id(&self, personal_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.table.read().await.find_by_personal_id(personal_id))
    }

    async fn list_by_status(&self, statuses: &[OrderStatus]) -> Result<Vec<Order>, StoreError> {
        Ok(self.table.read().await.list_by_status(statuses))
    }

    async fn update(&self, order: &Order) -> Result<Order, StoreError> {
        self.table.write().await.update(order)
    }
}

#[async_trait]
impl RosterStore for MemoryOrderStore {
    async fn load_operators(&self) -> Result<Option<Vec<i64>>, StoreError> {
        Ok(self.table.read().await.operators.clone())
    }

    async fn save_operators(&self, operators: &[i64]) -> Result<(), StoreError> {
        self.table.write().await.operators = Some(operators.to_vec());
        Ok(())
    }
}
