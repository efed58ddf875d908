//! # Order Directory Port
//!
//! The dispute subsystem does not own orders or user profiles. It reads them
//! through [`OrderDirectory`], implemented over HTTP by
//! `kome-market-client` in production and by [`InMemoryOrderDirectory`] in
//! development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kome_core::{OrderId, UserId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// Fulfilment status of a marketplace order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Only orders that have left the farm can be disputed.
    pub fn is_disputable(&self) -> bool {
        matches!(self, Self::Shipped | Self::Delivered | Self::Completed)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parts of an order the dispute subsystem needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub status: OrderStatus,
}

/// Read access to marketplace orders and user profiles.
#[async_trait]
pub trait OrderDirectory: Send + Sync {
    /// Look up an order. `Ok(None)` when it does not exist.
    async fn order(&self, order_id: &OrderId) -> Result<Option<OrderSnapshot>, DirectoryError>;

    /// Display name for a user. `Ok(None)` when the user is unknown.
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, DirectoryError>;
}

#[derive(Debug, Default)]
struct DirectoryData {
    orders: HashMap<OrderId, OrderSnapshot>,
    names: HashMap<UserId, String>,
}

/// Directory backed by process memory. Cloning shares the underlying maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderDirectory {
    data: Arc<RwLock<DirectoryData>>,
}

impl InMemoryOrderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an order.
    pub fn insert_order(&self, order: OrderSnapshot) {
        self.data.write().orders.insert(order.order_id, order);
    }

    /// Insert or replace a user's display name.
    pub fn insert_user(&self, user_id: UserId, name: impl Into<String>) {
        self.data.write().names.insert(user_id, name.into());
    }

    /// Change the status of a known order. Returns false if it is unknown.
    pub fn set_order_status(&self, order_id: &OrderId, status: OrderStatus) -> bool {
        match self.data.write().orders.get_mut(order_id) {
            Some(order) => {
                order.status = status;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl OrderDirectory for InMemoryOrderDirectory {
    async fn order(&self, order_id: &OrderId) -> Result<Option<OrderSnapshot>, DirectoryError> {
        Ok(self.data.read().orders.get(order_id).copied())
    }

    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, DirectoryError> {
        Ok(self.data.read().names.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disputable_statuses() {
        assert!(OrderStatus::Shipped.is_disputable());
        assert!(OrderStatus::Delivered.is_disputable());
        assert!(OrderStatus::Completed.is_disputable());
        assert!(!OrderStatus::Pending.is_disputable());
        assert!(!OrderStatus::Paid.is_disputable());
        assert!(!OrderStatus::Cancelled.is_disputable());
        assert!(!OrderStatus::Refunded.is_disputable());
    }

    #[tokio::test]
    async fn in_memory_lookup() {
        let dir = InMemoryOrderDirectory::new();
        let order = OrderSnapshot {
            order_id: OrderId::new(),
            buyer_id: UserId::new(),
            seller_id: UserId::new(),
            status: OrderStatus::Paid,
        };
        dir.insert_order(order);
        dir.insert_user(order.seller_id, "Hokkaido Paddies");

        assert_eq!(dir.order(&order.order_id).await.unwrap(), Some(order));
        assert_eq!(dir.order(&OrderId::new()).await.unwrap(), None);
        assert_eq!(
            dir.display_name(&order.seller_id).await.unwrap().as_deref(),
            Some("Hokkaido Paddies")
        );

        assert!(dir.set_order_status(&order.order_id, OrderStatus::Delivered));
        assert_eq!(
            dir.order(&order.order_id).await.unwrap().map(|o| o.status),
            Some(OrderStatus::Delivered)
        );
    }
}
