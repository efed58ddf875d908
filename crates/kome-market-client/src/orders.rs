//! Typed client for the marketplace order API.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET | `/api/v1/orders/{orderId}` | Get order by ID |

use kome_core::{OrderId, UserId};
use kome_dispute::{OrderSnapshot, OrderStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MarketApiError;

/// An order as returned by the marketplace. Fields the dispute service does
/// not use (line items, shipping address, payment details) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOrder {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub status: OrderStatus,
    /// Order total in the smallest currency unit.
    #[serde(default)]
    pub total_amount: Option<u64>,
}

impl From<MarketOrder> for OrderSnapshot {
    fn from(o: MarketOrder) -> Self {
        Self {
            order_id: OrderId::from_uuid(o.id),
            buyer_id: UserId::from_uuid(o.buyer_id),
            seller_id: UserId::from_uuid(o.seller_id),
            status: o.status,
        }
    }
}

/// Client for `/api/v1/orders`.
#[derive(Debug, Clone)]
pub struct OrderClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl OrderClient {
    pub(crate) fn new(http: reqwest::Client, base_url: url::Url) -> Self {
        Self { http, base_url }
    }

    /// Get an order by ID. Returns `Ok(None)` on 404.
    ///
    /// Calls `GET {base_url}/api/v1/orders/{id}`.
    pub async fn get(&self, id: &OrderId) -> Result<Option<MarketOrder>, MarketApiError> {
        let uuid = id.as_uuid();
        let endpoint = format!("GET /orders/{uuid}");
        let url = format!("{}api/v1/orders/{uuid}", self.base_url);
        crate::get_optional(&self.http, &url, endpoint).await
    }
}
