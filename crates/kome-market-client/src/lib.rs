//! # kome-market-client -- Typed Rust client for the Kome marketplace API
//!
//! The dispute service reads orders and user profiles from the marketplace
//! that owns them:
//! - **Orders** via `GET /api/v1/orders/{id}`
//! - **Users** via `GET /api/v1/users/{id}`
//!
//! [`MarketClient`] implements [`kome_dispute::OrderDirectory`], so it plugs
//! straight into `DisputeService`. Transport failures are retried with
//! exponential backoff; a 404 is reported as `Ok(None)`.

pub mod config;
pub mod error;
pub mod orders;
pub(crate) mod retry;
pub mod users;

pub use config::MarketApiConfig;
pub use error::MarketApiError;

use std::time::Duration;

use async_trait::async_trait;
use kome_core::{OrderId, UserId};
use kome_dispute::{DirectoryError, OrderDirectory, OrderSnapshot};
use serde::de::DeserializeOwned;

/// Top-level marketplace client. Holds one sub-client per resource.
#[derive(Debug, Clone)]
pub struct MarketClient {
    orders: orders::OrderClient,
    users: users::UserClient,
}

impl MarketClient {
    /// Create a new client from configuration.
    pub fn new(config: MarketApiConfig) -> Result<Self, MarketApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| MarketApiError::Config(config::ConfigError::InvalidToken))?,
            );
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| MarketApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        // Resource paths are joined onto the base, so it must end in '/'.
        let mut base_url = config.base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            orders: orders::OrderClient::new(http.clone(), base_url.clone()),
            users: users::UserClient::new(http, base_url),
        })
    }

    pub fn orders(&self) -> &orders::OrderClient {
        &self.orders
    }

    pub fn users(&self) -> &users::UserClient {
        &self.users
    }
}

#[async_trait]
impl OrderDirectory for MarketClient {
    async fn order(&self, order_id: &OrderId) -> Result<Option<OrderSnapshot>, DirectoryError> {
        Ok(self.orders.get(order_id).await?.map(OrderSnapshot::from))
    }

    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, DirectoryError> {
        Ok(self.users.get(user_id).await?.map(|u| u.display_name))
    }
}

/// GET `url` and decode the JSON body, mapping 404 to `None`.
pub(crate) async fn get_optional<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    endpoint: String,
) -> Result<Option<T>, MarketApiError> {
    let resp = retry::retry_send(&endpoint, || http.get(url).send())
        .await
        .map_err(|e| MarketApiError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(MarketApiError::ApiError {
            endpoint,
            status,
            body,
        });
    }

    resp.json()
        .await
        .map(Some)
        .map_err(|e| MarketApiError::Deserialization {
            endpoint,
            source: e,
        })
}
