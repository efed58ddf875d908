//! Typed client for the marketplace user API.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET | `/api/v1/users/{userId}` | Get public profile |

use kome_core::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MarketApiError;

/// Public profile of a buyer or farmer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketUser {
    pub id: Uuid,
    pub display_name: String,
    /// `buyer` or `farmer`.
    #[serde(default)]
    pub role: Option<String>,
}

/// Client for `/api/v1/users`.
#[derive(Debug, Clone)]
pub struct UserClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl UserClient {
    pub(crate) fn new(http: reqwest::Client, base_url: url::Url) -> Self {
        Self { http, base_url }
    }

    /// Get a user's public profile. Returns `Ok(None)` on 404.
    ///
    /// Calls `GET {base_url}/api/v1/users/{id}`.
    pub async fn get(&self, id: &UserId) -> Result<Option<MarketUser>, MarketApiError> {
        let uuid = id.as_uuid();
        let endpoint = format!("GET /users/{uuid}");
        let url = format!("{}api/v1/users/{uuid}", self.base_url);
        crate::get_optional(&self.http, &url, endpoint).await
    }
}
