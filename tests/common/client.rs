//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides one method per lists-server endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client, optionally sending an access token with every request
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    fn with_headers(base_url: String, headers: HeaderMap) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client sending no token
    pub fn new(base_url: String) -> Self {
        Self::with_headers(base_url, HeaderMap::new())
    }

    /// Creates a client sending `token` as a bearer token
    pub fn with_token(base_url: String, token: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).expect("Invalid token"),
        );
        Self::with_headers(base_url, headers)
    }

    /// Creates a client sending `token` in the access token cookie
    #[allow(dead_code)]
    pub fn with_cookie_token(base_url: String, token: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("access_token={}", token)).expect("Invalid token"),
        );
        Self::with_headers(base_url, headers)
    }

    /// Creates a client authenticated as [`TEST_OWNER`]
    ///
    /// This is the most common way to create a test client.
    pub fn authenticated(base_url: String) -> Self {
        Self::with_token(base_url, TEST_TOKEN)
    }

    // ========================================================================
    // Service
    // ========================================================================

    /// GET /
    #[allow(dead_code)]
    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Lists
    // ========================================================================

    /// GET /v1/lists
    pub async fn get_lists(&self) -> Response {
        self.client
            .get(format!("{}/v1/lists", self.base_url))
            .send()
            .await
            .expect("Get lists request failed")
    }

    /// GET /v1/lists/{list}
    pub async fn get_list(&self, list: &str) -> Response {
        self.client
            .get(format!("{}/v1/lists/{}", self.base_url, list))
            .send()
            .await
            .expect("Get list request failed")
    }

    /// POST /v1/lists/{list}
    pub async fn add_item(&self, list: &str, item_id: &str) -> Response {
        self.add_item_raw(list, json!({ "id": item_id })).await
    }

    /// POST /v1/lists/{list} with an arbitrary JSON body
    #[allow(dead_code)]
    pub async fn add_item_raw(&self, list: &str, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/v1/lists/{}", self.base_url, list))
            .json(&body)
            .send()
            .await
            .expect("Add item request failed")
    }

    /// GET /v1/lists/{list}/{item_id}
    #[allow(dead_code)]
    pub async fn get_item(&self, list: &str, item_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/lists/{}/{}", self.base_url, list, item_id))
            .send()
            .await
            .expect("Get item request failed")
    }

    /// DELETE /v1/lists/{list}/{item_id}
    pub async fn remove_item(&self, list: &str, item_id: &str) -> Response {
        self.client
            .delete(format!("{}/v1/lists/{}/{}", self.base_url, list, item_id))
            .send()
            .await
            .expect("Remove item request failed")
    }

    /// DELETE /v1/lists/{list}
    pub async fn remove_list(&self, list: &str) -> Response {
        self.client
            .delete(format!("{}/v1/lists/{}", self.base_url, list))
            .send()
            .await
            .expect("Remove list request failed")
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// GET /v1/items/{item_id}/watchers
    #[allow(dead_code)]
    pub async fn get_watchers(&self, item_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/items/{}/watchers", self.base_url, item_id))
            .send()
            .await
            .expect("Get watchers request failed")
    }

    /// Reads the item ids of a list, or an empty vec if the list does not exist
    #[allow(dead_code)]
    pub async fn item_ids(&self, list: &str) -> Vec<String> {
        let response = self.get_list(list).await;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return vec![];
        }
        let document: serde_json::Value = response.json().await.expect("Invalid list body");
        serde_json::from_value(document["item_ids"].clone()).expect("Invalid item ids")
    }
}
