use super::IdentityResolver;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize, Debug)]
struct WhoAmIResponse {
    id: String,
}

/// Asks the account service who a token belongs to.
///
/// The token is forwarded as a bearer token to `auth_url`, which answers 200 with
/// `{"id": "<owner>"}` for a live token and 401/403/404 for anything else.
pub struct HttpIdentityResolver {
    client: reqwest::Client,
    auth_url: String,
}

impl HttpIdentityResolver {
    pub fn new(auth_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let auth_url = auth_url.trim_end_matches('/').to_string();

        Ok(Self { client, auth_url })
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.auth_url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to reach the account service")?;

        match response.status() {
            StatusCode::OK => {
                let who: WhoAmIResponse = response
                    .json()
                    .await
                    .context("Failed to parse account service response")?;
                if who.id.is_empty() {
                    bail!("Account service returned an empty owner id");
                }
                Ok(Some(who.id))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!("Account service rejected token ({})", response.status());
                Ok(None)
            }
            status => bail!("Account service answered with unexpected status {}", status),
        }
    }
}
