//! Resolution of request tokens into owner ids.
//!
//! The lists server does not issue or verify credentials itself, it asks the
//! account service who a token belongs to.

mod http_resolver;

pub use http_resolver::HttpIdentityResolver;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns the id of the owner the token was issued to.
    /// Returns Ok(None) if the token is unknown, expired or revoked.
    async fn resolve(&self, token: &str) -> Result<Option<String>>;
}
