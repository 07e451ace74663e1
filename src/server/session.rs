use super::state::ServerState;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::{debug, error};

/// The authenticated caller of a request.
#[derive(Debug)]
pub struct Session {
    pub owner_id: String,
}

pub const COOKIE_ACCESS_TOKEN_KEY: &str = "access_token";
const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, PartialEq, Eq)]
pub enum SessionExtractionError {
    MissingToken,
    Rejected,
    /// The account service could not be asked.
    ResolverUnavailable,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::MissingToken | SessionExtractionError::Rejected => {
                StatusCode::UNAUTHORIZED.into_response()
            }
            SessionExtractionError::ResolverUnavailable => StatusCode::BAD_GATEWAY.into_response(),
        }
    }
}

fn extract_token_from_headers(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?;
    let value = String::from_utf8_lossy(value.as_bytes());
    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(&*value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

async fn extract_token_from_cookies(parts: &mut Parts, ctx: &ServerState) -> Option<String> {
    let jar = CookieJar::from_request_parts(parts, ctx).await.ok()?;
    jar.get(COOKIE_ACCESS_TOKEN_KEY)
        .map(Cookie::value)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let token = match extract_token_from_headers(parts) {
            Some(token) => token,
            None => extract_token_from_cookies(parts, ctx)
                .await
                .ok_or_else(|| {
                    debug!("No token in headers nor cookies.");
                    SessionExtractionError::MissingToken
                })?,
        };

        match ctx.identity_resolver.resolve(&token).await {
            Ok(Some(owner_id)) => {
                debug!("Token resolved to owner {}", owner_id);
                Ok(Session { owner_id })
            }
            Ok(None) => {
                debug!("Token rejected by the account service");
                Err(SessionExtractionError::Rejected)
            }
            Err(err) => {
                error!("Failed to resolve token: {:#}", err);
                Err(SessionExtractionError::ResolverUnavailable)
            }
        }
    }
}
