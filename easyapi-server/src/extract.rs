//! Caller identity extraction from the credential header pair.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::context::ServerContext;
use crate::error::ApiError;

pub const ID_HEADER: &str = "easyapi-id";
pub const KEY_HEADER: &str = "easyapi-key";

/// The authenticated caller. Extracting it enforces the id/key check; every
/// endpoint that takes a `Caller` is 403 on mismatch.
pub struct Caller {
    pub access_id: String,
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> &'a str {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

impl FromRequestParts<ServerContext> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let id = header_str(parts, ID_HEADER);
        let key = header_str(parts, KEY_HEADER);
        if state.auth.authenticate(id, key) {
            Ok(Caller {
                access_id: id.to_string(),
            })
        } else {
            tracing::warn!(uri = %parts.uri, "authentication failed");
            Err(ApiError::Forbidden("invalid credentials".to_string()))
        }
    }
}
