use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use super::error::ApiError;

/// Set by the upstream authentication layer once credentials are verified.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy)]
pub struct VerifiedUser {
    pub id: Uuid,
    pub is_admin: bool,
}

impl VerifiedUser {
    pub fn from_parts(parts: &Parts) -> Result<Self, ApiError> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(ApiError::Unauthenticated("missing user identity"))?;

        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or(ApiError::Unauthenticated("malformed user identity"))?;

        let is_admin = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.eq_ignore_ascii_case("admin"));

        Ok(Self { id, is_admin })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for VerifiedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts)
    }
}
