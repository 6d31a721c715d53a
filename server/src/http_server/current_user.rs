use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use color_eyre::eyre::eyre;
use uuid::Uuid;

use super::errors::ServerError;

/// Set by the gateway in front of us once it has authenticated the caller.
pub(crate) const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy)]
pub(crate) struct CurrentUser {
    pub user_id: Uuid,
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(USER_ID_HEADER) else {
            return Err(ServerError(
                eyre!("Missing X-User-Id header"),
                StatusCode::UNAUTHORIZED,
            ));
        };

        let user_id = header
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| {
                ServerError(
                    eyre!("X-User-Id header must be a UUID"),
                    StatusCode::UNAUTHORIZED,
                )
            })?;

        Ok(Self { user_id })
    }
}
