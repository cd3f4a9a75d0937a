//! Identity extraction. Authentication itself happens upstream; the proxy
//! in front of this service injects trusted headers that we only decode.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the authenticated user id (UUID).
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the display name; optional.
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Authenticated caller identity decoded from the trusted headers.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Stable user id.
    pub user_id: Uuid,
    /// Human readable name used for membership records.
    pub display_name: String,
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing identity header".into()))?;

        let user_id = Uuid::parse_str(raw_id)
            .map_err(|_| AppError::Unauthorized("malformed identity header".into()))?;

        let display_name = parts
            .headers
            .get(USER_NAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| anonymous_name(user_id));

        Ok(Self {
            user_id,
            display_name,
        })
    }
}

/// Fallback name shown when the auth layer supplies no display name.
fn anonymous_name(user_id: Uuid) -> String {
    let simple = user_id.simple().to_string();
    format!("user-{}", &simple[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_name_is_short_and_stable() {
        let id = Uuid::parse_str("2f3a9c1d-0000-4000-8000-000000000000").unwrap();
        assert_eq!(anonymous_name(id), "user-2f3a9c1d");
    }
}
