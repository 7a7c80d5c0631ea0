use axum::extract::{FromRequestParts, Json, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::error::ApiError;
use crate::api::server::ApiState;
use crate::security::{verify_password, TokenData};
use crate::store::DataStoreExt;

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub jwt: String,
}

/// Exchange username/password for a session token.
pub async fn login_handler(
    State(state): State<ApiState>,
    Json(payload): Json<AuthPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::InvalidInput(
            "username and password are required".to_string(),
        ));
    }

    let user = state
        .store
        .direct()
        .user_by_username(&payload.username)
        .await
        .map_err(|e| ApiError::internal("unable to query users", e))?
        .ok_or_else(|| ApiError::Forbidden("invalid credentials".to_string()))?;

    if !verify_password(&user.password_hash, &payload.password) {
        debug!(user = %payload.username, "login rejected: bad password");
        return Err(ApiError::Forbidden("invalid credentials".to_string()));
    }

    let jwt = state
        .jwt
        .generate_token(&user)
        .map_err(|e| ApiError::internal("unable to issue session token", e))?;

    Ok(Json(AuthResponse { jwt }))
}

// ============================================================================
// Bearer-token extraction
// ============================================================================

/// Extract a bearer token from an Authorization header value.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    if header.len() > 7 && header[..7].eq_ignore_ascii_case("bearer ") {
        Some(header[7..].trim())
    } else {
        None
    }
}

impl FromRequestParts<ApiState> for TokenData {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Forbidden("missing authorization header".to_string()))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::Forbidden("malformed authorization header".to_string()))?;

        let data = state
            .jwt
            .parse_token(token)
            .map_err(|_| ApiError::Forbidden("invalid or expired session token".to_string()))?;

        // A credential change stamps the user record; tokens minted before
        // the stamp are dead.
        let user = match state.store.direct().user(data.user_id).await {
            Ok(user) => user,
            Err(err) if err.is_not_found() => {
                return Err(ApiError::Forbidden("user no longer exists".to_string()))
            }
            Err(err) => return Err(ApiError::internal("unable to read user", err)),
        };

        if data.issued_at < user.token_issued_at {
            return Err(ApiError::Forbidden(
                "session invalidated by a credential change".to_string(),
            ));
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("  Bearer   abc  "), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer"), None);
    }
}
