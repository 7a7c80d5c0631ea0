//! Password update handler.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::server::ApiState;
use crate::model::UserId;
use crate::security::{hash_password, verify_password, TokenData};
use crate::store::DataStoreExt;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordPayload {
    /// Current password, verified before any change.
    pub password: String,
    pub new_password: String,
}

fn validate_payload(payload: &UpdatePasswordPayload) -> Result<(), ApiError> {
    if payload.password.is_empty() {
        return Err(ApiError::InvalidInput(
            "invalid current password".to_string(),
        ));
    }
    if payload.new_password.is_empty() {
        return Err(ApiError::InvalidInput("invalid new password".to_string()));
    }
    Ok(())
}

/// `PUT /api/users/{id}/password` — a user may change their own password;
/// administrators may change anyone's.
pub async fn update_password_handler(
    State(state): State<ApiState>,
    Path(user_id): Path<UserId>,
    token: TokenData,
    Json(payload): Json<UpdatePasswordPayload>,
) -> Result<StatusCode, ApiError> {
    if state.demo.is_demo_user(user_id) {
        return Err(ApiError::Forbidden(
            "this action is not available on demo accounts".to_string(),
        ));
    }

    if !token.is_admin() && token.user_id != user_id {
        return Err(ApiError::Forbidden(
            "permission denied to update user".to_string(),
        ));
    }

    validate_payload(&payload)?;

    let strength = state.strength;
    state
        .store
        .execute(state.no_tx, move |tx| {
            Box::pin(async move {
                let mut user = match tx.user(user_id).await {
                    Ok(user) => user,
                    Err(err) if err.is_not_found() => {
                        return Err(ApiError::NotFound(
                            "unable to find a user with the specified identifier".to_string(),
                        ))
                    }
                    Err(err) => {
                        return Err(ApiError::internal("unable to read user from the datastore", err))
                    }
                };

                if !verify_password(&user.password_hash, &payload.password) {
                    return Err(ApiError::Forbidden(
                        "current password does not match".to_string(),
                    ));
                }

                if !strength.check(&payload.new_password) {
                    return Err(ApiError::InvalidInput(
                        "password does not meet the requirements".to_string(),
                    ));
                }

                user.password_hash = hash_password(&payload.new_password)
                    .map_err(|e| ApiError::internal("unable to hash user password", e))?;

                // Invalidate every token minted before this instant.
                user.token_issued_at = Utc::now().timestamp();

                tx.update_user(&user)
                    .await
                    .map_err(|e| ApiError::internal("unable to persist user changes", e))?;

                info!(user = user.id, "password updated");
                Ok(())
            })
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
