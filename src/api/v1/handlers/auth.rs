/*
 * Responsibility
 * - POST /auth/login
 * - email/password を照合し、成功したら email を subject として token を発行する
 * - 失敗理由 (email 不在 / password 不一致) はクライアントに区別させない
 *   (status も応答時間も同じにする)
 */
use axum::{Json, extract::State};

use crate::{
    api::v1::dto::auth::{LoginRequest, LoginResponse},
    error::AppError,
    repos::user_repo,
    state::AppState,
};

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    req.validate()
        .map_err(|m| AppError::bad_request("INVALID_REQUEST", m))?;

    let user = user_repo::find_by_email(&state.db, req.email.trim()).await?;

    // email の有無に関わらず bcrypt を一回回す (応答時間で区別させない)
    let stored = user.as_ref().map(|u| u.password_hash.as_str());
    let matched = state.passwords.verify_user(&req.password, stored).await?;

    let user = match user {
        Some(user) if matched => user,
        Some(user) => {
            tracing::debug!(user_id = %user.id, "login failed: password mismatch");
            return Err(AppError::Unauthorized);
        }
        None => {
            tracing::debug!("login failed: unknown email");
            return Err(AppError::Unauthorized);
        }
    };

    let token = state.tokens.issue(&user.email)?;
    tracing::info!(user_id = %user.id, "token issued");

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: state.tokens.ttl_seconds(),
    }))
}
