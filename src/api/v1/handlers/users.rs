/*
 * Responsibility
 * - /users 系 CRUD handler
 * - /users/me は AuthCtx (access middleware が入れたもの) を起点にする
 * - Path/Json を extractor で受け、DTO validation → repo 呼び出し
 */
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    api::v1::{
        dto::users::{UserRequest, UserResponse},
        extractors::AuthCtxExtractor,
    },
    error::AppError,
    repos::user_repo,
    state::AppState,
};

fn invalid(message: &'static str) -> AppError {
    AppError::bad_request("INVALID_USER_FIELD", message)
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    req.validate().map_err(invalid)?;
    let email = req.email.trim();

    if user_repo::exists_by_email(&state.db, email).await? {
        tracing::warn!("user with this email already exists");
        return Err(AppError::conflict("EMAIL_ALREADY_EXISTS", "user already exists"));
    }

    let password_hash = state.passwords.hash(&req.password).await?;
    let row = user_repo::create(&state.db, req.name.trim(), email, &password_hash).await?;
    tracing::info!(user_id = %row.id, "user created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(row))))
}

pub async fn get_me(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Result<Json<UserResponse>, AppError> {
    tracing::debug!(subject = %ctx.subject(), "fetching current user");
    find(&state, ctx.principal.id).await
}

pub async fn update_me(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
    Json(req): Json<UserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    update(&state, ctx.principal.id, req).await
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    find(&state, user_id).await
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    update(&state, user_id, req).await
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !user_repo::delete(&state.db, user_id).await? {
        return Err(AppError::not_found("user"));
    }
    tracing::info!(user_id = %user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find(state: &AppState, user_id: Uuid) -> Result<Json<UserResponse>, AppError> {
    let row = user_repo::get(&state.db, user_id)
        .await?
        .ok_or(AppError::not_found("user"))?;
    Ok(Json(UserResponse::from(row)))
}

async fn update(
    state: &AppState,
    user_id: Uuid,
    req: UserRequest,
) -> Result<Json<UserResponse>, AppError> {
    req.validate().map_err(invalid)?;
    let email = req.email.trim();

    let current = user_repo::get(&state.db, user_id)
        .await?
        .ok_or(AppError::not_found("user"))?;

    // 自分自身の email はそのまま使える
    if current.email != email && user_repo::exists_by_email(&state.db, email).await? {
        return Err(AppError::conflict(
            "EMAIL_ALREADY_EXISTS",
            "user with this email already exists",
        ));
    }

    let password_hash = state.passwords.hash(&req.password).await?;
    let row = user_repo::update(&state.db, user_id, req.name.trim(), email, &password_hash)
        .await?
        .ok_or(AppError::not_found("user"))?;
    tracing::info!(user_id = %row.id, "user updated");

    Ok(Json(UserResponse::from(row)))
}
