/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - 認証不要: /health, POST /auth/login, POST /users
 * - それ以外は auth::require を route_layer で掛ける (AuthCtx 必須)
 * - access middleware (token → AuthCtx) は app.rs 側で v1 全体に掛ける
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth::require;
use crate::state::AppState;

use crate::api::v1::handlers::{
    auth::login,
    health::health,
    users::{create_user, delete_user, get_me, get_user, update_me, update_user},
};

pub fn routes() -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/users", post(create_user));

    let protected = Router::new()
        .route("/users/me", get(get_me).put(update_me))
        .route(
            "/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        );

    public.merge(require::apply(protected))
}
