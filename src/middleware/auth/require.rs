//! 認可 (downstream): AuthCtx が無いリクエストを 401 で止める
//!
//! access middleware は拒否しないので、保護したい route にはこれを `route_layer` で掛ける。
//! access より内側 (後) で評価されること。
use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::state::AppState;

pub fn apply(router: Router<AppState>) -> Router<AppState> {
    // route_layer: マッチした route にだけ掛かる (404 は 404 のまま)
    router.route_layer(middleware::from_fn(require_auth))
}

async fn require_auth(req: Request<Body>, next: Next) -> Response {
    if req.extensions().get::<AuthCtx>().is_none() {
        tracing::debug!(path = %req.uri().path(), "rejecting unauthenticated request");
        return AppError::Unauthorized.into_response();
    }
    next.run(req).await
}
