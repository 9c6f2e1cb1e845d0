//! Bearer token 検証 → AuthCtx を extensions に入れる
//!
//! - 1 リクエストにつき 1 回、全 handler より前に走る
//! - token が無い / 無効 / ユーザー不在でも拒否しない (fail open)。拒否は `auth::require` と extractor 側の責務
//! - continuation (`next.run`) は結果に関係なく必ず 1 回だけ呼ぶ
//!
//! 状態遷移 (per request):
//! UNAUTHENTICATED → (token 無し | 無効 | principal 無し) → UNAUTHENTICATED
//! UNAUTHENTICATED → (token 有効 ∧ principal 有り)      → AUTHENTICATED

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::services::auth::{PrincipalLookup, TokenCodec};
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// `/api/v1/*` に認証 middleware を適用する。
///
/// 例：
/// ```ignore
/// let v1 = api::v1::routes();
/// let v1 = middleware::auth::access::apply(v1, state.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // 外側の layer が入れた AuthCtx は信用しない (1 リクエストにつき最大 1 つ)
    req.extensions_mut().remove::<AuthCtx>();

    if let Some(auth_ctx) =
        authenticate(&state.tokens, state.principals.as_ref(), req.headers()).await
    {
        // middleware → extractor への受け渡し
        req.extensions_mut().insert(auth_ctx);
    }

    next.run(req).await
}

/// ヘッダから AuthCtx を組み立てる。失敗はすべて `None` (未認証) に畳む
pub async fn authenticate(
    tokens: &TokenCodec,
    principals: &dyn PrincipalLookup,
    headers: &HeaderMap,
) -> Option<AuthCtx> {
    let token = bearer_token(headers)?;

    let Some(subject) = tokens.verify(token) else {
        tracing::debug!("bearer token rejected; continuing unauthenticated");
        return None;
    };

    match principals.find_by_subject(&subject).await {
        Ok(Some(principal)) => {
            tracing::debug!(user_id = %principal.id, "request authenticated");
            Some(AuthCtx::new(principal))
        }
        Ok(None) => {
            tracing::debug!(subject = %subject, "no principal for token subject");
            None
        }
        Err(err) => {
            tracing::warn!(error = ?err, "principal lookup failed; continuing unauthenticated");
            None
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        Json, Router,
        body::Body,
        http::{HeaderValue, Request, StatusCode},
        routing::get,
    };
    use chrono::{Duration as ChronoDuration, Utc};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::{Service, ServiceExt};

    use super::*;
    use crate::test_support::{self, InMemoryPrincipals, principal};

    /// handler 到達回数と、handler から見えた subject を返すだけの probe
    fn probe_router(state: AppState, hits: Arc<AtomicUsize>) -> Router {
        let handler = move |req: Request<Body>| {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                let subject = req
                    .extensions()
                    .get::<AuthCtx>()
                    .map(|c| c.subject().to_string());
                Json(json!({ "subject": subject }))
            }
        };

        apply(Router::new().route("/probe", get(handler)), state.clone()).with_state(state)
    }

    fn request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/probe");
        if let Some(v) = authorization {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn observed_subject(res: Response) -> Value {
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        body["subject"].clone()
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers_with("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("Bearer   abc  ")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("bearer abc")), None);
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwdw==")), None);
        assert_eq!(bearer_token(&headers_with("abc")), None);
    }

    #[tokio::test]
    async fn authenticate_resolves_principal_for_valid_token() {
        let tokens = test_support::token_codec();
        let principals = InMemoryPrincipals::with(principal("user@example.com"));
        let token = tokens.issue("user@example.com").unwrap();

        let ctx = authenticate(&tokens, &principals, &headers_with(&format!("Bearer {token}")))
            .await
            .expect("authenticated");

        assert_eq!(ctx.principal.email, "user@example.com");
        assert_eq!(principals.calls(), 1);
    }

    #[tokio::test]
    async fn authenticate_skips_lookup_for_invalid_token() {
        let tokens = test_support::token_codec();
        let principals = InMemoryPrincipals::with(principal("user@example.com"));

        let ctx = authenticate(&tokens, &principals, &headers_with("Bearer invalid-token")).await;

        assert!(ctx.is_none());
        assert_eq!(principals.calls(), 0);
    }

    #[tokio::test]
    async fn authenticate_unknown_subject_is_unauthenticated() {
        let tokens = test_support::token_codec();
        let principals = InMemoryPrincipals::default();
        let token = tokens.issue("ghost@example.com").unwrap();

        let ctx = authenticate(&tokens, &principals, &headers_with(&format!("Bearer {token}"))).await;

        assert!(ctx.is_none());
        assert_eq!(principals.calls(), 1);
    }

    #[tokio::test]
    async fn authenticate_lookup_failure_is_unauthenticated() {
        let tokens = test_support::token_codec();
        let principals = InMemoryPrincipals::failing();
        let token = tokens.issue("user@example.com").unwrap();

        let ctx = authenticate(&tokens, &principals, &headers_with(&format!("Bearer {token}"))).await;

        assert!(ctx.is_none());
    }

    #[tokio::test]
    async fn no_header_reaches_handler_unauthenticated_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = test_support::state(InMemoryPrincipals::with(principal("user@example.com")));
        let app = probe_router(state, hits.clone());

        let res = app.oneshot(request(None)).await.unwrap();

        assert_eq!(observed_subject(res).await, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_authenticated_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = test_support::state(InMemoryPrincipals::with(principal("user@example.com")));
        let token = state.tokens.issue("user@example.com").unwrap();
        let app = probe_router(state, hits.clone());

        let res = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(observed_subject(res).await, json!("user@example.com"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_fails_open() {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = test_support::state(InMemoryPrincipals::with(principal("user@example.com")));
        let token = state
            .tokens
            .issue_at("user@example.com", Utc::now() - ChronoDuration::hours(3))
            .unwrap();
        let app = probe_router(state, hits.clone());

        let res = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(observed_subject(res).await, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_prefix_fails_open() {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = test_support::state(InMemoryPrincipals::with(principal("user@example.com")));
        let token = state.tokens.issue("user@example.com").unwrap();
        let app = probe_router(state, hits.clone());

        let res = app
            .oneshot(request(Some(&format!("Token {token}"))))
            .await
            .unwrap();

        assert_eq!(observed_subject(res).await, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_subject_fails_open() {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = test_support::state(InMemoryPrincipals::default());
        let token = state.tokens.issue("ghost@example.com").unwrap();
        let app = probe_router(state, hits.clone());

        let res = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(observed_subject(res).await, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn identity_does_not_leak_into_next_request_on_same_service() {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = test_support::state(InMemoryPrincipals::with(principal("a@example.com")));
        let token = state.tokens.issue("a@example.com").unwrap();
        let mut svc = probe_router(state, hits.clone()).into_service::<Body>();

        let first = svc
            .ready()
            .await
            .unwrap()
            .call(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(observed_subject(first).await, json!("a@example.com"));

        let second = svc.ready().await.unwrap().call(request(None)).await.unwrap();
        assert_eq!(observed_subject(second).await, Value::Null);

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_requests_see_only_their_own_identity() {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = test_support::state(InMemoryPrincipals::with_all([
            principal("a@example.com"),
            principal("b@example.com"),
        ]));
        let token_a = state.tokens.issue("a@example.com").unwrap();
        let token_b = state.tokens.issue("b@example.com").unwrap();
        let app = probe_router(state, hits.clone());

        let mut handles = Vec::new();
        for i in 0..30 {
            let app = app.clone();
            let (auth, expected) = match i % 3 {
                0 => (Some(format!("Bearer {token_a}")), json!("a@example.com")),
                1 => (Some(format!("Bearer {token_b}")), json!("b@example.com")),
                _ => (None, Value::Null),
            };
            handles.push(tokio::spawn(async move {
                let res = app.oneshot(request(auth.as_deref())).await.unwrap();
                assert_eq!(observed_subject(res).await, expected);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(hits.load(Ordering::SeqCst), 30);
    }

    #[tokio::test]
    async fn identity_injected_by_outer_layer_is_discarded() {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = test_support::state(InMemoryPrincipals::default());
        let app = probe_router(state, hits.clone()).layer(axum::middleware::from_fn(
            |mut req: Request<Body>, next: Next| async move {
                req.extensions_mut()
                    .insert(AuthCtx::new(principal("spoofed@example.com")));
                next.run(req).await
            },
        ));

        let res = app.oneshot(request(None)).await.unwrap();

        assert_eq!(observed_subject(res).await, Value::Null);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
