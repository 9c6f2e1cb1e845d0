/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware (auth::access) が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - extensions はリクエストと一緒に破棄されるので、別リクエストから見えることはない
 * - token の検証ロジックは services 側の責務
 */
use crate::services::auth::Principal;

/// 認証済みのリクエストに付与されるコンテキスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
    pub principal: Principal,
}

impl AuthCtx {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn subject(&self) -> &str {
        self.principal.subject()
    }
}
