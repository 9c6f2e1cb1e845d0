/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - db: PgPool, tokens: TokenCodec, principals: PrincipalLookup, passwords: PasswordHasher
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - リクエスト単位の認証情報はここに置かない (request extensions の AuthCtx)
 */
use std::sync::Arc;

use crate::services::auth::{PasswordHasher, PrincipalLookup, TokenCodec};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub tokens: Arc<TokenCodec>,
    pub principals: Arc<dyn PrincipalLookup>,
    pub passwords: PasswordHasher,
}

impl AppState {
    pub fn new(
        db: sqlx::PgPool,
        tokens: Arc<TokenCodec>,
        principals: Arc<dyn PrincipalLookup>,
        passwords: PasswordHasher,
    ) -> Self {
        Self {
            db,
            tokens,
            principals,
            passwords,
        }
    }
}
