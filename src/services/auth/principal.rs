//! subject → Principal の解決 (identity store の境界)
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repos::error::RepoError;
use crate::repos::user_repo::{self, UserRow};

/// 認証済みリクエストに紐づくユーザー
///
/// パスワードハッシュは持たない (handler にも response にも流さない)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl Principal {
    /// token の `sub` に入れる値
    pub fn subject(&self) -> &str {
        &self.email
    }
}

impl From<UserRow> for Principal {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
        }
    }
}

/// Implementations must be cheap to share (`Arc<dyn PrincipalLookup>` in AppState).
#[async_trait]
pub trait PrincipalLookup: Send + Sync {
    /// Returns:
    /// - `Ok(Some(_))` subject に一致するユーザーがいる
    /// - `Ok(None)`    いない
    /// - `Err(_)`      backend failure
    async fn find_by_subject(&self, subject: &str) -> Result<Option<Principal>, RepoError>;
}

/// users テーブルを引く PrincipalLookup。subject は email
#[derive(Clone, Debug)]
pub struct UserDirectory {
    db: PgPool,
}

impl UserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PrincipalLookup for UserDirectory {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<Principal>, RepoError> {
        let row = user_repo::find_by_email(&self.db, subject).await?;
        Ok(row.map(Principal::from))
    }
}
