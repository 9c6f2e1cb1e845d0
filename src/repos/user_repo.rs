/*
 * Responsibility
 * - users テーブル向け SQLx 操作 (identity store)
 * - PgPool を受け取り CRUD + email 検索を提供
 * - unique 違反は RepoError::Conflict に変換して返す
 */
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoError;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    #[sqlx(rename = "userId")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[sqlx(rename = "passwordHash")]
    pub password_hash: String,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<UserRow>, RepoError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT "userId", name, email, "passwordHash", "createdAt", "updatedAt"
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn exists_by_email(db: &PgPool, email: &str) -> Result<bool, RepoError> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)
        "#,
    )
    .bind(email)
    .fetch_one(db)
    .await?;

    Ok(exists)
}

pub async fn create(
    db: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<UserRow, RepoError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users ("userId", name, email, "passwordHash")
        VALUES ($1, $2, $3, $4)
        RETURNING "userId", name, email, "passwordHash", "createdAt", "updatedAt"
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(db)
    .await
    .map_err(RepoError::from_sqlx)?;

    Ok(row)
}

pub async fn get(db: &PgPool, user_id: Uuid) -> Result<Option<UserRow>, RepoError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT "userId", name, email, "passwordHash", "createdAt", "updatedAt"
        FROM users
        WHERE "userId" = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<Option<UserRow>, RepoError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users
        SET
            name = $2,
            email = $3,
            "passwordHash" = $4,
            "updatedAt" = now()
        WHERE "userId" = $1
        RETURNING "userId", name, email, "passwordHash", "createdAt", "updatedAt"
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_optional(db)
    .await
    .map_err(RepoError::from_sqlx)?;

    Ok(row)
}

pub async fn delete(db: &PgPool, user_id: Uuid) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"
        DELETE FROM users
        WHERE "userId" = $1
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}
