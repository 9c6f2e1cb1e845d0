//! パスワードのハッシュ化と照合 (bcrypt)
//!
//! bcrypt は CPU を食うので async 側からは `spawn_blocking` 経由で呼ぶ。
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("password worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    // ユーザー不在時の照合相手。本物と同じ cost で作る
    dummy_hash: Arc<str>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// 起動時に一度だけ dummy hash を作る (cost 分の時間がかかる)
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        let dummy_hash = bcrypt::hash(uuid::Uuid::new_v4().to_string(), cost)?;
        Ok(Self {
            cost,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub async fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        let cost = self.cost;
        let plain = plain.to_owned();
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost)).await??;
        Ok(hashed)
    }

    /// 一致すれば `Ok(true)`。保存値が bcrypt として読めない場合は `Ok(false)` 扱い
    pub async fn verify(&self, plain: &str, hashed: &str) -> Result<bool, PasswordError> {
        let plain = plain.to_owned();
        let hashed = hashed.to_owned();
        let matched = tokio::task::spawn_blocking(move || match bcrypt::verify(plain, &hashed) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is unreadable");
                false
            }
        })
        .await?;
        Ok(matched)
    }

    /// login 用の照合。ユーザーがいなくても dummy hash に対して同じ重さの照合を行い、
    /// 応答時間から email の有無が分からないようにする
    pub async fn verify_user(
        &self,
        plain: &str,
        stored: Option<&str>,
    ) -> Result<bool, PasswordError> {
        match stored {
            Some(hashed) => self.verify(plain, hashed).await,
            None => {
                self.verify(plain, &self.dummy_hash).await?;
                Ok(false)
            }
        }
    }
}
