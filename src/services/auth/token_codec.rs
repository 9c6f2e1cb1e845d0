//! 署名付き access token (HS256 JWT) の発行と検証
//!
//! - `issue`: subject → `header.payload.signature`
//! - `verify`: token → `Some(subject)` / `None`
//!
//! verify は全域関数で、壊れた token / 署名不一致 / 期限切れを呼び出し側に区別して返さない。
//! 理由は debug ログにだけ残す。token 本体と鍵はログに出さない。

use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::TokenConfig;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("subject must not be empty")]
    EmptySubject,
    #[error("failed to sign token: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
    #[serde(default)]
    jti: Option<String>,
}

#[derive(Clone)]
pub struct TokenCodec {
    issuer: String,
    ttl_seconds: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(config: &TokenConfig) -> Self {
        let secret = config.secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        // exp は verify_at で「今」と比較する (時刻を外から渡せるように)
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Self {
            issuer: config.issuer.clone(),
            ttl_seconds: i64::try_from(config.ttl.as_secs()).unwrap_or(i64::MAX),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds as u64
    }

    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// `now` を発行時刻として token を作る。
    ///
    /// `jti` にランダムな UUID を入れるため、同じ秒内に同じ subject で発行しても token は一致しない。
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        if subject.trim().is_empty() {
            return Err(TokenError::EmptySubject);
        }

        let iat = now.timestamp();
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            iat,
            exp: iat.saturating_add(self.ttl_seconds),
            jti: Some(Uuid::new_v4().to_string()),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());

        Ok(jsonwebtoken::encode(&header, &claims, &self.encoding_key)?)
    }

    pub fn verify(&self, token: &str) -> Option<String> {
        self.verify_at(token, Utc::now())
    }

    /// `now` 時点で token が有効なら subject を返す。
    ///
    /// 有効 = 構造が正しい ∧ HS256 署名が一致 ∧ iss 一致 ∧ sub が空でない ∧ exp > now
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<String> {
        let claims =
            match jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation) {
                Ok(data) => data.claims,
                Err(err) => {
                    tracing::debug!(error = %err, "token rejected");
                    return None;
                }
            };

        if claims.sub.trim().is_empty() {
            tracing::debug!("token rejected: empty subject");
            return None;
        }

        if claims.exp <= now.timestamp() {
            tracing::debug!(exp = claims.exp, "token rejected: expired");
            return None;
        }

        Some(claims.sub)
    }
}
