/*
 * Responsibility
 * - 環境変数の読み込み (DATABASE_URL, JWT_SECRET, CORS 許可など)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 * - 起動時に一度だけ読む。ホットリロードはしない
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub const DEFAULT_JWT_ISSUER: &str = "ostech-api";
pub const DEFAULT_JWT_TTL_SECONDS: u64 = 2 * 60 * 60;

/// HMAC 署名鍵。Debug / ログには中身を出さない
#[derive(Clone)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        Ok(Self(secret))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(***)")
    }
}

/// TokenCodec に渡す不変の設定値
///
/// - `secret`: HS256 の共有鍵
/// - `issuer`: `iss` claim。verify 時にも一致を要求する
/// - `ttl`: 発行から失効までの時間 (0 は不可)
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: SigningSecret,
    pub issuer: String,
    pub ttl: Duration,
}

impl TokenConfig {
    pub fn new(
        secret: SigningSecret,
        issuer: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, ConfigError> {
        let issuer = issuer.into();
        if issuer.trim().is_empty() {
            return Err(ConfigError::Invalid("JWT_ISSUER"));
        }
        if ttl.is_zero() {
            return Err(ConfigError::Invalid("JWT_TTL_SECONDS"));
        }
        Ok(Self {
            secret,
            issuer,
            ttl,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub token: TokenConfig,
    pub bcrypt_cost: u32,

    pub request_body_limit_bytes: usize,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `var` は環境変数の取得口。テストでは process env を触らずに差し替える
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = match var("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let app_env = AppEnv::parse(var("APP_ENV").as_deref().unwrap_or("development"));

        let cors_allowed_origins = parse_origins(&var("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        // 署名鍵が無いまま「全リクエスト未認証」で動き続けないよう、ここで起動を止める
        let secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let secret = SigningSecret::new(secret)?;

        let issuer = var("JWT_ISSUER").unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string());

        let ttl_seconds = match var("JWT_TTL_SECONDS") {
            Some(v) => v
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("JWT_TTL_SECONDS"))?,
            None => DEFAULT_JWT_TTL_SECONDS,
        };

        let token = TokenConfig::new(secret, issuer, Duration::from_secs(ttl_seconds))?;

        let bcrypt_cost = match var("BCRYPT_COST") {
            Some(v) => parse_bcrypt_cost(&v)?,
            None => bcrypt::DEFAULT_COST,
        };

        let request_body_limit_bytes = var("REQUEST_BODY_LIMIT_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        let request_timeout = var("REQUEST_TIMEOUT_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            addr,
            database_url,
            app_env,
            cors_allowed_origins,
            token,
            bcrypt_cost,
            request_body_limit_bytes,
            request_timeout,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bcrypt_cost(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(cost) if (4..=31).contains(&cost) => Ok(cost),
        _ => Err(ConfigError::Invalid("BCRYPT_COST")),
    }
}
