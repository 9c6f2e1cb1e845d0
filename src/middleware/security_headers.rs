//! ブラウザ向けのセキュリティ系レスポンスヘッダ
//!
//! - clickjacking 対策 (x-frame-options + CSP frame-ancestors)
//! - MIME sniffing 無効化
//! - referrer を出さない
//! - カメラ等のブラウザ機能を既定で無効化
//!
//! handler が同名ヘッダを付けた場合はそちらを優先する (`if_not_present`)。
//! 401 などのエラー応答にも付く。

use axum::Router;
use axum::http::header::{HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

const HEADERS: [(&str, &str); 5] = [
    ("x-frame-options", "DENY"),
    ("content-security-policy", "frame-ancestors 'none'"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "no-referrer"),
    (
        "permissions-policy",
        "camera=(), microphone=(), geolocation=()",
    ),
];

pub fn apply(router: Router) -> Router {
    HEADERS.iter().fold(router, |router, &(name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}
