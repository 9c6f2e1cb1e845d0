/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: access (token → AuthCtx, fail open) / require (AuthCtx 必須の route 用)
 * - http / cors / security_headers: transport 層の横断的関心事
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
