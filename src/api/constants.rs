//! API 模块常量定义

/// 响应 message 文案
pub mod messages {
    pub const SUCCESS: &str = "success";
    pub const CREATED: &str = "create success";
    pub const UPDATED: &str = "update success";
    pub const DELETED: &str = "delete success";
    pub const COMMENT_PENDING: &str = "comment submitted, awaiting moderation";
    pub const COMMENT_APPROVED: &str = "comment published";
    pub const SLUG_EXISTS: &str = "slug already exists";
    pub const LOGIN_FAILED: &str = "invalid username or password";
    pub const PASSWORD_CHANGED: &str = "password changed";
    pub const LOGOUT: &str = "logged out";
    pub const TOO_MANY_REQUESTS: &str = "too many requests, please try again later";
    pub const REQUEST_TIMEOUT: &str = "request timeout";
    pub const INTERNAL_ERROR: &str = "internal server error";
}

/// Bearer 前缀
pub const BEARER_PREFIX: &str = "Bearer ";

/// 账单 webhook 签名头
pub const BILL_TIMESTAMP_HEADER: &str = "X-Bill-Timestamp";
pub const BILL_SIGNATURE_HEADER: &str = "X-Bill-Signature";

/// webhook 时间戳允许的偏差（秒）
pub const WEBHOOK_MAX_SKEW_SECS: i64 = 300;

/// 同一访客对同一内容的浏览量去重窗口（秒）
pub const VIEW_DEDUP_WINDOW_SECS: i64 = 3600;
