use std::fmt;

use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::api::services::types::TS_EXPORT_PATH;

/// 字段级校验错误，出现在响应的 `errors` 数组中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AppError {
    Validation(String),
    InvalidFields(Vec<FieldError>),
    NotFound(String),
    Conflict(String),
    CommentNotTopLevel(String),
    RefundExceedsAmount(String),
    InvalidRefundType(String),
    RefundExpenseOnly(String),
    InvalidCredentials(String),
    Unauthorized(String),
    TokenMissing(String),
    TokenMalformed(String),
    TokenInvalid(String),
    TokenExpired(String),
    SignatureInvalid(String),
    TimestampOutOfRange(String),
    RateLimited(String),
    FileTooLarge(String),
    InvalidFileType(String),
    NotConfigured(String),
    Timeout(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Serialization(String),
    DateParse(String),
    Internal(String),
}

impl AppError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "E001",
            AppError::InvalidFields(_) => "E002",
            AppError::NotFound(_) => "E003",
            AppError::Conflict(_) => "E004",
            AppError::CommentNotTopLevel(_) => "E005",
            AppError::RefundExceedsAmount(_) => "E006",
            AppError::InvalidRefundType(_) => "E007",
            AppError::RefundExpenseOnly(_) => "E008",
            AppError::InvalidCredentials(_) => "E009",
            AppError::Unauthorized(_) => "E010",
            AppError::TokenMissing(_) => "E011",
            AppError::TokenMalformed(_) => "E012",
            AppError::TokenInvalid(_) => "E013",
            AppError::TokenExpired(_) => "E014",
            AppError::SignatureInvalid(_) => "E015",
            AppError::TimestampOutOfRange(_) => "E016",
            AppError::RateLimited(_) => "E017",
            AppError::FileTooLarge(_) => "E018",
            AppError::InvalidFileType(_) => "E019",
            AppError::NotConfigured(_) => "E020",
            AppError::Timeout(_) => "E021",
            AppError::DatabaseConnection(_) => "E022",
            AppError::DatabaseOperation(_) => "E023",
            AppError::FileOperation(_) => "E024",
            AppError::Serialization(_) => "E025",
            AppError::DateParse(_) => "E026",
            AppError::Internal(_) => "E027",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) => "Validation Error",
            AppError::NotFound(_) => "Resource Not Found",
            AppError::Conflict(_) => "Resource Conflict",
            AppError::CommentNotTopLevel(_) => "Comment Not Top Level",
            AppError::RefundExceedsAmount(_) => "Refund Exceeds Amount",
            AppError::InvalidRefundType(_) => "Invalid Refund Type",
            AppError::RefundExpenseOnly(_) => "Refund Expense Only",
            AppError::InvalidCredentials(_) => "Invalid Credentials",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::TokenMissing(_) => "Token Missing",
            AppError::TokenMalformed(_) => "Token Malformed",
            AppError::TokenInvalid(_) => "Token Invalid",
            AppError::TokenExpired(_) => "Token Expired",
            AppError::SignatureInvalid(_) => "Signature Invalid",
            AppError::TimestampOutOfRange(_) => "Timestamp Out Of Range",
            AppError::RateLimited(_) => "Rate Limited",
            AppError::FileTooLarge(_) => "File Too Large",
            AppError::InvalidFileType(_) => "Invalid File Type",
            AppError::NotConfigured(_) => "Service Not Configured",
            AppError::Timeout(_) => "Request Timeout",
            AppError::DatabaseConnection(_) => "Database Connection Error",
            AppError::DatabaseOperation(_) => "Database Operation Error",
            AppError::FileOperation(_) => "File Operation Error",
            AppError::Serialization(_) => "Serialization Error",
            AppError::DateParse(_) => "Date Parse Error",
            AppError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            AppError::InvalidFields(fields) => fields
                .first()
                .map(|f| f.message.as_str())
                .unwrap_or("invalid request"),
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::CommentNotTopLevel(msg)
            | AppError::RefundExceedsAmount(msg)
            | AppError::InvalidRefundType(msg)
            | AppError::RefundExpenseOnly(msg)
            | AppError::InvalidCredentials(msg)
            | AppError::Unauthorized(msg)
            | AppError::TokenMissing(msg)
            | AppError::TokenMalformed(msg)
            | AppError::TokenInvalid(msg)
            | AppError::TokenExpired(msg)
            | AppError::SignatureInvalid(msg)
            | AppError::TimestampOutOfRange(msg)
            | AppError::RateLimited(msg)
            | AppError::FileTooLarge(msg)
            | AppError::InvalidFileType(msg)
            | AppError::NotConfigured(msg)
            | AppError::Timeout(msg)
            | AppError::DatabaseConnection(msg)
            | AppError::DatabaseOperation(msg)
            | AppError::FileOperation(msg)
            | AppError::Serialization(msg)
            | AppError::DateParse(msg)
            | AppError::Internal(msg) => msg,
        }
    }

    /// 对外展示的消息：5xx 不泄露内部细节
    pub fn public_message(&self) -> &str {
        match self {
            AppError::DatabaseConnection(_)
            | AppError::DatabaseOperation(_)
            | AppError::FileOperation(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => "internal server error",
            other => other.message(),
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidFields(_)
            | AppError::Conflict(_)
            | AppError::CommentNotTopLevel(_)
            | AppError::RefundExceedsAmount(_)
            | AppError::InvalidRefundType(_)
            | AppError::RefundExpenseOnly(_)
            | AppError::FileTooLarge(_)
            | AppError::InvalidFileType(_)
            | AppError::DateParse(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials(_)
            | AppError::Unauthorized(_)
            | AppError::TokenMissing(_)
            | AppError::TokenMalformed(_)
            | AppError::TokenInvalid(_)
            | AppError::TokenExpired(_)
            | AppError::SignatureInvalid(_)
            | AppError::TimestampOutOfRange(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::NotConfigured(_)
            | AppError::DatabaseConnection(_)
            | AppError::DatabaseOperation(_)
            | AppError::FileOperation(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 CLI 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for AppError {}

// 便捷的构造函数
impl AppError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn field<F: Into<String>, M: Into<String>>(field: F, msg: M) -> Self {
        AppError::InvalidFields(vec![FieldError::new(field, msg)])
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn not_configured<T: Into<String>>(msg: T) -> Self {
        AppError::NotConfigured(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        AppError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        AppError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        AppError::FileOperation(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        AppError::Internal(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::DatabaseOperation(err.to_string())
    }
}

impl From<sea_orm::TransactionError<AppError>> for AppError {
    fn from(err: sea_orm::TransactionError<AppError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(e) => AppError::from(e),
            sea_orm::TransactionError::Transaction(e) => e,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for AppError {
    fn from(err: chrono::ParseError) -> Self {
        AppError::DateParse(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
