//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};
use ts_rs::TS;

use super::types::TS_EXPORT_PATH;
use crate::errors::AppError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，ts-rs 自动生成 TypeScript 类型。
/// 按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证 / 签名 / 限流
/// - 3000-3099: 内容（文章、评论）
/// - 4000-4099: 账本
/// - 5000-5099: 上传
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[ts(rename = "ErrorCode")]
#[ts(repr(enum))]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    NotFound = 1001,
    InternalServerError = 1002,
    ServiceUnavailable = 1003,
    RequestTimeout = 1004,
    ResourceConflict = 1005,
    InvalidDateFormat = 1006,

    // 认证错误 2000-2099
    Unauthorized = 2000,
    TokenMissing = 2001,
    TokenMalformed = 2002,
    TokenInvalid = 2003,
    TokenExpired = 2004,
    InvalidCredentials = 2005,
    RateLimitExceeded = 2006,
    SignatureInvalid = 2007,
    TimestampOutOfRange = 2008,

    // 内容错误 3000-3099
    CommentNotTopLevel = 3000,

    // 账本错误 4000-4099
    RefundExceedsAmount = 4000,
    InvalidRefundType = 4001,
    RefundExpenseOnly = 4002,

    // 上传错误 5000-5099
    FileTooLarge = 5000,
    InvalidFileType = 5001,
}

impl From<&AppError> for ErrorCode {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Validation(_) | AppError::InvalidFields(_) => ErrorCode::BadRequest,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) => ErrorCode::ResourceConflict,
            AppError::CommentNotTopLevel(_) => ErrorCode::CommentNotTopLevel,
            AppError::RefundExceedsAmount(_) => ErrorCode::RefundExceedsAmount,
            AppError::InvalidRefundType(_) => ErrorCode::InvalidRefundType,
            AppError::RefundExpenseOnly(_) => ErrorCode::RefundExpenseOnly,
            AppError::InvalidCredentials(_) => ErrorCode::InvalidCredentials,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::TokenMissing(_) => ErrorCode::TokenMissing,
            AppError::TokenMalformed(_) => ErrorCode::TokenMalformed,
            AppError::TokenInvalid(_) => ErrorCode::TokenInvalid,
            AppError::TokenExpired(_) => ErrorCode::TokenExpired,
            AppError::SignatureInvalid(_) => ErrorCode::SignatureInvalid,
            AppError::TimestampOutOfRange(_) => ErrorCode::TimestampOutOfRange,
            AppError::RateLimited(_) => ErrorCode::RateLimitExceeded,
            AppError::FileTooLarge(_) => ErrorCode::FileTooLarge,
            AppError::InvalidFileType(_) => ErrorCode::InvalidFileType,
            AppError::NotConfigured(_) => ErrorCode::ServiceUnavailable,
            AppError::Timeout(_) => ErrorCode::RequestTimeout,
            AppError::DateParse(_) => ErrorCode::InvalidDateFormat,
            AppError::DatabaseConnection(_)
            | AppError::DatabaseOperation(_)
            | AppError::FileOperation(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => ErrorCode::InternalServerError,
        }
    }
}
