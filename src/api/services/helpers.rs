//! API 帮助函数：统一响应包裹与错误映射

use actix_web::error::{InternalError, JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::{error, warn};

use crate::api::constants::messages;
use crate::errors::AppError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse::new(code as i32, message, data))
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(
        StatusCode::OK,
        ErrorCode::Success,
        messages::SUCCESS,
        Some(data),
    )
}

/// 成功响应，自定义 message
pub fn success_message<T: Serialize>(message: &str, data: Option<T>) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, message, data)
}

/// 201 Created
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(
        StatusCode::CREATED,
        ErrorCode::Success,
        messages::CREATED,
        Some(data),
    )
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 AppError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
///
/// 5xx 只记录日志，不把内部错误细节返回给客户端。
pub fn error_from_app(err: &AppError) -> HttpResponse {
    let status = err.http_status();
    if status.is_server_error() {
        error!("{} ({}): {}", err.error_type(), err.code(), err.message());
    }

    let mut body = ApiResponse::<()>::new(ErrorCode::from(err) as i32, err.public_message(), None);
    if let AppError::InvalidFields(fields) = err {
        body.errors = Some(fields.clone());
    }

    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(body)
}

/// 统一 Result → HttpResponse 转换
///
/// 成功时返回 200 OK + JSON 数据，失败时自动映射 AppError。
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<AppError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => {
            let err: AppError = e.into();
            error_from_app(&err)
        }
    }
}

/// 创建类接口：成功时 201 Created
pub fn created_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<AppError>,
{
    match result {
        Ok(data) => created_response(data),
        Err(e) => error_from_app(&e.into()),
    }
}

/// 无返回数据的写操作：成功时带固定 message
pub fn message_result<E>(result: Result<(), E>, message: &str) -> HttpResponse
where
    E: Into<AppError>,
{
    match result {
        Ok(()) => success_message::<()>(message, None),
        Err(e) => error_from_app(&e.into()),
    }
}

/// `web::JsonConfig` 的错误处理：返回 400 + 字段信息
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("Invalid JSON body on {}: {}", req.path(), err);
    let app_err = match &err {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            AppError::validation("request body too large")
        }
        JsonPayloadError::ContentType => {
            AppError::validation("content type must be application/json")
        }
        JsonPayloadError::Deserialize(e) => AppError::field("body", e.to_string()),
        other => AppError::validation(other.to_string()),
    };
    InternalError::from_response(err, error_from_app(&app_err)).into()
}

/// `web::QueryConfig` 的错误处理
pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let app_err = AppError::field("query", err.to_string());
    InternalError::from_response(err, error_from_app(&app_err)).into()
}

/// `web::PathConfig` 的错误处理（如 `/posts/abc/views` 中的非数字 ID）
pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    let app_err = AppError::validation("invalid id");
    InternalError::from_response(err, error_from_app(&app_err)).into()
}
