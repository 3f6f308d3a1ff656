//! 前台评论端点

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use tracing::info;

use crate::api::services::error_code::ErrorCode;
use crate::api::services::helpers::{api_result, error_from_app, json_response};
use crate::services::{CommentListQuery, CommentService, CreateCommentRequest, Visitor};

pub async fn list_comments(
    query: web::Query<CommentListQuery>,
    comments: web::Data<Arc<CommentService>>,
) -> HttpResponse {
    api_result(comments.list(&query).await)
}

/// 新评论：管理员邮箱直接通过，其余进入待审核；message 随状态变化
pub async fn create_comment(
    body: web::Json<CreateCommentRequest>,
    visitor: Visitor,
    comments: web::Data<Arc<CommentService>>,
) -> HttpResponse {
    match comments.create(body.into_inner(), &visitor).await {
        Ok(result) => {
            info!(
                "Public API: comment {} created from {} ({})",
                result.id, visitor.ip, result.status
            );
            let message = result.message.clone();
            json_response(StatusCode::CREATED, ErrorCode::Success, message, Some(result))
        }
        Err(e) => error_from_app(&e),
    }
}
