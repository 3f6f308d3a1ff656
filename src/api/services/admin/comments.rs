//! Admin API 评论审核

use std::sync::Arc;

use actix_web::{HttpResponse, web};

use crate::api::constants::messages;
use crate::api::middleware::AuthUser;
use crate::api::services::helpers::{api_result, created_result, message_result};
use crate::services::{
    AdminCommentListQuery, AdminReplyRequest, CommentService, UpdateCommentStatusRequest, Visitor,
};

pub async fn list_comments(
    query: web::Query<AdminCommentListQuery>,
    comments: web::Data<Arc<CommentService>>,
) -> HttpResponse {
    api_result(comments.admin_list(&query).await)
}

/// 只允许顶层评论置顶
pub async fn toggle_pin(
    id: web::Path<i64>,
    comments: web::Data<Arc<CommentService>>,
) -> HttpResponse {
    api_result(comments.toggle_pin(id.into_inner()).await)
}

pub async fn reply(
    id: web::Path<i64>,
    user: AuthUser,
    visitor: Visitor,
    body: web::Json<AdminReplyRequest>,
    comments: web::Data<Arc<CommentService>>,
) -> HttpResponse {
    created_result(
        comments
            .admin_reply(id.into_inner(), &body.content, user.id, &visitor)
            .await,
    )
}

pub async fn update_status(
    id: web::Path<i64>,
    body: web::Json<UpdateCommentStatusRequest>,
    comments: web::Data<Arc<CommentService>>,
) -> HttpResponse {
    api_result(comments.update_status(id.into_inner(), &body.status).await)
}

/// 连带删除直接回复
pub async fn delete_comment(
    id: web::Path<i64>,
    comments: web::Data<Arc<CommentService>>,
) -> HttpResponse {
    message_result(comments.delete(id.into_inner()).await, messages::DELETED)
}
