//! 前台内容端点：文章、生活记录、标签、归档

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use tracing::trace;

use crate::api::services::helpers::{api_result, message_result};
use crate::api::services::types::PageQuery;
use crate::services::{LifeService, PostListQuery, PostService, TagService, Visitor};

// ============ 文章 ============

pub async fn list_posts(
    query: web::Query<PostListQuery>,
    posts: web::Data<Arc<PostService>>,
) -> HttpResponse {
    trace!("Public API: list posts {:?}", query);
    api_result(posts.list_published(&query).await)
}

pub async fn featured_posts(posts: web::Data<Arc<PostService>>) -> HttpResponse {
    api_result(posts.featured().await)
}

pub async fn recent_posts(posts: web::Data<Arc<PostService>>) -> HttpResponse {
    api_result(posts.recent().await)
}

pub async fn get_post(
    slug: web::Path<String>,
    posts: web::Data<Arc<PostService>>,
) -> HttpResponse {
    api_result(posts.get_by_slug(&slug).await)
}

pub async fn record_post_view(
    id: web::Path<i64>,
    visitor: Visitor,
    posts: web::Data<Arc<PostService>>,
) -> HttpResponse {
    message_result(posts.record_view(id.into_inner(), &visitor).await, "view recorded")
}

pub async fn archives(posts: web::Data<Arc<PostService>>) -> HttpResponse {
    api_result(posts.archives().await)
}

// ============ 生活记录 ============

pub async fn list_life(
    query: web::Query<PageQuery>,
    life: web::Data<Arc<LifeService>>,
) -> HttpResponse {
    api_result(life.list_published(query.params()).await)
}

pub async fn get_life(id: web::Path<i64>, life: web::Data<Arc<LifeService>>) -> HttpResponse {
    api_result(life.get_published(id.into_inner()).await)
}

pub async fn record_life_view(
    id: web::Path<i64>,
    visitor: Visitor,
    life: web::Data<Arc<LifeService>>,
) -> HttpResponse {
    message_result(life.record_view(id.into_inner(), &visitor).await, "view recorded")
}

// ============ 标签 ============

pub async fn list_tags(tags: web::Data<Arc<TagService>>) -> HttpResponse {
    api_result(tags.list_public().await)
}

pub async fn tag_detail(
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
    tags: web::Data<Arc<TagService>>,
) -> HttpResponse {
    api_result(tags.detail(&slug, query.params()).await)
}
