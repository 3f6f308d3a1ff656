//! Admin API 内容管理：文章、生活记录、标签

use std::sync::Arc;

use actix_web::{HttpResponse, web};

use crate::api::constants::messages;
use crate::api::middleware::AuthUser;
use crate::api::services::helpers::{api_result, created_result, message_result};
use crate::services::{
    AdminLifeListQuery, AdminPostListQuery, CreateLifeRequest, CreatePostRequest,
    CreateTagRequest, LifeService, PostService, TagService, UpdateLifeRequest, UpdatePostRequest,
    UpdateTagRequest,
};

// ============ 文章 ============

pub async fn list_posts(
    query: web::Query<AdminPostListQuery>,
    posts: web::Data<Arc<PostService>>,
) -> HttpResponse {
    api_result(posts.admin_list(&query).await)
}

pub async fn get_post(id: web::Path<i64>, posts: web::Data<Arc<PostService>>) -> HttpResponse {
    api_result(posts.admin_get(id.into_inner()).await)
}

pub async fn create_post(
    user: AuthUser,
    body: web::Json<CreatePostRequest>,
    posts: web::Data<Arc<PostService>>,
) -> HttpResponse {
    created_result(posts.create(body.into_inner(), user.id).await)
}

pub async fn update_post(
    id: web::Path<i64>,
    body: web::Json<UpdatePostRequest>,
    posts: web::Data<Arc<PostService>>,
) -> HttpResponse {
    api_result(posts.update(id.into_inner(), body.into_inner()).await)
}

pub async fn delete_post(id: web::Path<i64>, posts: web::Data<Arc<PostService>>) -> HttpResponse {
    message_result(posts.delete(id.into_inner()).await, messages::DELETED)
}

// ============ 生活记录 ============

pub async fn list_life(
    query: web::Query<AdminLifeListQuery>,
    life: web::Data<Arc<LifeService>>,
) -> HttpResponse {
    api_result(life.admin_list(&query).await)
}

pub async fn get_life(id: web::Path<i64>, life: web::Data<Arc<LifeService>>) -> HttpResponse {
    api_result(life.admin_get(id.into_inner()).await)
}

pub async fn create_life(
    user: AuthUser,
    body: web::Json<CreateLifeRequest>,
    life: web::Data<Arc<LifeService>>,
) -> HttpResponse {
    created_result(life.create(body.into_inner(), user.id).await)
}

pub async fn update_life(
    id: web::Path<i64>,
    body: web::Json<UpdateLifeRequest>,
    life: web::Data<Arc<LifeService>>,
) -> HttpResponse {
    api_result(life.update(id.into_inner(), body.into_inner()).await)
}

pub async fn delete_life(id: web::Path<i64>, life: web::Data<Arc<LifeService>>) -> HttpResponse {
    message_result(life.delete(id.into_inner()).await, messages::DELETED)
}

// ============ 标签 ============

pub async fn list_tags(tags: web::Data<Arc<TagService>>) -> HttpResponse {
    api_result(tags.list_admin().await)
}

pub async fn create_tag(
    body: web::Json<CreateTagRequest>,
    tags: web::Data<Arc<TagService>>,
) -> HttpResponse {
    created_result(tags.create(body.into_inner()).await)
}

pub async fn update_tag(
    id: web::Path<i64>,
    body: web::Json<UpdateTagRequest>,
    tags: web::Data<Arc<TagService>>,
) -> HttpResponse {
    api_result(tags.update(id.into_inner(), body.into_inner()).await)
}

pub async fn delete_tag(id: web::Path<i64>, tags: web::Data<Arc<TagService>>) -> HttpResponse {
    message_result(tags.delete(id.into_inner()).await, messages::DELETED)
}
