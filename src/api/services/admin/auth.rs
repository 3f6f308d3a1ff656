//! Admin API 认证端点
//!
//! JWT 无状态：logout 只记录日志，由客户端丢弃 token。

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::api::constants::messages;
use crate::api::middleware::AuthUser;
use crate::api::services::helpers::{api_result, error_from_app, message_result, success_message};
use crate::services::{AuthService, ChangePasswordRequest, LoginRequest, RefreshRequest};

pub async fn login(
    body: web::Json<LoginRequest>,
    auth: web::Data<Arc<AuthService>>,
) -> HttpResponse {
    match auth.login(body.into_inner()).await {
        Ok(resp) => success_message(messages::SUCCESS, Some(resp)),
        Err(e) => error_from_app(&e),
    }
}

pub async fn refresh(
    body: web::Json<RefreshRequest>,
    auth: web::Data<Arc<AuthService>>,
) -> HttpResponse {
    api_result(auth.refresh(body.into_inner()).await)
}

pub async fn logout(user: AuthUser) -> HttpResponse {
    info!("Admin API: user {} logged out", user.username);
    success_message::<()>(messages::LOGOUT, None)
}

pub async fn me(user: AuthUser, auth: web::Data<Arc<AuthService>>) -> HttpResponse {
    api_result(auth.me(user.id).await)
}

pub async fn change_password(
    user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
    auth: web::Data<Arc<AuthService>>,
) -> HttpResponse {
    message_result(
        auth.change_password(user.id, body.into_inner()).await,
        messages::PASSWORD_CHANGED,
    )
}
