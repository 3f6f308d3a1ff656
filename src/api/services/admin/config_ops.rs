//! Admin API 站点配置
//!
//! `GET /config` 返回原始 key → value 映射；`PUT /config` 批量 upsert。

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::api::constants::messages;
use crate::api::services::helpers::{api_result, message_result};
use crate::services::{SiteConfigService, UpdateConfigRequest};

pub async fn get_configs(site_config: web::Data<Arc<SiteConfigService>>) -> HttpResponse {
    api_result(site_config.raw_map().await)
}

pub async fn update_configs(
    body: web::Json<UpdateConfigRequest>,
    site_config: web::Data<Arc<SiteConfigService>>,
) -> HttpResponse {
    let req = body.into_inner();
    info!("Admin API: updating {} config keys", req.configs.len());
    message_result(site_config.update(req).await, messages::UPDATED)
}
