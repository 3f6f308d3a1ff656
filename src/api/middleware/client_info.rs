//! 访客信息提取（IP / User-Agent / Referer）
//!
//! 作为 handler 参数直接提取 [`Visitor`]。可信代理列表从 `web::Data<Arc<AppConfig>>` 读取，
//! 未注入配置时只信任连接对端地址。

use std::sync::Arc;

use actix_web::{
    Error, FromRequest, HttpRequest,
    dev::Payload,
    http::header::{REFERER, USER_AGENT},
    web,
};
use futures_util::future::{Ready, ready};

use crate::config::AppConfig;
use crate::services::Visitor;
use crate::utils::ip::client_ip;
use crate::utils::text::take_chars;

const MAX_UA_LEN: usize = 500;
const MAX_REFERER_LEN: usize = 500;

fn header_value(req: &HttpRequest, name: actix_web::http::header::HeaderName) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn visitor_from_request(req: &HttpRequest) -> Visitor {
    let trusted: &[String] = req
        .app_data::<web::Data<Arc<AppConfig>>>()
        .map(|cfg| cfg.server.trusted_proxies.as_slice())
        .unwrap_or_default();

    Visitor {
        ip: client_ip(req, trusted),
        user_agent: take_chars(&header_value(req, USER_AGENT), MAX_UA_LEN).to_string(),
        referer: take_chars(&header_value(req, REFERER), MAX_REFERER_LEN).to_string(),
    }
}

impl FromRequest for Visitor {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(visitor_from_request(req)))
    }
}
