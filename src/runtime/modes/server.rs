//! Server mode
//!
//! 构造共享对象（service、限流器、路由上下文）后启动 HTTP 服务，并等待关闭信号。

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::Result;
use tracing::{info, warn};

use crate::api::middleware::{
    CatchPanic, RateLimiters, RequestIdMiddleware, Timeout, TimingMiddleware,
};
use crate::api::services::helpers::{json_error_handler, path_error_handler, query_error_handler};
use crate::api::services::{RouteContext, api_routes, health_routes};
use crate::config::{AppConfig, CorsConfig};
use crate::runtime::lifetime;
use crate::services::AppServices;

/// 注册 app_data、请求解析配置和全部路由
///
/// 中间件由调用方 `wrap`，集成测试可以只用这一部分。
pub fn configure_app(
    config: Arc<AppConfig>,
    services: AppServices,
    routes: RouteContext,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(services.auth.clone()))
            .app_data(web::Data::new(services.posts.clone()))
            .app_data(web::Data::new(services.life.clone()))
            .app_data(web::Data::new(services.tags.clone()))
            .app_data(web::Data::new(services.comments.clone()))
            .app_data(web::Data::new(services.bills.clone()))
            .app_data(web::Data::new(services.categories.clone()))
            .app_data(web::Data::new(services.site_config.clone()))
            .app_data(web::Data::new(services.analytics.clone()))
            .app_data(web::Data::new(services.feeds.clone()))
            .app_data(web::Data::new(services.uploads.clone()))
            .app_data(web::Data::new(services.contributions.clone()))
            .app_data(
                web::JsonConfig::default()
                    .limit(config.server.max_body_size)
                    .error_handler(json_error_handler),
            )
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .app_data(web::PathConfig::default().error_handler(path_error_handler))
            .service(health_routes())
            .service(api_routes(&config.server.api_prefix, &routes));
    }
}

/// 按配置构造 CORS 中间件
///
/// 未启用时使用 actix-cors 默认的同源策略；`allowed_origins` 为空或含 `*` 时允许任意来源，
/// 此时强制关闭 credentials。
fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    if !cors_config.enabled {
        return Cors::default();
    }

    let any_origin =
        cors_config.allowed_origins.is_empty() || cors_config.allowed_origins.iter().any(|o| o == "*");

    let mut cors = Cors::default();
    if any_origin {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    let methods: Vec<actix_web::http::Method> = cors_config
        .allowed_methods
        .iter()
        .filter_map(|m| m.to_uppercase().parse().ok())
        .collect();
    if !methods.is_empty() {
        cors = cors.allowed_methods(methods);
    }

    for header in &cors_config.allowed_headers {
        cors = cors.allowed_header(header.as_str());
    }
    cors = cors.max_age(cors_config.max_age);

    if cors_config.allow_credentials && !any_origin {
        cors = cors.supports_credentials();
    }
    cors
}

fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "SAMEORIGIN"))
        .add(("X-XSS-Protection", "1; mode=block"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
        .add(("X-Powered-By", "inkpost"))
}

/// 完整的 App：生产中间件链 + [`configure_app`]
///
/// 每个 worker 调用一次；集成测试用它验证中间件链与路由的组合。
pub fn build_app(
    config: Arc<AppConfig>,
    services: AppServices,
    routes: RouteContext,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let cors = build_cors_middleware(&config.cors);
    let request_timeout = config.server.request_timeout_secs;
    let slow_request_ms = config.server.slow_request_ms;

    App::new()
        .wrap(Timeout::from_secs(request_timeout))
        .wrap(CatchPanic)
        .wrap(security_headers())
        .wrap(Compress::default())
        .wrap(cors)
        .wrap(RequestIdMiddleware)
        .wrap(TimingMiddleware::new(slow_request_ms)) // 最外层，记录完整耗时
        .configure(configure_app(config, services, routes))
}

/// Run the HTTP server
///
/// **Note**: 调用前必须已初始化日志
pub async fn run_server(config: Arc<AppConfig>) -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup(config)
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;

    let config = startup.config.clone();
    let services = startup.services.clone();

    // 限流器在 worker 之间共享，必须在 HttpServer 闭包外构造
    let limiters = RateLimiters::new(&config.rate_limit);
    limiters.spawn_sweepers();
    let routes = RouteContext::new(&config, services.auth.jwt(), limiters);

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let db_for_shutdown = startup.storage.get_db().clone();

    let app_config = config.clone();
    let server = HttpServer::new(move || {
        build_app(app_config.clone(), services.clone(), routes.clone())
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(5))
    .client_disconnect_timeout(Duration::from_secs(1))
    .workers(cpu_count)
    .bind(&bind_address)?;

    warn!("Using {} worker threads", cpu_count);
    info!(
        "Starting server at http://{} (api: {})",
        bind_address, config.server.api_prefix
    );

    let server = server.run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&db_for_shutdown) => {
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{HttpResponse, test};

    #[actix_rt::test]
    async fn test_security_headers_present() {
        let app = test::init_service(
            App::new()
                .wrap(security_headers())
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        let headers = resp.headers();
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("x-frame-options").unwrap(), "SAMEORIGIN");
        assert_eq!(headers.get("x-powered-by").unwrap(), "inkpost");
    }

    #[actix_rt::test]
    async fn test_cors_allows_configured_origin() {
        let cors_config = CorsConfig {
            enabled: true,
            allowed_origins: vec!["https://blog.example.com".into()],
            allowed_methods: vec!["get".into(), "post".into()],
            allowed_headers: vec!["Content-Type".into()],
            max_age: 600,
            allow_credentials: true,
        };
        let app = test::init_service(
            App::new()
                .wrap(build_cors_middleware(&cors_config))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/")
                .insert_header(("Origin", "https://blog.example.com"))
                .to_request(),
        )
        .await;
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "https://blog.example.com"
        );
    }
}
