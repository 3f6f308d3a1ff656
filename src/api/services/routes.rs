//! API 路由表
//!
//! - `{api_prefix}`：前台公开接口，文章与生活记录挂 public 限流，发表评论挂 comment 限流
//! - `{api_prefix}{admin_prefix}`：后台接口，login / refresh 之外都需要 JWT
//! - `{api_prefix}/webhook`：外部记账，HMAC 签名校验

use std::sync::Arc;

use actix_web::dev::HttpServiceFactory;
use actix_web::web;

use crate::api::jwt::JwtService;
use crate::api::middleware::{
    AdminAuth, BillSignature, FixedWindowLimiter, RateLimit, RateLimiters, refresh_rate_limiter,
};
use crate::config::AppConfig;

use super::admin::{analytics, auth, comments, config_ops, content, ledger, upload};
use super::public;

/// 路由构建所需的共享对象，在 `HttpServer::new` 闭包外构造一次
#[derive(Clone)]
pub struct RouteContext {
    pub jwt: Arc<JwtService>,
    pub limiters: RateLimiters,
    pub trusted_proxies: Arc<Vec<String>>,
    pub admin_prefix: String,
    pub bill_secret: String,
    pub max_body_size: usize,
}

impl RouteContext {
    pub fn new(config: &AppConfig, jwt: Arc<JwtService>, limiters: RateLimiters) -> Self {
        Self {
            jwt,
            limiters,
            trusted_proxies: Arc::new(config.server.trusted_proxies.clone()),
            admin_prefix: config.server.admin_prefix.clone(),
            bill_secret: config.webhook.bill_secret.clone(),
            max_body_size: config.server.max_body_size,
        }
    }

    fn limit(&self, limiter: &Arc<FixedWindowLimiter>) -> RateLimit {
        RateLimit::new(limiter.clone(), self.trusted_proxies.clone())
    }
}

/// `{api_prefix}` 下的全部路由
pub fn api_routes(prefix: &str, ctx: &RouteContext) -> actix_web::Scope {
    web::scope(prefix)
        .service(admin_routes(ctx))
        .service(webhook_routes(ctx))
        .service(posts_routes(ctx))
        .service(life_routes(ctx))
        .route("/archives", web::get().to(public::archives))
        .route("/tags", web::get().to(public::list_tags))
        .route("/tags/{slug}", web::get().to(public::tag_detail))
        .service(
            web::resource("/comments")
                .route(web::get().to(public::list_comments))
                .route(
                    web::post()
                        .to(public::create_comment)
                        .wrap(ctx.limit(&ctx.limiters.comment)),
                ),
        )
        .route("/config", web::get().to(public::site_config))
        .route("/contributions", web::get().to(public::contributions))
        .route("/rss", web::get().to(public::rss_all))
        .route("/rss/posts", web::get().to(public::rss_posts))
        .route("/rss/life", web::get().to(public::rss_life))
        .route("/sitemap.xml", web::get().to(public::sitemap))
        .route("/robots.txt", web::get().to(public::robots))
        .route("/analytics/track", web::post().to(public::track_event))
        .route("/analytics/pageview", web::post().to(public::track_pageview))
}

fn posts_routes(ctx: &RouteContext) -> impl HttpServiceFactory + 'static {
    // 静态段必须在 /{slug} 之前
    web::scope("/posts")
        .wrap(ctx.limit(&ctx.limiters.public))
        .route("", web::get().to(public::list_posts))
        .route("/featured", web::get().to(public::featured_posts))
        .route("/recent", web::get().to(public::recent_posts))
        .route("/{id}/views", web::post().to(public::record_post_view))
        .route("/{slug}", web::get().to(public::get_post))
}

fn life_routes(ctx: &RouteContext) -> impl HttpServiceFactory + 'static {
    web::scope("/life")
        .wrap(ctx.limit(&ctx.limiters.public))
        .route("", web::get().to(public::list_life))
        .route("/{id}/views", web::post().to(public::record_life_view))
        .route("/{id}", web::get().to(public::get_life))
}

/// 后台路由 `{admin_prefix}`
pub fn admin_routes(ctx: &RouteContext) -> actix_web::Scope {
    let trusted = ctx.trusted_proxies.clone();

    web::scope(&ctx.admin_prefix)
        .route(
            "/login",
            web::post()
                .to(auth::login)
                .wrap(ctx.limit(&ctx.limiters.login)),
        )
        .configure(move |cfg| match refresh_rate_limiter(trusted) {
            Some(governor) => {
                cfg.route("/refresh", web::post().to(auth::refresh).wrap(governor));
            }
            None => {
                cfg.route("/refresh", web::post().to(auth::refresh));
            }
        })
        .service(
            web::scope("")
                .wrap(AdminAuth::new(ctx.jwt.clone()))
                .route("/logout", web::post().to(auth::logout))
                .route("/me", web::get().to(auth::me))
                .route("/change-password", web::post().to(auth::change_password))
                .service(admin_posts_routes())
                .service(admin_life_routes())
                .service(admin_tags_routes())
                .service(admin_comments_routes())
                .route("/config", web::get().to(config_ops::get_configs))
                .route("/config", web::put().to(config_ops::update_configs))
                .route(
                    "/upload",
                    web::post()
                        .to(upload::upload_file)
                        .wrap(ctx.limit(&ctx.limiters.upload)),
                )
                .service(admin_analytics_routes())
                .service(admin_bills_routes())
                .service(admin_categories_routes()),
        )
}

fn admin_posts_routes() -> actix_web::Scope {
    web::scope("/posts")
        .route("", web::get().to(content::list_posts))
        .route("", web::post().to(content::create_post))
        .route("/{id}", web::get().to(content::get_post))
        .route("/{id}", web::put().to(content::update_post))
        .route("/{id}", web::delete().to(content::delete_post))
}

fn admin_life_routes() -> actix_web::Scope {
    web::scope("/life")
        .route("", web::get().to(content::list_life))
        .route("", web::post().to(content::create_life))
        .route("/{id}", web::get().to(content::get_life))
        .route("/{id}", web::put().to(content::update_life))
        .route("/{id}", web::delete().to(content::delete_life))
}

fn admin_tags_routes() -> actix_web::Scope {
    web::scope("/tags")
        .route("", web::get().to(content::list_tags))
        .route("", web::post().to(content::create_tag))
        .route("/{id}", web::put().to(content::update_tag))
        .route("/{id}", web::delete().to(content::delete_tag))
}

fn admin_comments_routes() -> actix_web::Scope {
    web::scope("/comments")
        .route("", web::get().to(comments::list_comments))
        .route("/{id}/toggle-pin", web::post().to(comments::toggle_pin))
        .route("/{id}/reply", web::post().to(comments::reply))
        .route("/{id}", web::put().to(comments::update_status))
        .route("/{id}", web::delete().to(comments::delete_comment))
}

fn admin_analytics_routes() -> actix_web::Scope {
    web::scope("/analytics")
        .route("/overview", web::get().to(analytics::overview))
        .route("/visits", web::get().to(analytics::visits))
        .route("/popular", web::get().to(analytics::popular))
        .route("/events", web::get().to(analytics::events))
        .route("/charts", web::get().to(analytics::charts))
}

fn admin_bills_routes() -> actix_web::Scope {
    // 统计类静态路径必须在 /{id} 之前
    web::scope("/bills")
        .route("", web::get().to(ledger::list_bills))
        .route("", web::post().to(ledger::create_bill))
        .route("/statistics", web::get().to(ledger::statistics))
        .route("/daily-trend", web::get().to(ledger::daily_trend))
        .route("/monthly-trend", web::get().to(ledger::monthly_trend))
        .route("/category-ranking", web::get().to(ledger::category_ranking))
        .route("/{id}/refund", web::post().to(ledger::refund_bill))
        .route("/{id}/chargeback", web::post().to(ledger::chargeback_bill))
        .route("/{id}", web::get().to(ledger::get_bill))
        .route("/{id}", web::put().to(ledger::update_bill))
        .route("/{id}", web::delete().to(ledger::delete_bill))
}

fn admin_categories_routes() -> actix_web::Scope {
    web::scope("/categories")
        .route("", web::get().to(ledger::list_categories))
        .route("", web::post().to(ledger::create_category))
        .route("/{id}", web::delete().to(ledger::delete_category))
}

/// 外部记账 webhook `/webhook`
pub fn webhook_routes(ctx: &RouteContext) -> impl HttpServiceFactory + 'static {
    web::scope("/webhook")
        .wrap(BillSignature::new(&ctx.bill_secret, ctx.max_body_size))
        .route("/bills", web::post().to(ledger::create_bill))
        .route("/bills/{id}/refund", web::post().to(ledger::refund_bill))
        .route("/bills/{id}/chargeback", web::post().to(ledger::chargeback_bill))
}
