//! 集成测试公共部分：临时 SQLite 库 + 完整路由表

#![allow(dead_code)]

use std::sync::Arc;

use inkpost::api::middleware::RateLimiters;
use inkpost::api::services::RouteContext;
use inkpost::config::AppConfig;
use inkpost::services::AppServices;
use inkpost::storage::StorageFactory;
use tempfile::TempDir;

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";
pub const BILL_SECRET: &str = "webhook-test-secret";

pub struct TestEnv {
    pub config: Arc<AppConfig>,
    pub services: AppServices,
    pub routes: RouteContext,
    _dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> AppConfig {
    let db_path = dir.path().join("inkpost.db");
    let mut config = AppConfig::default();
    config.database.database_url = format!("sqlite://{}?mode=rwc", db_path.display());
    config.database.pool_size = 2;
    config.jwt.secret = "integration-test-jwt-secret-0123456789".into();
    config.admin.username = ADMIN_USER.into();
    config.admin.password = ADMIN_PASSWORD.into();
    config.admin.email = "admin@example.com".into();
    config.webhook.bill_secret = BILL_SECRET.into();
    config.server.site_url = "https://blog.example.com".into();
    config
}

pub async fn setup_with(mutate: impl FnOnce(&mut AppConfig)) -> TestEnv {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    mutate(&mut config);
    let config = Arc::new(config);

    let storage = StorageFactory::create(&config.database).await.unwrap();
    let services = AppServices::new(storage, config.clone());
    services.auth.seed_admin().await.unwrap();

    let limiters = RateLimiters::new(&config.rate_limit);
    let routes = RouteContext::new(&config, services.auth.jwt(), limiters);

    TestEnv {
        config,
        services,
        routes,
        _dir: dir,
    }
}

pub async fn setup() -> TestEnv {
    setup_with(|_| {}).await
}

/// 用 TestEnv 构造 actix 测试服务
#[macro_export]
macro_rules! init_app {
    ($env:expr) => {
        actix_web::test::init_service(actix_web::App::new().configure(
            inkpost::runtime::modes::configure_app(
                $env.config.clone(),
                $env.services.clone(),
                $env.routes.clone(),
            ),
        ))
        .await
    };
}

/// 与生产环境相同的中间件链 + 路由表
#[macro_export]
macro_rules! init_server_app {
    ($env:expr) => {
        actix_web::test::init_service(inkpost::runtime::modes::build_app(
            $env.config.clone(),
            $env.services.clone(),
            $env.routes.clone(),
        ))
        .await
    };
}

/// 登录并返回 access token
#[macro_export]
macro_rules! login {
    ($app:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/admin/login")
            .peer_addr("127.0.0.1:40000".parse().unwrap())
            .set_json(serde_json::json!({
                "username": common::ADMIN_USER,
                "password": common::ADMIN_PASSWORD,
            }))
            .to_request();
        let body: serde_json::Value = actix_web::test::call_and_read_body_json(&$app, req).await;
        body["data"]["access_token"]
            .as_str()
            .expect("login should return an access token")
            .to_string()
    }};
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
