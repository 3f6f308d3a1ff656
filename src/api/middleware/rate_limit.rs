//! 固定窗口限流
//!
//! 每个 [`FixedWindowLimiter`] 维护一张 `key -> 计数` 表，key 默认为客户端 IP。
//! 限流器在启动时构造一次，所有 worker 通过 `Arc` 共享；
//! 后台清理任务只持有 `Weak`，限流器释放后自动退出。
//!
//! 刷新 token 接口另外挂一个 actix-governor 令牌桶，限制短时突发。

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_service::{Service, Transform};
use actix_web::{
    Error,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use governor::middleware::NoOpMiddleware;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::api::constants::messages;
use crate::api::services::helpers::error_from_app;
use crate::config::RateLimitRule;
use crate::errors::AppError;
use crate::utils::ip::client_ip;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
    last_seen: Instant,
}

/// 固定窗口计数器
pub struct FixedWindowLimiter {
    name: &'static str,
    limit: u32,
    window: Duration,
    visitors: RwLock<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(name: &'static str, rule: &RateLimitRule) -> Self {
        Self {
            name,
            limit: rule.limit.max(1),
            window: Duration::from_secs(rule.window_secs.max(1)),
            visitors: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 记一次请求，超出窗口内上限返回 false
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut visitors = self.visitors.write();
        let entry = visitors.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
            last_seen: now,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        entry.last_seen = now;

        if entry.count >= self.limit {
            return false;
        }
        entry.count += 1;
        true
    }

    /// 删除空闲超过两个窗口的条目，返回删除数
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let idle = self.window * 2;
        let mut visitors = self.visitors.write();
        let before = visitors.len();
        visitors.retain(|_, w| now.duration_since(w.last_seen) <= idle);
        before - visitors.len()
    }

    pub fn len(&self) -> usize {
        self.visitors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 启动清理任务，需要在 tokio runtime 内调用
    pub fn spawn_sweeper(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.window;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    debug!("Rate limiter dropped, sweeper exiting");
                    break;
                };
                let removed = limiter.sweep();
                if removed > 0 {
                    debug!("Rate limiter '{}' swept {} idle entries", limiter.name, removed);
                }
            }
        });
    }
}

/// 各路由类别的限流器
#[derive(Clone)]
pub struct RateLimiters {
    pub public: Arc<FixedWindowLimiter>,
    pub comment: Arc<FixedWindowLimiter>,
    pub login: Arc<FixedWindowLimiter>,
    pub upload: Arc<FixedWindowLimiter>,
}

impl RateLimiters {
    pub fn new(config: &crate::config::RateLimitConfig) -> Self {
        Self {
            public: Arc::new(FixedWindowLimiter::new("public", &config.public)),
            comment: Arc::new(FixedWindowLimiter::new("comment", &config.comment)),
            login: Arc::new(FixedWindowLimiter::new("login", &config.login)),
            upload: Arc::new(FixedWindowLimiter::new("upload", &config.upload)),
        }
    }

    pub fn spawn_sweepers(&self) {
        for limiter in [&self.public, &self.comment, &self.login, &self.upload] {
            limiter.spawn_sweeper();
            info!(
                "Rate limiter '{}': {} req / {:?}",
                limiter.name(),
                limiter.limit,
                limiter.window()
            );
        }
    }
}

// ============ 中间件 ============

/// 以客户端 IP 为 key 的限流中间件
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<FixedWindowLimiter>,
    trusted_proxies: Arc<Vec<String>>,
}

impl RateLimit {
    pub fn new(limiter: Arc<FixedWindowLimiter>, trusted_proxies: Arc<Vec<String>>) -> Self {
        Self {
            limiter,
            trusted_proxies,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            trusted_proxies: self.trusted_proxies.clone(),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: Arc<FixedWindowLimiter>,
    trusted_proxies: Arc<Vec<String>>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let key = client_ip(req.request(), &self.trusted_proxies);

        if !self.limiter.check(&key) {
            warn!(
                "Rate limit '{}' exceeded by {} on {}",
                self.limiter.name(),
                key,
                req.path()
            );
            let err = AppError::RateLimited(messages::TOO_MANY_REQUESTS.into());
            let response = error_from_app(&err).map_into_right_body();
            return Box::pin(async move { Ok(req.into_response(response)) });
        }

        let srv = self.service.clone();
        Box::pin(async move { Ok(srv.call(req).await?.map_into_left_body()) })
    }
}

// ============ 刷新接口的令牌桶 ============

/// governor 的 key 提取，与固定窗口共用可信代理规则
#[derive(Clone)]
pub struct ClientIpKeyExtractor {
    trusted_proxies: Arc<Vec<String>>,
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        Ok(client_ip(req.request(), &self.trusted_proxies))
    }
}

/// 每秒补充 1 个令牌，突发最多 5 次
pub fn refresh_rate_limiter(
    trusted_proxies: Arc<Vec<String>>,
) -> Option<Governor<ClientIpKeyExtractor, NoOpMiddleware>> {
    let config = GovernorConfigBuilder::default()
        .seconds_per_request(1)
        .burst_size(5)
        .key_extractor(ClientIpKeyExtractor { trusted_proxies })
        .finish()?;
    debug!("Refresh rate limiter created: 1 req/s, burst 5");
    Some(Governor::new(&config))
}
