//! HTTP timing middleware
//!
//! 记录每个请求的耗时与状态码。超过 `server.slow_request_ms` 的请求记 warn，其余记 debug。

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct TimingMiddleware {
    slow_threshold: Duration,
}

impl TimingMiddleware {
    pub fn new(slow_request_ms: u64) -> Self {
        Self {
            slow_threshold: Duration::from_millis(slow_request_ms),
        }
    }
}

impl Default for TimingMiddleware {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl<S, B> Transform<S, ServiceRequest> for TimingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TimingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TimingService {
            service: Rc::new(service),
            slow_threshold: self.slow_threshold,
        }))
    }
}

pub struct TimingService<S> {
    service: Rc<S>,
    slow_threshold: Duration,
}

impl<S, B> Service<ServiceRequest> for TimingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let slow_threshold = self.slow_threshold;
        let method = req.method().clone();
        let path = req.path().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let result = srv.call(req).await;
            let elapsed = start.elapsed();
            let status = match &result {
                Ok(response) => response.status().as_u16(),
                Err(e) => e.as_response_error().status_code().as_u16(),
            };
            let elapsed_ms = elapsed.as_secs_f64() * 1000.0;

            if elapsed >= slow_threshold {
                warn!(
                    "Slow request: {} {} -> {} in {:.1}ms",
                    method, path, status, elapsed_ms
                );
            } else {
                debug!("{} {} -> {} in {:.1}ms", method, path, status, elapsed_ms);
            }
            result
        })
    }
}
