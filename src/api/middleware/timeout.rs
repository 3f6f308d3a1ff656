//! Request timeout
//!
//! handler future 超过 `server.request_timeout_secs` 未完成时直接返回 504，
//! future 被 drop，未完成的数据库操作在下一个 await 点取消。

use std::rc::Rc;
use std::time::Duration;

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    dev::{ServiceRequest, ServiceResponse},
    error::InternalError,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::warn;

use crate::api::constants::messages;
use crate::api::services::helpers::error_from_app;
use crate::errors::AppError;

#[derive(Clone)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs.max(1)))
    }
}

impl<S, B> Transform<S, ServiceRequest> for Timeout
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TimeoutService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TimeoutService {
            service: Rc::new(service),
            duration: self.duration,
        }))
    }
}

pub struct TimeoutService<S> {
    service: Rc<S>,
    duration: Duration,
}

impl<S, B> Service<ServiceRequest> for TimeoutService<S>
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
        let duration = self.duration;
        // 只保留路径字符串；持有 HttpRequest 的克隆会让路由匹配失败
        let path = req.path().to_string();

        Box::pin(async move {
            match tokio::time::timeout(duration, srv.call(req)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Request timed out after {:?}: {}", duration, path);
                    let err = AppError::Timeout(messages::REQUEST_TIMEOUT.into());
                    let resp = error_from_app(&err);
                    Err(InternalError::from_response(err, resp).into())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test, web};

    async fn slow() -> HttpResponse {
        tokio::time::sleep(Duration::from_millis(200)).await;
        HttpResponse::Ok().finish()
    }

    #[actix_rt::test]
    async fn test_slow_handler_gets_504() {
        let app = test::init_service(
            App::new()
                .wrap(Timeout::new(Duration::from_millis(20)))
                .route("/slow", web::get().to(slow))
                .route("/fast", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let err = test::try_call_service(&app, test::TestRequest::get().uri("/slow").to_request())
            .await
            .err()
            .expect("slow handler should time out");
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], messages::REQUEST_TIMEOUT);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/fast").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
