//! Panic recovery
//!
//! handler 内的 panic 转为 500 响应，worker 继续服务后续请求。
//! 依赖 `panic = "unwind"`；panic 信息由全局 panic hook 记录。

use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    dev::{ServiceRequest, ServiceResponse},
    error::InternalError,
};
use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::error;

use crate::api::constants::messages;
use crate::api::services::helpers::error_from_app;
use crate::errors::AppError;

#[derive(Clone, Default)]
pub struct CatchPanic;

impl<S, B> Transform<S, ServiceRequest> for CatchPanic
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = CatchPanicService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CatchPanicService {
            service: Rc::new(service),
        }))
    }
}

pub struct CatchPanicService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for CatchPanicService<S>
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
        // 不能克隆 HttpRequest：内层路由需要独占它来写入 match_info
        let path = req.path().to_string();

        Box::pin(async move {
            match AssertUnwindSafe(srv.call(req)).catch_unwind().await {
                Ok(result) => result,
                Err(_) => {
                    error!("Handler panicked on {}", path);
                    let err = AppError::internal(messages::INTERNAL_ERROR);
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

    async fn boom() -> HttpResponse {
        panic!("boom");
    }

    #[actix_rt::test]
    async fn test_panic_becomes_500() {
        let app = test::init_service(
            App::new()
                .wrap(CatchPanic)
                .route("/boom", web::get().to(boom))
                .route("/ok", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let err = test::try_call_service(&app, test::TestRequest::get().uri("/boom").to_request())
            .await
            .err()
            .expect("panic should surface as an error");
        assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/ok").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
