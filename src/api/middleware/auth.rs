//! JWT 认证中间件
//!
//! - [`AdminAuth`]：后台接口，缺少或无效的 Bearer token 直接返回 401
//! - [`OptionalAuth`]：有合法 token 时附加身份，否则照常放行
//!
//! 认证通过后 [`AuthUser`] 写入 request extensions，handler 直接作为参数提取。

use actix_service::{Service, Transform};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
    body::EitherBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::{Method, header::AUTHORIZATION},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::api::constants::BEARER_PREFIX;
use crate::api::jwt::JwtService;
use crate::api::services::helpers::error_from_app;
use crate::errors::AppError;

/// 通过认证的管理员身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<AuthUser>().cloned();
        ready(user.ok_or_else(|| {
            let err = AppError::TokenMissing("authorization required".into());
            actix_web::error::InternalError::from_response("unauthorized", error_from_app(&err))
                .into()
        }))
    }
}

/// 解析 Authorization 头并校验 access token
fn authenticate(req: &ServiceRequest, jwt: &JwtService) -> Result<AuthUser, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::TokenMissing("missing authorization header".into()))?;
    let value = header
        .to_str()
        .map_err(|_| AppError::TokenMalformed("malformed authorization header".into()))?;
    let token = value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::TokenMalformed("authorization header must be 'Bearer <token>'".into())
        })?;

    let claims = jwt.validate_access_token(token)?;
    Ok(AuthUser {
        id: claims.user_id()?,
        username: claims.username,
    })
}

// ============ AdminAuth ============

#[derive(Clone)]
pub struct AdminAuth {
    jwt: Arc<JwtService>,
}

impl AdminAuth {
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthMiddleware {
            service: Rc::new(service),
            jwt: self.jwt.clone(),
        }))
    }
}

pub struct AdminAuthMiddleware<S> {
    service: Rc<S>,
    jwt: Arc<JwtService>,
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddleware<S>
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
        let srv = self.service.clone();
        let jwt = self.jwt.clone();

        Box::pin(async move {
            // CORS 预检不带 token
            if req.method() == Method::OPTIONS {
                return Ok(req.into_response(HttpResponse::NoContent().finish().map_into_right_body()));
            }

            match authenticate(&req, &jwt) {
                Ok(user) => {
                    trace!("Admin request authenticated as '{}'", user.username);
                    req.extensions_mut().insert(user);
                    Ok(srv.call(req).await?.map_into_left_body())
                }
                Err(e) => {
                    info!("Admin authentication failed on {}: {}", req.path(), e.message());
                    let response = error_from_app(&e);
                    Ok(req.into_response(response.map_into_right_body()))
                }
            }
        })
    }
}

// ============ OptionalAuth ============

#[derive(Clone)]
pub struct OptionalAuth {
    jwt: Arc<JwtService>,
}

impl OptionalAuth {
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }
}

impl<S, B> Transform<S, ServiceRequest> for OptionalAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = OptionalAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(OptionalAuthMiddleware {
            service: Rc::new(service),
            jwt: self.jwt.clone(),
        }))
    }
}

pub struct OptionalAuthMiddleware<S> {
    service: Rc<S>,
    jwt: Arc<JwtService>,
}

impl<S, B> Service<ServiceRequest> for OptionalAuthMiddleware<S>
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

        if req.headers().contains_key(AUTHORIZATION) {
            match authenticate(&req, &self.jwt) {
                Ok(user) => {
                    req.extensions_mut().insert(user);
                }
                Err(e) => debug!("Ignoring invalid optional token: {}", e.message()),
            }
        }

        Box::pin(async move { srv.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test, web};

    const SECRET: &str = "middleware_test_secret_0123456789";

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::new(SECRET, "inkpost", 15, 7))
    }

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.username)
    }

    async fn maybe(req: HttpRequest) -> HttpResponse {
        let name = req
            .extensions()
            .get::<AuthUser>()
            .map(|u| u.username.clone())
            .unwrap_or_else(|| "guest".into());
        HttpResponse::Ok().body(name)
    }

    async fn error_code(resp: ServiceResponse<impl actix_web::body::MessageBody>) -> i64 {
        let body: serde_json::Value = test::read_body_json(resp).await;
        body["code"].as_i64().unwrap_or_default()
    }

    #[actix_rt::test]
    async fn test_admin_auth_distinguishes_failures() {
        let jwt = jwt();
        let app = test::init_service(
            App::new().service(
                web::scope("/admin")
                    .wrap(AdminAuth::new(jwt.clone()))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let missing = test::call_service(&app, test::TestRequest::get().uri("/admin/me").to_request()).await;
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        let missing_code = error_code(missing).await;

        let malformed = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/admin/me")
                .insert_header(("Authorization", "Basic abc"))
                .to_request(),
        )
        .await;
        assert_eq!(malformed.status(), StatusCode::UNAUTHORIZED);
        let malformed_code = error_code(malformed).await;

        let invalid = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/admin/me")
                .insert_header(("Authorization", "Bearer not-a-jwt"))
                .to_request(),
        )
        .await;
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
        let invalid_code = error_code(invalid).await;

        assert_ne!(missing_code, malformed_code);
        assert_ne!(malformed_code, invalid_code);

        let token = jwt.generate_access_token(7, "admin").unwrap();
        let ok = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/admin/me")
                .insert_header(("Authorization", format!("Bearer {}", token)))
                .to_request(),
        )
        .await;
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(test::read_body(ok).await, "admin");
    }

    #[actix_rt::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let jwt = jwt();
        let app = test::init_service(
            App::new().service(
                web::scope("/admin")
                    .wrap(AdminAuth::new(jwt.clone()))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let refresh = jwt.generate_refresh_token(1, "admin").unwrap();
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/admin/me")
                .insert_header(("Authorization", format!("Bearer {}", refresh)))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_optional_auth_never_rejects() {
        let jwt = jwt();
        let app = test::init_service(
            App::new()
                .wrap(OptionalAuth::new(jwt.clone()))
                .route("/", web::get().to(maybe)),
        )
        .await;

        let anonymous = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/")
                .insert_header(("Authorization", "Bearer garbage"))
                .to_request(),
        )
        .await;
        assert_eq!(anonymous.status(), StatusCode::OK);
        assert_eq!(test::read_body(anonymous).await, "guest");

        let token = jwt.generate_access_token(1, "admin").unwrap();
        let known = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/")
                .insert_header(("Authorization", format!("Bearer {}", token)))
                .to_request(),
        )
        .await;
        assert_eq!(test::read_body(known).await, "admin");
    }
}
