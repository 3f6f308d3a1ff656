//! 账单 webhook 签名校验
//!
//! 签名为 `hex(sha256(secret + "\n" + timestamp + "\n" + body))`，
//! 时间戳与服务器时间相差不能超过 5 分钟。请求体读取一次后放回，handler 照常解析 JSON。

use std::rc::Rc;
use std::sync::Arc;

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    web::{Bytes, BytesMut},
};
use chrono::Utc;
use futures_util::StreamExt;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::api::constants::{BILL_SIGNATURE_HEADER, BILL_TIMESTAMP_HEADER, WEBHOOK_MAX_SKEW_SECS};
use crate::api::services::helpers::error_from_app;
use crate::errors::AppError;

/// 计算签名（小写 hex）
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b"\n");
    hasher.update(timestamp.as_bytes());
    hasher.update(b"\n");
    hasher.update(body);
    hex::encode(hasher.finalize())
}

fn header<'a>(req: &'a ServiceRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// 校验时间戳与签名；body 由调用方读出
pub fn verify(
    secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now: i64,
) -> Result<(), AppError> {
    if secret.is_empty() {
        return Err(AppError::not_configured("webhook secret is not configured"));
    }
    let timestamp =
        timestamp.ok_or_else(|| AppError::validation("missing X-Bill-Timestamp header"))?;
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| AppError::validation("invalid X-Bill-Timestamp header"))?;
    let signature = signature
        .ok_or_else(|| AppError::SignatureInvalid("missing X-Bill-Signature header".into()))?;

    if now.abs_diff(ts) > WEBHOOK_MAX_SKEW_SECS as u64 {
        return Err(AppError::TimestampOutOfRange(
            "request timestamp is out of range".into(),
        ));
    }

    let expected = sign(secret, timestamp, body);
    let provided = signature.to_ascii_lowercase();
    if expected.as_bytes().ct_eq(provided.as_bytes()).into() {
        Ok(())
    } else {
        Err(AppError::SignatureInvalid("signature mismatch".into()))
    }
}

// ============ 中间件 ============

#[derive(Clone)]
pub struct BillSignature {
    secret: Arc<String>,
    max_body_size: usize,
}

impl BillSignature {
    pub fn new(secret: &str, max_body_size: usize) -> Self {
        Self {
            secret: Arc::new(secret.to_string()),
            max_body_size,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BillSignature
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = BillSignatureMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BillSignatureMiddleware {
            service: Rc::new(service),
            secret: self.secret.clone(),
            max_body_size: self.max_body_size,
        }))
    }
}

pub struct BillSignatureMiddleware<S> {
    service: Rc<S>,
    secret: Arc<String>,
    max_body_size: usize,
}

impl<S, B> Service<ServiceRequest> for BillSignatureMiddleware<S>
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

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let secret = self.secret.clone();
        let max_body_size = self.max_body_size;

        Box::pin(async move {
            let mut payload = req.take_payload();
            let mut body = BytesMut::new();
            while let Some(chunk) = payload.next().await {
                let chunk = chunk?;
                if body.len() + chunk.len() > max_body_size {
                    let err = AppError::validation("request body too large");
                    return Ok(req.into_response(error_from_app(&err).map_into_right_body()));
                }
                body.extend_from_slice(&chunk);
            }
            let body: Bytes = body.freeze();

            let result = verify(
                &secret,
                header(&req, BILL_TIMESTAMP_HEADER),
                header(&req, BILL_SIGNATURE_HEADER),
                &body,
                Utc::now().timestamp(),
            );
            if let Err(e) = result {
                warn!("Webhook signature rejected on {}: {}", req.path(), e.message());
                return Ok(req.into_response(error_from_app(&e).map_into_right_body()));
            }

            debug!("Webhook signature verified ({} bytes)", body.len());
            req.set_payload(Payload::from(body));
            Ok(srv.call(req).await?.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as atest;
    use actix_web::{App, HttpResponse, http::StatusCode, web};

    const SECRET: &str = "bill-secret";

    #[test]
    fn test_sign_is_stable_hex() {
        let sig = sign(SECRET, "1700000000", b"{}");
        assert_eq!(sig.len(), 64);
        assert_eq!(sig, sign(SECRET, "1700000000", b"{}"));
        assert_ne!(sig, sign(SECRET, "1700000001", b"{}"));
    }

    #[test]
    fn test_verify_failures() {
        let now = 1_700_000_000;
        let ts = now.to_string();
        let good = sign(SECRET, &ts, b"body");

        assert!(verify(SECRET, Some(&ts), Some(&good), b"body", now).is_ok());
        assert!(verify(SECRET, Some(&ts), Some(&good.to_uppercase()), b"body", now).is_ok());

        assert!(matches!(
            verify("", Some(&ts), Some(&good), b"body", now),
            Err(AppError::NotConfigured(_))
        ));
        assert!(matches!(
            verify(SECRET, None, Some(&good), b"body", now),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            verify(SECRET, Some("yesterday"), Some(&good), b"body", now),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            verify(SECRET, Some(&ts), None, b"body", now),
            Err(AppError::SignatureInvalid(_))
        ));
        assert!(matches!(
            verify(SECRET, Some(&ts), Some(&good), b"tampered", now),
            Err(AppError::SignatureInvalid(_))
        ));
        assert!(matches!(
            verify(SECRET, Some(&ts), Some(&good), b"body", now + 301),
            Err(AppError::TimestampOutOfRange(_))
        ));
        assert!(verify(SECRET, Some(&ts), Some(&good), b"body", now - 300).is_ok());

        let far_past = i64::MIN.to_string();
        let sig = sign(SECRET, &far_past, b"body");
        assert!(matches!(
            verify(SECRET, Some(&far_past), Some(&sig), b"body", now),
            Err(AppError::TimestampOutOfRange(_))
        ));
    }

    async fn echo(body: Bytes) -> HttpResponse {
        HttpResponse::Ok().body(body)
    }

    #[actix_rt::test]
    async fn test_body_is_restored_for_handler() {
        let app = atest::init_service(
            App::new().service(
                web::scope("/webhook")
                    .wrap(BillSignature::new(SECRET, 1024))
                    .route("/bills", web::post().to(echo)),
            ),
        )
        .await;

        let body = r#"{"amount":12.5}"#;
        let ts = Utc::now().timestamp().to_string();
        let req = atest::TestRequest::post()
            .uri("/webhook/bills")
            .insert_header((BILL_TIMESTAMP_HEADER, ts.clone()))
            .insert_header((BILL_SIGNATURE_HEADER, sign(SECRET, &ts, body.as_bytes())))
            .set_payload(body)
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(atest::read_body(resp).await, body);

        let bad = atest::TestRequest::post()
            .uri("/webhook/bills")
            .insert_header((BILL_TIMESTAMP_HEADER, ts))
            .insert_header((BILL_SIGNATURE_HEADER, "00"))
            .set_payload(body)
            .to_request();
        let resp = atest::call_service(&app, bad).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
