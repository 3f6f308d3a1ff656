use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

/// Access / Refresh Token 共用的 Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// user id
    pub sub: String,
    pub username: String,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::TokenInvalid("invalid token subject".into()))
    }
}

/// JWT Service for generating and validating tokens
///
/// 在启动时根据 `AppConfig.jwt` 构造一次，通过 `Arc` 注入到认证中间件和 handler。
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_minutes: u64,
    refresh_token_days: u64,
}

impl JwtService {
    pub fn new(
        secret: &str,
        issuer: &str,
        access_token_minutes: u64,
        refresh_token_days: u64,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            access_token_minutes,
            refresh_token_days,
        }
    }

    /// access token 有效期（秒），用于响应中的 `expires_in`
    pub fn access_expires_in(&self) -> i64 {
        (self.access_token_minutes * 60) as i64
    }

    fn issue(
        &self,
        user_id: i64,
        username: &str,
        token_type: &str,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: token_type.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Generate Access Token (short-lived)
    pub fn generate_access_token(
        &self,
        user_id: i64,
        username: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(
            user_id,
            username,
            ACCESS,
            Duration::minutes(self.access_token_minutes as i64),
        )
    }

    /// Generate Refresh Token (long-lived)
    pub fn generate_refresh_token(
        &self,
        user_id: i64,
        username: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(
            user_id,
            username,
            REFRESH,
            Duration::days(self.refresh_token_days as i64),
        )
    }

    fn validate(&self, token: &str, expected_type: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.validate_nbf = true;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| token_error(&e))?;

        if data.claims.token_type != expected_type {
            return Err(AppError::TokenInvalid("invalid token type".into()));
        }

        Ok(data.claims)
    }

    /// Validate Access Token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AppError> {
        self.validate(token, ACCESS)
    }

    /// Validate Refresh Token
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, AppError> {
        self.validate(token, REFRESH)
    }
}

/// 区分过期与其他无效情况
fn token_error(err: &jsonwebtoken::errors::Error) -> AppError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired("token expired".into()),
        _ => AppError::TokenInvalid("invalid token".into()),
    }
}
