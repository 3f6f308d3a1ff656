//! Admin authentication service
//!
//! 管理员登录、token 刷新与密码维护。JwtService 在这里构造一次，
//! 认证中间件通过 [`AuthService::jwt`] 共享同一个实例。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use crate::api::constants::messages;
use crate::api::jwt::JwtService;
use crate::api::services::types::TS_EXPORT_PATH;
use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::storage::SeaOrmStorage;
use crate::utils::generate_random_code;
use crate::utils::password::{
    check_password_length, generate_random_password, hash_password, verify_password,
};

use migration::entities::user;

const JWT_SECRET_LEN: usize = 32;

// ============ Request/Response DTOs ============

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserView {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            avatar: u.avatar,
            last_login: u.last_login,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: UserView,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}

// ============ AuthService ============

pub struct AuthService {
    storage: Arc<SeaOrmStorage>,
    config: Arc<AppConfig>,
    jwt: Arc<JwtService>,
}

impl AuthService {
    /// 未配置 jwt.secret 时使用随机密钥，重启后旧 token 全部失效
    pub fn new(storage: Arc<SeaOrmStorage>, config: Arc<AppConfig>) -> Self {
        let jwt_cfg = &config.jwt;
        let secret = if jwt_cfg.secret.is_empty() {
            warn!("jwt.secret is not configured, using a random secret for this process");
            generate_random_code(JWT_SECRET_LEN)
        } else {
            jwt_cfg.secret.clone()
        };
        let jwt = Arc::new(JwtService::new(
            &secret,
            &jwt_cfg.issuer,
            jwt_cfg.access_token_minutes,
            jwt_cfg.refresh_token_days,
        ));
        Self {
            storage,
            config,
            jwt,
        }
    }

    pub fn jwt(&self) -> Arc<JwtService> {
        self.jwt.clone()
    }

    fn sign_error(e: jsonwebtoken::errors::Error) -> AppError {
        AppError::internal(format!("failed to sign token: {}", e))
    }

    /// 用户不存在与密码错误返回同一个 401
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse> {
        let username = req.username.trim();
        let user = match self.storage.find_user_by_username(username).await? {
            Some(user) if verify_password(&req.password, &user.password_hash) => user,
            _ => {
                warn!("Login failed for user '{}'", username);
                return Err(AppError::InvalidCredentials(messages::LOGIN_FAILED.into()));
            }
        };

        let access_token = self
            .jwt
            .generate_access_token(user.id, &user.username)
            .map_err(Self::sign_error)?;
        let refresh_token = self
            .jwt
            .generate_refresh_token(user.id, &user.username)
            .map_err(Self::sign_error)?;

        if let Err(e) = self.storage.touch_last_login(user.id).await {
            warn!("Failed to update last_login for user {}: {}", user.id, e);
        }

        info!("User '{}' logged in", user.username);
        let mut view = UserView::from(user);
        view.last_login = Some(Utc::now());
        Ok(LoginResponse {
            access_token,
            refresh_token,
            expires_in: self.jwt.access_expires_in(),
            user: view,
        })
    }

    /// 只签发新的 access token，refresh token 继续使用到过期
    pub async fn refresh(&self, req: RefreshRequest) -> Result<RefreshResponse> {
        let claims = self.jwt.validate_refresh_token(req.refresh_token.trim())?;
        let user = self
            .storage
            .find_user_by_id(claims.user_id()?)
            .await?
            .ok_or_else(|| AppError::TokenInvalid("user no longer exists".into()))?;

        let access_token = self
            .jwt
            .generate_access_token(user.id, &user.username)
            .map_err(Self::sign_error)?;
        Ok(RefreshResponse {
            access_token,
            expires_in: self.jwt.access_expires_in(),
        })
    }

    pub async fn me(&self, user_id: i64) -> Result<UserView> {
        self.storage
            .find_user_by_id(user_id)
            .await?
            .map(UserView::from)
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    pub async fn change_password(&self, user_id: i64, req: ChangePasswordRequest) -> Result<()> {
        let user = self
            .storage
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;

        if !verify_password(&req.old_password, &user.password_hash) {
            return Err(AppError::field("old_password", "old password is incorrect"));
        }
        check_password_length(&req.new_password)?;

        let hash = hash_password(&req.new_password)?;
        self.storage.update_password_hash(user.id, &hash).await?;
        info!("User '{}' changed password", user.username);
        Ok(())
    }

    /// CLI 重置密码，不校验旧密码
    pub async fn reset_password(&self, username: &str, new_password: &str) -> Result<()> {
        check_password_length(new_password)?;
        let user = self
            .storage
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user '{}' not found", username)))?;
        let hash = hash_password(new_password)?;
        self.storage.update_password_hash(user.id, &hash).await?;
        info!("Password reset for user '{}'", username);
        Ok(())
    }

    /// users 表为空时创建配置中的管理员账户；未配置密码则随机生成并打印一次
    pub async fn seed_admin(&self) -> Result<Option<user::Model>> {
        if self.storage.count_users().await? > 0 {
            return Ok(None);
        }

        let admin = &self.config.admin;
        let password = if admin.password.is_empty() {
            let generated = generate_random_password();
            warn!(
                "admin.password is not configured, generated initial password for '{}': {}",
                admin.username, generated
            );
            generated
        } else {
            admin.password.clone()
        };

        let hash = hash_password(&password)?;
        let user = self
            .storage
            .create_user(&admin.username, &hash, &admin.email)
            .await?;
        info!("Seeded admin account '{}'", user.username);
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_view_hides_password_hash() {
        let now = Utc::now();
        let view = UserView::from(user::Model {
            id: 1,
            username: "admin".into(),
            password_hash: "$argon2id$secret".into(),
            email: "admin@example.com".into(),
            avatar: String::new(),
            last_login: None,
            created_at: now,
            updated_at: now,
        });
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"username\":\"admin\""));
    }
}
