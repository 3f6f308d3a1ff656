//! 管理员账户

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use super::{SeaOrmStorage, retry};
use crate::errors::{AppError, Result};

use migration::entities::user;

impl SeaOrmStorage {
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<user::Model>> {
        let db = &self.db;
        let user = retry::with_retry("find_user_by_username", self.retry_config, || async {
            user::Entity::find()
                .filter(user::Column::Username.eq(username))
                .one(db)
                .await
        })
        .await?;
        Ok(user)
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn count_users(&self) -> Result<u64> {
        Ok(user::Entity::find().count(&self.db).await?)
    }

    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
    ) -> Result<user::Model> {
        let now = Utc::now();
        let model = user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            email: Set(email.to_string()),
            avatar: Set(String::new()),
            last_login: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn touch_last_login(&self, id: i64) -> Result<()> {
        user::Entity::update_many()
            .col_expr(user::Column::LastLogin, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// 更新密码哈希，用户不存在时返回 NotFound
    pub async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<()> {
        let now = Utc::now();
        let result = user::Entity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(user::Column::UpdatedAt, Expr::value(now))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("user not found"));
        }
        Ok(())
    }
}
