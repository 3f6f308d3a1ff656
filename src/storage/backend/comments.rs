//! 评论存储
//!
//! 评论平铺存放，回复通过 parent_id 指向顶层评论。一页顶层评论的回复用一次
//! `parent_id IN (...)` 查询取回，由服务层按 parent_id 分组挂载。

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};

use super::{SeaOrmStorage, page_index};
use crate::errors::Result;

use migration::entities::comment;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_SPAM: &str = "spam";

/// 评论挂载的目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentTarget {
    Post(i64),
    Life(i64),
    Guestbook,
}

impl CommentTarget {
    pub fn from_ids(post_id: Option<i64>, life_record_id: Option<i64>) -> Self {
        match (post_id, life_record_id) {
            (Some(id), _) => CommentTarget::Post(id),
            (None, Some(id)) => CommentTarget::Life(id),
            (None, None) => CommentTarget::Guestbook,
        }
    }

    pub fn of(model: &comment::Model) -> Self {
        Self::from_ids(model.post_id, model.life_record_id)
    }

    pub fn post_id(&self) -> Option<i64> {
        match self {
            CommentTarget::Post(id) => Some(*id),
            _ => None,
        }
    }

    pub fn life_record_id(&self) -> Option<i64> {
        match self {
            CommentTarget::Life(id) => Some(*id),
            _ => None,
        }
    }

    fn condition(&self) -> Condition {
        match self {
            CommentTarget::Post(id) => Condition::all().add(comment::Column::PostId.eq(*id)),
            CommentTarget::Life(id) => {
                Condition::all().add(comment::Column::LifeRecordId.eq(*id))
            }
            CommentTarget::Guestbook => Condition::all()
                .add(comment::Column::PostId.is_null())
                .add(comment::Column::LifeRecordId.is_null()),
        }
    }
}

/// 后台评论列表过滤
#[derive(Debug, Clone, Default)]
pub struct AdminCommentFilter {
    pub status: Option<String>,
    pub is_pinned: Option<bool>,
    pub post_id: Option<i64>,
    pub life_record_id: Option<i64>,
}

fn alive() -> Condition {
    Condition::all().add(comment::Column::DeletedAt.is_null())
}

fn top_level(target: CommentTarget) -> Condition {
    alive()
        .add(target.condition())
        .add(comment::Column::ParentId.is_null())
}

impl SeaOrmStorage {
    /// 目标下已审核的顶层评论：置顶优先，其次按时间倒序
    pub async fn approved_top_level_comments(
        &self,
        target: CommentTarget,
        limit: Option<u64>,
    ) -> Result<Vec<comment::Model>> {
        let mut query = comment::Entity::find()
            .filter(top_level(target))
            .filter(comment::Column::Status.eq(STATUS_APPROVED))
            .order_by_desc(comment::Column::IsPinned)
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        Ok(query.all(&self.db).await?)
    }

    /// 某邮箱在目标下仍待审核的顶层评论
    pub async fn pending_comments_by_email(
        &self,
        target: CommentTarget,
        email: &str,
    ) -> Result<Vec<comment::Model>> {
        Ok(comment::Entity::find()
            .filter(top_level(target))
            .filter(comment::Column::Status.eq(STATUS_PENDING))
            .filter(comment::Column::Email.eq(email))
            .order_by_desc(comment::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// 某邮箱在一批顶层评论下仍待审核的回复，按时间倒序
    pub async fn pending_replies_by_email(
        &self,
        parent_ids: &[i64],
        email: &str,
    ) -> Result<Vec<comment::Model>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(comment::Entity::find()
            .filter(alive())
            .filter(comment::Column::ParentId.is_in(parent_ids.to_vec()))
            .filter(comment::Column::Status.eq(STATUS_PENDING))
            .filter(comment::Column::Email.eq(email))
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// 一批父评论下的全部已审核回复，按时间倒序
    pub async fn approved_replies_for(&self, parent_ids: &[i64]) -> Result<Vec<comment::Model>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(comment::Entity::find()
            .filter(alive())
            .filter(comment::Column::ParentId.is_in(parent_ids.to_vec()))
            .filter(comment::Column::Status.eq(STATUS_APPROVED))
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// 该邮箱是否已有通过审核的评论，决定新评论能否免审
    pub async fn has_approved_comment(&self, email: &str) -> Result<bool> {
        let count = comment::Entity::find()
            .filter(alive())
            .filter(comment::Column::Email.eq(email))
            .filter(comment::Column::Status.eq(STATUS_APPROVED))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn find_comment(&self, id: i64) -> Result<Option<comment::Model>> {
        Ok(comment::Entity::find_by_id(id)
            .filter(alive())
            .one(&self.db)
            .await?)
    }

    pub async fn insert_comment(&self, model: comment::ActiveModel) -> Result<comment::Model> {
        Ok(model.insert(&self.db).await?)
    }

    /// 后台分页列表，按时间倒序
    pub async fn list_comments_admin(
        &self,
        filter: &AdminCommentFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<comment::Model>, u64)> {
        let mut condition = alive();
        if let Some(ref status) = filter.status {
            condition = condition.add(comment::Column::Status.eq(status.as_str()));
        }
        if let Some(pinned) = filter.is_pinned {
            condition = condition.add(comment::Column::IsPinned.eq(pinned));
        }
        if let Some(post_id) = filter.post_id {
            condition = condition.add(comment::Column::PostId.eq(post_id));
        }
        if let Some(life_id) = filter.life_record_id {
            condition = condition.add(comment::Column::LifeRecordId.eq(life_id));
        }

        let paginator = comment::Entity::find()
            .filter(condition)
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .paginate(&self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page_index(page)).await?;
        Ok((items, total))
    }

    pub async fn set_comment_status(&self, id: i64, status: &str) -> Result<bool> {
        let result = comment::Entity::update_many()
            .col_expr(comment::Column::Status, Expr::value(status))
            .col_expr(comment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(comment::Column::Id.eq(id))
            .filter(comment::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn set_comment_pinned(&self, id: i64, pinned: bool) -> Result<()> {
        comment::Entity::update_many()
            .col_expr(comment::Column::IsPinned, Expr::value(pinned))
            .col_expr(comment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(comment::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// 软删除评论及其直接回复（一层），返回是否命中
    pub async fn soft_delete_comment_thread(&self, id: i64) -> Result<bool> {
        let now: DateTime<Utc> = Utc::now();
        let txn = self.db.begin().await?;

        let result = comment::Entity::update_many()
            .col_expr(comment::Column::DeletedAt, Expr::value(Some(now)))
            .filter(comment::Column::Id.eq(id))
            .filter(comment::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        comment::Entity::update_many()
            .col_expr(comment::Column::DeletedAt, Expr::value(Some(now)))
            .filter(comment::Column::ParentId.eq(id))
            .filter(comment::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(true)
    }

    pub async fn count_approved_comments(&self) -> Result<u64> {
        Ok(comment::Entity::find()
            .filter(alive())
            .filter(comment::Column::Status.eq(STATUS_APPROVED))
            .count(&self.db)
            .await?)
    }
}
