//! 评论实体
//!
//! 目标三选一：post_id / life_record_id / 都为空（留言板）。
//! 回复通过 parent_id 指向顶层评论，reply_to_id 仅用于 @ 显示。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub post_id: Option<i64>,
    pub life_record_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub nickname: String,
    pub email: String,
    pub avatar: String,
    pub website: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub is_admin: bool,
    pub is_pinned: bool,
    /// pending | approved | spam
    pub status: String,
    pub ip_address: String,
    #[sea_orm(column_type = "Text")]
    pub user_agent: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
