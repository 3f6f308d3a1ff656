//! 标签

use std::collections::HashMap;

use sea_orm::sea_query::JoinType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};

use super::SeaOrmStorage;
use super::posts::STATUS_PUBLISHED;
use crate::errors::Result;

use migration::entities::{post, post_tag, tag};

/// 标签 + 关联文章数
#[derive(Debug, Clone)]
pub struct TagWithCount {
    pub tag: tag::Model,
    pub post_count: i64,
}

#[derive(Debug, FromQueryResult)]
struct TagCountRow {
    tag_id: i64,
    count: i64,
}

impl SeaOrmStorage {
    /// 全部标签及文章数
    ///
    /// `published_only` 为 true 时只统计已发布文章（前台），否则统计所有未删除文章。
    pub async fn list_tags_with_counts(
        &self,
        published_only: bool,
    ) -> Result<Vec<TagWithCount>> {
        let tags = tag::Entity::find()
            .order_by_desc(tag::Column::CreatedAt)
            .order_by_desc(tag::Column::Id)
            .all(&self.db)
            .await?;

        let counts = self.tag_post_counts(published_only, None).await?;
        Ok(tags
            .into_iter()
            .map(|tag| {
                let post_count = counts.get(&tag.id).copied().unwrap_or(0);
                TagWithCount { tag, post_count }
            })
            .collect())
    }

    async fn tag_post_counts(
        &self,
        published_only: bool,
        tag_id: Option<i64>,
    ) -> Result<HashMap<i64, i64>> {
        let mut condition = Condition::all().add(post::Column::DeletedAt.is_null());
        if published_only {
            condition = condition.add(post::Column::Status.eq(STATUS_PUBLISHED));
        }
        if let Some(tag_id) = tag_id {
            condition = condition.add(post_tag::Column::TagId.eq(tag_id));
        }

        let rows = post_tag::Entity::find()
            .select_only()
            .column(post_tag::Column::TagId)
            .column_as(post_tag::Column::PostId.count(), "count")
            .join(JoinType::InnerJoin, post_tag::Relation::Post.def())
            .filter(condition)
            .group_by(post_tag::Column::TagId)
            .into_model::<TagCountRow>()
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(|r| (r.tag_id, r.count)).collect())
    }

    /// 按 slug 查标签，附带已发布文章数
    pub async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<TagWithCount>> {
        let Some(tag) = tag::Entity::find()
            .filter(tag::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let counts = self.tag_post_counts(true, Some(tag.id)).await?;
        let post_count = counts.get(&tag.id).copied().unwrap_or(0);
        Ok(Some(TagWithCount { tag, post_count }))
    }

    pub async fn find_tag(&self, id: i64) -> Result<Option<tag::Model>> {
        Ok(tag::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn all_tags(&self) -> Result<Vec<tag::Model>> {
        Ok(tag::Entity::find()
            .order_by_asc(tag::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn count_tags(&self) -> Result<u64> {
        Ok(tag::Entity::find().count(&self.db).await?)
    }

    /// 返回 ids 中实际存在的标签 id
    pub async fn existing_tag_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(tag::Entity::find()
            .select_only()
            .column(tag::Column::Id)
            .filter(tag::Column::Id.is_in(ids.to_vec()))
            .into_tuple()
            .all(&self.db)
            .await?)
    }

    /// name 或 slug 是否与其他标签冲突
    pub async fn tag_conflicts(
        &self,
        name: &str,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let mut query = tag::Entity::find().filter(
            Condition::any()
                .add(tag::Column::Name.eq(name))
                .add(tag::Column::Slug.eq(slug)),
        );
        if let Some(id) = exclude_id {
            query = query.filter(tag::Column::Id.ne(id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    pub async fn insert_tag(&self, model: tag::ActiveModel) -> Result<tag::Model> {
        Ok(model.insert(&self.db).await?)
    }

    pub async fn update_tag(&self, model: tag::ActiveModel) -> Result<tag::Model> {
        Ok(model.update(&self.db).await?)
    }

    /// 删除标签及其文章关联，返回是否命中
    pub async fn delete_tag(&self, id: i64) -> Result<bool> {
        let txn = self.db.begin().await?;

        post_tag::Entity::delete_many()
            .filter(post_tag::Column::TagId.eq(id))
            .exec(&txn)
            .await?;
        let result = tag::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}
