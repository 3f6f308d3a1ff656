//! 生活记录查询与写入

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ExprTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use super::posts::STATUS_PUBLISHED;
use super::{SeaOrmStorage, page_index};
use crate::errors::Result;

use migration::entities::life_record;

fn alive() -> Condition {
    Condition::all().add(life_record::Column::DeletedAt.is_null())
}

fn published() -> Condition {
    alive()
        .add(life_record::Column::Status.eq(STATUS_PUBLISHED))
        .add(life_record::Column::PublishedAt.is_not_null())
}

impl SeaOrmStorage {
    /// 前台列表：已发布，按发布时间倒序
    pub async fn list_published_life(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<life_record::Model>, u64)> {
        let paginator = life_record::Entity::find()
            .filter(published())
            .order_by_desc(life_record::Column::PublishedAt)
            .order_by_desc(life_record::Column::Id)
            .paginate(&self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page_index(page)).await?;
        Ok((items, total))
    }

    /// 后台列表：可按状态过滤，按创建时间倒序
    pub async fn list_life_admin(
        &self,
        status: Option<&str>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<life_record::Model>, u64)> {
        let mut condition = alive();
        if let Some(status) = status {
            condition = condition.add(life_record::Column::Status.eq(status));
        }

        let paginator = life_record::Entity::find()
            .filter(condition)
            .order_by_desc(life_record::Column::CreatedAt)
            .order_by_desc(life_record::Column::Id)
            .paginate(&self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page_index(page)).await?;
        Ok((items, total))
    }

    pub async fn find_life(&self, id: i64) -> Result<Option<life_record::Model>> {
        Ok(life_record::Entity::find_by_id(id)
            .filter(alive())
            .one(&self.db)
            .await?)
    }

    pub async fn find_published_life(&self, id: i64) -> Result<Option<life_record::Model>> {
        Ok(life_record::Entity::find_by_id(id)
            .filter(published())
            .one(&self.db)
            .await?)
    }

    pub async fn recent_life(&self, limit: u64) -> Result<Vec<life_record::Model>> {
        Ok(life_record::Entity::find()
            .filter(published())
            .order_by_desc(life_record::Column::PublishedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub async fn most_viewed_life(&self, limit: u64) -> Result<Vec<life_record::Model>> {
        Ok(life_record::Entity::find()
            .filter(published())
            .order_by_desc(life_record::Column::ViewCount)
            .order_by_desc(life_record::Column::PublishedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub async fn all_published_life(&self) -> Result<Vec<life_record::Model>> {
        Ok(life_record::Entity::find()
            .filter(published())
            .order_by_desc(life_record::Column::PublishedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn life_published_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<life_record::Model>> {
        Ok(life_record::Entity::find()
            .filter(published())
            .filter(life_record::Column::PublishedAt.gte(start))
            .filter(life_record::Column::PublishedAt.lt(end))
            .order_by_asc(life_record::Column::PublishedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn count_published_life(&self) -> Result<u64> {
        Ok(life_record::Entity::find()
            .filter(published())
            .count(&self.db)
            .await?)
    }

    pub async fn insert_life(&self, model: life_record::ActiveModel) -> Result<life_record::Model> {
        Ok(model.insert(&self.db).await?)
    }

    pub async fn update_life(&self, model: life_record::ActiveModel) -> Result<life_record::Model> {
        Ok(model.update(&self.db).await?)
    }

    pub async fn soft_delete_life(&self, id: i64) -> Result<bool> {
        let result = life_record::Entity::update_many()
            .col_expr(life_record::Column::DeletedAt, Expr::value(Some(Utc::now())))
            .filter(life_record::Column::Id.eq(id))
            .filter(life_record::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn increment_life_views(&self, id: i64) -> Result<bool> {
        let result = life_record::Entity::update_many()
            .col_expr(
                life_record::Column::ViewCount,
                Expr::col(life_record::Column::ViewCount).add(1),
            )
            .filter(life_record::Column::Id.eq(id))
            .filter(life_record::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// 按 id 批量取标题（后台评论列表）
    pub async fn life_titles(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(i64, String)> = life_record::Entity::find()
            .select_only()
            .column(life_record::Column::Id)
            .column(life_record::Column::Title)
            .filter(life_record::Column::Id.is_in(ids.to_vec()))
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().collect())
    }
}
