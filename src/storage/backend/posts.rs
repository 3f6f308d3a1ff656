//! 文章查询与写入

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ExprTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{SeaOrmStorage, page_index, retry};
use crate::errors::Result;

use migration::entities::{post, post_tag, tag};

pub const STATUS_PUBLISHED: &str = "published";

/// 文章列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct PostListFilter {
    /// 只返回已发布文章，并按发布时间排序（前台）
    pub published_only: bool,
    /// 后台按状态过滤
    pub status: Option<String>,
    /// 标题 / 摘要 / 正文模糊匹配
    pub search: Option<String>,
    pub tag_id: Option<i64>,
}

/// 新建 / 更新文章时的写入数据
pub struct PostWrite {
    pub model: post::ActiveModel,
    /// `None` 表示不修改标签
    pub tag_ids: Option<Vec<i64>>,
}

fn alive() -> Condition {
    Condition::all().add(post::Column::DeletedAt.is_null())
}

fn published() -> Condition {
    alive()
        .add(post::Column::Status.eq(STATUS_PUBLISHED))
        .add(post::Column::PublishedAt.is_not_null())
}

impl SeaOrmStorage {
    /// 分页加载文章
    pub async fn list_posts(
        &self,
        filter: &PostListFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<post::Model>, u64)> {
        let mut condition = if filter.published_only {
            published()
        } else {
            alive()
        };

        if let Some(ref status) = filter.status {
            condition = condition.add(post::Column::Status.eq(status.as_str()));
        }

        if let Some(ref search) = filter.search {
            condition = condition.add(
                Condition::any()
                    .add(post::Column::Title.contains(search))
                    .add(post::Column::Excerpt.contains(search))
                    .add(post::Column::Content.contains(search)),
            );
        }

        if let Some(tag_id) = filter.tag_id {
            let post_ids: Vec<i64> = post_tag::Entity::find()
                .select_only()
                .column(post_tag::Column::PostId)
                .filter(post_tag::Column::TagId.eq(tag_id))
                .into_tuple()
                .all(&self.db)
                .await?;
            if post_ids.is_empty() {
                return Ok((Vec::new(), 0));
            }
            condition = condition.add(post::Column::Id.is_in(post_ids));
        }

        let query = post::Entity::find().filter(condition);
        let query = if filter.published_only {
            query
                .order_by_desc(post::Column::PublishedAt)
                .order_by_desc(post::Column::Id)
        } else {
            query
                .order_by_desc(post::Column::CreatedAt)
                .order_by_desc(post::Column::Id)
        };

        let paginator = query.paginate(&self.db, limit);
        let total = paginator.num_items().await?;
        let posts = paginator.fetch_page(page_index(page)).await?;
        Ok((posts, total))
    }

    /// 阅读量最高的已发布文章
    pub async fn most_viewed_posts(&self, limit: u64) -> Result<Vec<post::Model>> {
        Ok(post::Entity::find()
            .filter(published())
            .order_by_desc(post::Column::ViewCount)
            .order_by_desc(post::Column::PublishedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// 最新发布的文章
    pub async fn recent_posts(&self, limit: u64) -> Result<Vec<post::Model>> {
        Ok(post::Entity::find()
            .filter(published())
            .order_by_desc(post::Column::PublishedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// 全部已发布文章（归档 / sitemap），按发布时间倒序
    pub async fn all_published_posts(&self) -> Result<Vec<post::Model>> {
        Ok(post::Entity::find()
            .filter(published())
            .order_by_desc(post::Column::PublishedAt)
            .all(&self.db)
            .await?)
    }

    /// 发布时间落在 [start, end) 内的文章
    pub async fn posts_published_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<post::Model>> {
        Ok(post::Entity::find()
            .filter(published())
            .filter(post::Column::PublishedAt.gte(start))
            .filter(post::Column::PublishedAt.lt(end))
            .order_by_asc(post::Column::PublishedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn count_published_posts(&self) -> Result<u64> {
        Ok(post::Entity::find()
            .filter(published())
            .count(&self.db)
            .await?)
    }

    pub async fn find_post(&self, id: i64) -> Result<Option<post::Model>> {
        let db = &self.db;
        let post = retry::with_retry("find_post", self.retry_config, || async {
            post::Entity::find_by_id(id).filter(alive()).one(db).await
        })
        .await?;
        Ok(post)
    }

    pub async fn find_published_post_by_slug(&self, slug: &str) -> Result<Option<post::Model>> {
        let db = &self.db;
        let post = retry::with_retry("find_post_by_slug", self.retry_config, || async {
            post::Entity::find()
                .filter(published())
                .filter(post::Column::Slug.eq(slug))
                .one(db)
                .await
        })
        .await?;
        Ok(post)
    }

    /// slug 是否已被占用（包含已软删除的文章，唯一索引仍覆盖它们）
    pub async fn post_slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let mut query = post::Entity::find().filter(post::Column::Slug.eq(slug));
        if let Some(id) = exclude_id {
            query = query.filter(post::Column::Id.ne(id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    /// 批量加载一页文章的标签
    pub async fn tags_for_posts(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<tag::Model>>> {
        let mut map: HashMap<i64, Vec<tag::Model>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(map);
        }

        let rows = post_tag::Entity::find()
            .filter(post_tag::Column::PostId.is_in(post_ids.to_vec()))
            .find_also_related(tag::Entity)
            .order_by_asc(post_tag::Column::TagId)
            .all(&self.db)
            .await?;

        for (link, tag) in rows {
            if let Some(tag) = tag {
                map.entry(link.post_id).or_default().push(tag);
            }
        }
        Ok(map)
    }

    /// 插入文章并写入标签关联（同一事务）
    pub async fn create_post(&self, write: PostWrite) -> Result<post::Model> {
        let txn = self.db.begin().await?;

        let post = write.model.insert(&txn).await?;
        if let Some(tag_ids) = write.tag_ids {
            replace_post_tags(&txn, post.id, &tag_ids).await?;
        }

        txn.commit().await?;
        Ok(post)
    }

    /// 更新文章；`tag_ids` 为 Some 时整体替换标签
    pub async fn update_post(&self, write: PostWrite) -> Result<post::Model> {
        let txn = self.db.begin().await?;

        let post = write.model.update(&txn).await?;
        if let Some(tag_ids) = write.tag_ids {
            replace_post_tags(&txn, post.id, &tag_ids).await?;
        }

        txn.commit().await?;
        Ok(post)
    }

    /// 软删除，返回是否命中
    pub async fn soft_delete_post(&self, id: i64) -> Result<bool> {
        let result = post::Entity::update_many()
            .col_expr(post::Column::DeletedAt, Expr::value(Some(Utc::now())))
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// view_count + 1，返回是否命中
    pub async fn increment_post_views(&self, id: i64) -> Result<bool> {
        let result = post::Entity::update_many()
            .col_expr(
                post::Column::ViewCount,
                Expr::col(post::Column::ViewCount).add(1),
            )
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// 按 id 批量取标题（后台评论列表）
    pub async fn post_titles(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(i64, String)> = post::Entity::find()
            .select_only()
            .column(post::Column::Id)
            .column(post::Column::Title)
            .filter(post::Column::Id.is_in(ids.to_vec()))
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().collect())
    }
}

async fn replace_post_tags<C>(conn: &C, post_id: i64, tag_ids: &[i64]) -> Result<()>
where
    C: sea_orm::ConnectionTrait,
{
    post_tag::Entity::delete_many()
        .filter(post_tag::Column::PostId.eq(post_id))
        .exec(conn)
        .await?;

    let mut unique: Vec<i64> = tag_ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    if unique.is_empty() {
        return Ok(());
    }

    let links = unique.into_iter().map(|tag_id| post_tag::ActiveModel {
        post_id: Set(post_id),
        tag_id: Set(tag_id),
    });
    post_tag::Entity::insert_many(links)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
