//! Post service
//!
//! 文章的前台查询、阅读计数与后台 CRUD。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use sea_orm::{ActiveValue::NotSet, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;

use super::{PageParams, Paginated, TagView, Visitor};
use crate::api::constants::VIEW_DEDUP_WINDOW_SECS;
use crate::api::services::types::TS_EXPORT_PATH;
use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::storage::SeaOrmStorage;
use crate::storage::backend::{NewPageView, PostListFilter, PostWrite, STATUS_PUBLISHED};
use crate::utils::generate_random_suffix;
use crate::utils::text::{char_len, generate_excerpt, slugify};
use crate::utils::user_agent::detect_device;

use migration::entities::{post, tag};

pub const STATUS_DRAFT: &str = "draft";
pub const PAGE_TYPE_POST: &str = "post";
const TITLE_MAX: usize = 200;
const SLUG_MAX: usize = 200;
const FEATURED_LIMIT: u64 = 5;
const RECENT_LIMIT: u64 = 5;

// ============ Request/Response DTOs ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub slug: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// 只更新出现的字段；`tag_ids` 出现时整体替换
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub status: Option<String>,
    pub tag_ids: Option<Vec<i64>>,
}

/// 前台文章列表查询 `?page&limit&tag&search`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// 标签 slug
    pub tag: Option<String>,
    pub search: Option<String>,
}

/// 后台文章列表查询
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminPostListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<String>,
}

/// 文章详情
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub cover_image: String,
    pub status: String,
    pub view_count: i64,
    pub author_id: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<TagView>,
}

/// 文章列表项（不含正文）
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PostListItem {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub cover_image: String,
    pub status: String,
    pub view_count: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<TagView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveYear {
    pub year: i32,
    pub posts: Vec<PostListItem>,
}

impl PostView {
    fn from_model(p: post::Model, tags: Vec<tag::Model>) -> Self {
        Self {
            id: p.id,
            title: p.title,
            slug: p.slug,
            content: p.content,
            excerpt: p.excerpt,
            cover_image: p.cover_image,
            status: p.status,
            view_count: p.view_count,
            author_id: p.author_id,
            published_at: p.published_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
            tags: tags.into_iter().map(TagView::from).collect(),
        }
    }
}

impl PostListItem {
    fn from_model(p: post::Model, tags: Vec<tag::Model>) -> Self {
        Self {
            id: p.id,
            title: p.title,
            slug: p.slug,
            excerpt: p.excerpt,
            cover_image: p.cover_image,
            status: p.status,
            view_count: p.view_count,
            published_at: p.published_at,
            created_at: p.created_at,
            tags: tags.into_iter().map(TagView::from).collect(),
        }
    }
}

pub(crate) fn check_status(status: &str) -> Result<()> {
    match status {
        STATUS_DRAFT | STATUS_PUBLISHED => Ok(()),
        _ => Err(AppError::field("status", "status must be draft or published")),
    }
}

pub(crate) fn check_max_len(field: &str, value: &str, max: usize) -> Result<()> {
    if char_len(value) > max {
        return Err(AppError::field(
            field,
            format!("{} must be at most {} characters", field, max),
        ));
    }
    Ok(())
}

pub(crate) fn check_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::field(field, format!("{} is required", field)));
    }
    Ok(())
}

/// 访问去重窗口起点
pub(crate) fn dedup_since() -> DateTime<Utc> {
    Utc::now() - Duration::seconds(VIEW_DEDUP_WINDOW_SECS)
}

/// 写入访问记录；失败只记日志，不影响计数结果
pub(crate) async fn log_page_view(
    storage: &SeaOrmStorage,
    page_type: &str,
    page_id: i64,
    visitor: &Visitor,
) {
    let device = detect_device(&visitor.user_agent);
    let view = NewPageView {
        page_type: page_type.to_string(),
        page_id: Some(page_id),
        ip_address: visitor.ip.clone(),
        user_agent: visitor.user_agent.clone(),
        referer: visitor.referer.clone(),
        device_type: device.device_type,
        browser: device.browser,
        os: device.os,
    };
    if let Err(e) = storage.insert_page_view(view).await {
        warn!("Failed to record page view for {} {}: {}", page_type, page_id, e);
    }
}

// ============ PostService ============

pub struct PostService {
    storage: Arc<SeaOrmStorage>,
    config: Arc<AppConfig>,
}

impl PostService {
    pub fn new(storage: Arc<SeaOrmStorage>, config: Arc<AppConfig>) -> Self {
        Self { storage, config }
    }

    /// 为一页文章批量挂载标签
    async fn with_tags(&self, posts: Vec<post::Model>) -> Result<Vec<PostListItem>> {
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let mut tags = self.storage.tags_for_posts(&ids).await?;
        Ok(posts
            .into_iter()
            .map(|p| {
                let t = tags.remove(&p.id).unwrap_or_default();
                PostListItem::from_model(p, t)
            })
            .collect())
    }

    async fn to_view(&self, post: post::Model) -> Result<PostView> {
        let mut tags = self.storage.tags_for_posts(&[post.id]).await?;
        let t = tags.remove(&post.id).unwrap_or_default();
        Ok(PostView::from_model(post, t))
    }

    /// 已发布文章列表；search 与 tag 可同时生效
    pub async fn list_published(&self, query: &PostListQuery) -> Result<Paginated<PostListItem>> {
        let params = PageParams::new(query.page, query.limit);
        let mut filter = PostListFilter {
            published_only: true,
            search: query
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            ..Default::default()
        };

        if let Some(slug) = query.tag.as_deref().filter(|s| !s.is_empty()) {
            match self.storage.find_tag_by_slug(slug).await? {
                Some(t) => filter.tag_id = Some(t.tag.id),
                None => return Ok(Paginated::new(Vec::new(), params, 0)),
            }
        }

        self.list_with_filter(&filter, params).await
    }

    /// 某标签下的已发布文章
    pub async fn list_published_by_tag(
        &self,
        tag_id: i64,
        params: PageParams,
    ) -> Result<Paginated<PostListItem>> {
        let filter = PostListFilter {
            published_only: true,
            tag_id: Some(tag_id),
            ..Default::default()
        };
        self.list_with_filter(&filter, params).await
    }

    async fn list_with_filter(
        &self,
        filter: &PostListFilter,
        params: PageParams,
    ) -> Result<Paginated<PostListItem>> {
        let (posts, total) = self
            .storage
            .list_posts(filter, params.page, params.limit)
            .await?;
        let items = self.with_tags(posts).await?;
        Ok(Paginated::new(items, params, total))
    }

    pub async fn featured(&self) -> Result<Vec<PostListItem>> {
        let posts = self.storage.most_viewed_posts(FEATURED_LIMIT).await?;
        self.with_tags(posts).await
    }

    pub async fn recent(&self) -> Result<Vec<PostListItem>> {
        let posts = self.storage.recent_posts(RECENT_LIMIT).await?;
        self.with_tags(posts).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<PostView> {
        let post = self
            .storage
            .find_published_post_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("post not found"))?;
        self.to_view(post).await
    }

    /// 阅读量 +1；同一访客一小时内重复访问不计数
    pub async fn record_view(&self, id: i64, visitor: &Visitor) -> Result<()> {
        let duplicate = self
            .storage
            .has_recent_view(
                PAGE_TYPE_POST,
                id,
                &visitor.ip,
                &visitor.user_agent,
                dedup_since(),
            )
            .await?;
        if duplicate {
            debug!("Skip duplicate view of post {} from {}", id, visitor.ip);
            return Ok(());
        }

        if !self.storage.increment_post_views(id).await? {
            return Err(AppError::not_found("post not found"));
        }
        log_page_view(&self.storage, PAGE_TYPE_POST, id, visitor).await;
        Ok(())
    }

    /// 按年份分组的归档，年份倒序
    pub async fn archives(&self) -> Result<Vec<ArchiveYear>> {
        let posts = self.storage.all_published_posts().await?;
        let items = self.with_tags(posts).await?;

        let mut by_year: BTreeMap<i32, Vec<PostListItem>> = BTreeMap::new();
        for item in items {
            let year = item.published_at.unwrap_or(item.created_at).year();
            by_year.entry(year).or_default().push(item);
        }

        Ok(by_year
            .into_iter()
            .rev()
            .map(|(year, posts)| ArchiveYear { year, posts })
            .collect())
    }

    // ============ 后台 ============

    pub async fn admin_list(&self, query: &AdminPostListQuery) -> Result<Paginated<PostView>> {
        let params = PageParams::new(query.page, query.limit);
        let filter = PostListFilter {
            status: query.status.clone().filter(|s| !s.is_empty()),
            ..Default::default()
        };
        let (posts, total) = self
            .storage
            .list_posts(&filter, params.page, params.limit)
            .await?;

        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let mut tags = self.storage.tags_for_posts(&ids).await?;
        let items = posts
            .into_iter()
            .map(|p| {
                let t = tags.remove(&p.id).unwrap_or_default();
                PostView::from_model(p, t)
            })
            .collect();
        Ok(Paginated::new(items, params, total))
    }

    pub async fn admin_get(&self, id: i64) -> Result<PostView> {
        let post = self
            .storage
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("post not found"))?;
        self.to_view(post).await
    }

    /// slug 冲突时追加 4 位随机后缀
    async fn unique_slug(&self, base: &str) -> Result<String> {
        let base = if base.is_empty() {
            generate_random_suffix(8)
        } else {
            base.to_string()
        };
        if !self.storage.post_slug_exists(&base, None).await? {
            return Ok(base);
        }
        Ok(format!("{}-{}", base, generate_random_suffix(4)))
    }

    /// 丢弃不存在的标签 id
    async fn valid_tag_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.storage.existing_tag_ids(ids).await
    }

    pub async fn create(&self, req: CreatePostRequest, author_id: i64) -> Result<PostView> {
        check_required("title", &req.title)?;
        check_max_len("title", &req.title, TITLE_MAX)?;
        check_max_len("slug", &req.slug, SLUG_MAX)?;
        check_required("content", &req.content)?;
        let status = req.status.unwrap_or_else(|| STATUS_DRAFT.to_string());
        check_status(&status)?;

        let slug = match req.slug.trim() {
            "" => self.unique_slug(&slugify(&req.title)).await?,
            given => self.unique_slug(given).await?,
        };
        let excerpt = if req.excerpt.trim().is_empty() {
            generate_excerpt(&req.content, self.config.content.excerpt_length)
        } else {
            req.excerpt
        };

        let now = Utc::now();
        let published_at = (status == STATUS_PUBLISHED).then_some(now);
        let tag_ids = self.valid_tag_ids(&req.tag_ids).await?;

        let model = post::ActiveModel {
            id: NotSet,
            title: Set(req.title),
            slug: Set(slug),
            content: Set(req.content),
            excerpt: Set(excerpt),
            cover_image: Set(req.cover_image),
            status: Set(status),
            view_count: Set(0),
            author_id: Set(author_id),
            published_at: Set(published_at),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let post = self
            .storage
            .create_post(PostWrite {
                model,
                tag_ids: Some(tag_ids),
            })
            .await?;
        info!("PostService: created post {} '{}'", post.id, post.slug);
        self.to_view(post).await
    }

    pub async fn update(&self, id: i64, req: UpdatePostRequest) -> Result<PostView> {
        let existing = self
            .storage
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("post not found"))?;

        let first_publish = existing.published_at.is_none();
        let mut model = existing.into_active_model();

        if let Some(title) = req.title.filter(|t| !t.trim().is_empty()) {
            check_max_len("title", &title, TITLE_MAX)?;
            model.title = Set(title);
        }
        if let Some(slug) = req.slug.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            check_max_len("slug", &slug, SLUG_MAX)?;
            if self.storage.post_slug_exists(&slug, Some(id)).await? {
                return Err(AppError::conflict(crate::api::constants::messages::SLUG_EXISTS));
            }
            model.slug = Set(slug);
        }

        let explicit_excerpt = req.excerpt.filter(|e| !e.trim().is_empty());
        if let Some(content) = req.content.filter(|c| !c.trim().is_empty()) {
            if explicit_excerpt.is_none() {
                model.excerpt = Set(generate_excerpt(
                    &content,
                    self.config.content.excerpt_length,
                ));
            }
            model.content = Set(content);
        }
        if let Some(excerpt) = explicit_excerpt {
            model.excerpt = Set(excerpt);
        }
        if let Some(cover) = req.cover_image {
            model.cover_image = Set(cover);
        }
        if let Some(status) = req.status.filter(|s| !s.is_empty()) {
            check_status(&status)?;
            // 首次发布才写入发布时间
            if status == STATUS_PUBLISHED && first_publish {
                model.published_at = Set(Some(Utc::now()));
            }
            model.status = Set(status);
        }
        model.updated_at = Set(Utc::now());

        let tag_ids = match req.tag_ids {
            Some(ids) => Some(self.valid_tag_ids(&ids).await?),
            None => None,
        };

        let post = self.storage.update_post(PostWrite { model, tag_ids }).await?;
        info!("PostService: updated post {}", post.id);
        self.to_view(post).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.storage.soft_delete_post(id).await? {
            return Err(AppError::not_found("post not found"));
        }
        info!("PostService: deleted post {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status() {
        assert!(check_status("draft").is_ok());
        assert!(check_status("published").is_ok());
        assert!(check_status("archived").is_err());
    }

    #[test]
    fn test_check_max_len_counts_chars() {
        let title = "标".repeat(200);
        assert!(check_max_len("title", &title, 200).is_ok());
        let title = "标".repeat(201);
        assert!(check_max_len("title", &title, 200).is_err());
    }

    #[test]
    fn test_check_required() {
        assert!(check_required("content", "  ").is_err());
        assert!(check_required("content", "x").is_ok());
    }
}
