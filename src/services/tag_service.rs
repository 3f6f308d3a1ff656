//! Tag service

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveValue::NotSet, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use super::post_service::{check_max_len, check_required};
use super::{PageParams, Paginated, PostListItem, PostService};
use crate::api::services::types::TS_EXPORT_PATH;
use crate::errors::{AppError, Result};
use crate::storage::SeaOrmStorage;
use crate::storage::backend::TagWithCount;
use crate::utils::text::slugify;

use migration::entities::tag;

const NAME_MAX: usize = 50;
const SLUG_MAX: usize = 50;
const COLOR_MAX: usize = 20;

// ============ Request/Response DTOs ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct TagView {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_count: Option<i64>,
}

impl From<tag::Model> for TagView {
    fn from(t: tag::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            slug: t.slug,
            description: t.description,
            color: t.color,
            post_count: None,
        }
    }
}

impl From<TagWithCount> for TagView {
    fn from(t: TagWithCount) -> Self {
        let mut view = TagView::from(t.tag);
        view.post_count = Some(t.post_count);
        view
    }
}

/// `GET /tags/{slug}` 的返回
#[derive(Debug, Clone, Serialize)]
pub struct TagDetail {
    pub tag: TagView,
    pub posts: Paginated<PostListItem>,
}

fn validate_fields(name: &str, slug: &str, color: &str) -> Result<()> {
    check_max_len("name", name, NAME_MAX)?;
    check_max_len("slug", slug, SLUG_MAX)?;
    check_max_len("color", color, COLOR_MAX)
}

// ============ TagService ============

pub struct TagService {
    storage: Arc<SeaOrmStorage>,
    posts: Arc<PostService>,
}

impl TagService {
    pub fn new(storage: Arc<SeaOrmStorage>, posts: Arc<PostService>) -> Self {
        Self { storage, posts }
    }

    /// 前台：只统计已发布文章
    pub async fn list_public(&self) -> Result<Vec<TagView>> {
        let tags = self.storage.list_tags_with_counts(true).await?;
        Ok(tags.into_iter().map(TagView::from).collect())
    }

    /// 后台：统计所有未删除文章
    pub async fn list_admin(&self) -> Result<Vec<TagView>> {
        let tags = self.storage.list_tags_with_counts(false).await?;
        Ok(tags.into_iter().map(TagView::from).collect())
    }

    pub async fn detail(&self, slug: &str, params: PageParams) -> Result<TagDetail> {
        let found = self
            .storage
            .find_tag_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("tag not found"))?;
        let posts = self
            .posts
            .list_published_by_tag(found.tag.id, params)
            .await?;
        Ok(TagDetail {
            tag: found.into(),
            posts,
        })
    }

    pub async fn create(&self, req: CreateTagRequest) -> Result<TagView> {
        check_required("name", &req.name)?;
        let name = req.name.trim().to_string();
        let slug = match req.slug.trim() {
            "" => slugify(&name),
            s => s.to_string(),
        };
        if slug.is_empty() {
            return Err(AppError::field("slug", "slug cannot be derived from name"));
        }
        validate_fields(&name, &slug, &req.color)?;

        if self.storage.tag_conflicts(&name, &slug, None).await? {
            return Err(AppError::conflict("tag name or slug already exists"));
        }

        let tag = self
            .storage
            .insert_tag(tag::ActiveModel {
                id: NotSet,
                name: Set(name),
                slug: Set(slug),
                description: Set(req.description),
                color: Set(req.color),
                created_at: Set(Utc::now()),
            })
            .await?;
        info!("TagService: created tag {} '{}'", tag.id, tag.slug);
        Ok(tag.into())
    }

    pub async fn update(&self, id: i64, req: UpdateTagRequest) -> Result<TagView> {
        let existing = self
            .storage
            .find_tag(id)
            .await?
            .ok_or_else(|| AppError::not_found("tag not found"))?;

        let name = req
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| existing.name.clone());
        let slug = req
            .slug
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| existing.slug.clone());
        let color = req.color.unwrap_or_else(|| existing.color.clone());
        validate_fields(&name, &slug, &color)?;

        if self.storage.tag_conflicts(&name, &slug, Some(id)).await? {
            return Err(AppError::conflict("tag name or slug already exists"));
        }

        let description = req.description;
        let mut model = existing.into_active_model();
        model.name = Set(name);
        model.slug = Set(slug);
        model.color = Set(color);
        if let Some(description) = description {
            model.description = Set(description);
        }

        let tag = self.storage.update_tag(model).await?;
        Ok(tag.into())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.storage.delete_tag(id).await? {
            return Err(AppError::not_found("tag not found"));
        }
        info!("TagService: deleted tag {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> tag::Model {
        tag::Model {
            id: 3,
            name: "Rust".into(),
            slug: "rust".into(),
            description: String::new(),
            color: "#dea584".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tag_view_skips_empty_fields() {
        let json = serde_json::to_value(TagView::from(model())).unwrap();
        assert!(json.get("description").is_none());
        assert!(json.get("post_count").is_none());
        assert_eq!(json["color"], "#dea584");
    }

    #[test]
    fn test_tag_view_with_count() {
        let view = TagView::from(TagWithCount {
            tag: model(),
            post_count: 4,
        });
        assert_eq!(view.post_count, Some(4));
    }

    #[test]
    fn test_validate_fields() {
        assert!(validate_fields("a", "a", "").is_ok());
        assert!(validate_fields(&"n".repeat(51), "a", "").is_err());
        assert!(validate_fields("a", "a", &"c".repeat(21)).is_err());
    }
}
