//! Life record service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::NotSet, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;

use super::post_service::{
    STATUS_DRAFT, check_max_len, check_required, check_status, dedup_since, log_page_view,
};
use super::{PageParams, Paginated, Visitor};
use crate::api::services::types::TS_EXPORT_PATH;
use crate::config::{AppConfig, ContentConfig};
use crate::errors::{AppError, Result};
use crate::storage::SeaOrmStorage;
use crate::storage::backend::STATUS_PUBLISHED;
use crate::utils::text::{char_len, take_chars};

use migration::entities::life_record;

pub const PAGE_TYPE_LIFE: &str = "life";
const TITLE_MAX: usize = 200;

// ============ Request/Response DTOs ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLifeRequest {
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLifeRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminLifeListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<String>,
}

/// 生活记录详情（全文）
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct LifeView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub cover_image: String,
    pub status: String,
    pub author_id: i64,
    pub view_count: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_expanded: bool,
}

/// 列表项：长文只给预览
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct LifeListItem {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub cover_image: String,
    pub status: String,
    pub view_count: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub has_more: bool,
}

impl From<life_record::Model> for LifeView {
    fn from(l: life_record::Model) -> Self {
        Self {
            id: l.id,
            title: l.title,
            content: l.content,
            cover_image: l.cover_image,
            status: l.status,
            author_id: l.author_id,
            view_count: l.view_count,
            published_at: l.published_at,
            created_at: l.created_at,
            updated_at: l.updated_at,
            is_expanded: true,
        }
    }
}

/// 超过全文阈值的内容截取预览，返回 (内容, 是否截断)
fn preview(content: &str, content_cfg: &ContentConfig) -> (String, bool) {
    let len = char_len(content);
    if len > content_cfg.life_full_threshold && len > content_cfg.life_preview_length {
        let head = take_chars(content, content_cfg.life_preview_length);
        (format!("{}...", head), true)
    } else {
        (content.to_string(), false)
    }
}

impl LifeListItem {
    fn from_model(l: life_record::Model, content_cfg: &ContentConfig) -> Self {
        let (content, has_more) = preview(&l.content, content_cfg);
        Self {
            id: l.id,
            title: l.title,
            content,
            cover_image: l.cover_image,
            status: l.status,
            view_count: l.view_count,
            published_at: l.published_at,
            created_at: l.created_at,
            has_more,
        }
    }
}

// ============ LifeService ============

pub struct LifeService {
    storage: Arc<SeaOrmStorage>,
    config: Arc<AppConfig>,
}

impl LifeService {
    pub fn new(storage: Arc<SeaOrmStorage>, config: Arc<AppConfig>) -> Self {
        Self { storage, config }
    }

    pub async fn list_published(&self, params: PageParams) -> Result<Paginated<LifeListItem>> {
        let (records, total) = self
            .storage
            .list_published_life(params.page, params.limit)
            .await?;
        let items = records
            .into_iter()
            .map(|l| LifeListItem::from_model(l, &self.config.content))
            .collect();
        Ok(Paginated::new(items, params, total))
    }

    pub async fn get_published(&self, id: i64) -> Result<LifeView> {
        self.storage
            .find_published_life(id)
            .await?
            .map(LifeView::from)
            .ok_or_else(|| AppError::not_found("life record not found"))
    }

    /// 阅读量 +1；同一访客一小时内重复访问不计数
    pub async fn record_view(&self, id: i64, visitor: &Visitor) -> Result<()> {
        let duplicate = self
            .storage
            .has_recent_view(
                PAGE_TYPE_LIFE,
                id,
                &visitor.ip,
                &visitor.user_agent,
                dedup_since(),
            )
            .await?;
        if duplicate {
            debug!("Skip duplicate view of life {} from {}", id, visitor.ip);
            return Ok(());
        }

        if !self.storage.increment_life_views(id).await? {
            return Err(AppError::not_found("life record not found"));
        }
        log_page_view(&self.storage, PAGE_TYPE_LIFE, id, visitor).await;
        Ok(())
    }

    // ============ 后台 ============

    pub async fn admin_list(&self, query: &AdminLifeListQuery) -> Result<Paginated<LifeView>> {
        let params = PageParams::new(query.page, query.limit);
        let status = query.status.as_deref().filter(|s| !s.is_empty());
        let (records, total) = self
            .storage
            .list_life_admin(status, params.page, params.limit)
            .await?;
        let items = records.into_iter().map(LifeView::from).collect();
        Ok(Paginated::new(items, params, total))
    }

    pub async fn admin_get(&self, id: i64) -> Result<LifeView> {
        self.storage
            .find_life(id)
            .await?
            .map(LifeView::from)
            .ok_or_else(|| AppError::not_found("life record not found"))
    }

    pub async fn create(&self, req: CreateLifeRequest, author_id: i64) -> Result<LifeView> {
        check_max_len("title", &req.title, TITLE_MAX)?;
        check_required("content", &req.content)?;
        let status = req.status.unwrap_or_else(|| STATUS_DRAFT.to_string());
        check_status(&status)?;

        let now = Utc::now();
        let record = self
            .storage
            .insert_life(life_record::ActiveModel {
                id: NotSet,
                title: Set(req.title),
                content: Set(req.content),
                cover_image: Set(req.cover_image),
                published_at: Set((status == STATUS_PUBLISHED).then_some(now)),
                status: Set(status),
                author_id: Set(author_id),
                view_count: Set(0),
                created_at: Set(now),
                updated_at: Set(now),
                deleted_at: Set(None),
            })
            .await?;
        info!("LifeService: created life record {}", record.id);
        Ok(record.into())
    }

    pub async fn update(&self, id: i64, req: UpdateLifeRequest) -> Result<LifeView> {
        let existing = self
            .storage
            .find_life(id)
            .await?
            .ok_or_else(|| AppError::not_found("life record not found"))?;

        let first_publish = existing.published_at.is_none();
        let mut model = existing.into_active_model();

        if let Some(title) = req.title {
            check_max_len("title", &title, TITLE_MAX)?;
            model.title = Set(title);
        }
        if let Some(content) = req.content.filter(|c| !c.trim().is_empty()) {
            model.content = Set(content);
        }
        if let Some(cover) = req.cover_image {
            model.cover_image = Set(cover);
        }
        if let Some(status) = req.status.filter(|s| !s.is_empty()) {
            check_status(&status)?;
            if status == STATUS_PUBLISHED && first_publish {
                model.published_at = Set(Some(Utc::now()));
            }
            model.status = Set(status);
        }
        model.updated_at = Set(Utc::now());

        let record = self.storage.update_life(model).await?;
        Ok(record.into())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.storage.soft_delete_life(id).await? {
            return Err(AppError::not_found("life record not found"));
        }
        info!("LifeService: deleted life record {}", id);
        Ok(())
    }
}
