//! Service layer for business logic
//!
//! 每个资源一个 service：校验请求、维护不变量、把实体转换为视图对象。
//! HTTP handler 与 webhook 共用同一套 service。

mod analytics_service;
mod auth_service;
mod bill_service;
mod category_service;
mod comment_service;
mod contribution_service;
mod feed_service;
mod life_service;
mod post_service;
mod site_config_service;
mod tag_service;
pub mod upload_service;

pub use analytics_service::*;
pub use auth_service::*;
pub use bill_service::*;
pub use category_service::*;
pub use comment_service::*;
pub use contribution_service::*;
pub use feed_service::*;
pub use life_service::*;
pub use post_service::*;
pub use site_config_service::*;
pub use tag_service::*;
pub use upload_service::{LocalDiskStore, ObjectStore, UploadResult, UploadService};

use std::sync::Arc;

use serde::Serialize;
use ts_rs::TS;

use crate::api::services::types::TS_EXPORT_PATH;
use crate::config::AppConfig;
use crate::storage::SeaOrmStorage;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

// ============ 分页 ============

/// 规范化后的分页参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u64,
    pub limit: u64,
}

impl PageParams {
    /// page 最小为 1；limit 缺省 10，上限 100
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = match limit {
            Some(0) | None => DEFAULT_PAGE_SIZE,
            Some(l) => l.min(MAX_PAGE_SIZE),
        };
        Self { page, limit }
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

/// 分页结果 `{items, pagination}`
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, params: PageParams, total: u64) -> Self {
        Self {
            items,
            pagination: Pagination {
                page: params.page,
                limit: params.limit,
                total,
                total_pages: total.div_ceil(params.limit.max(1)),
            },
        }
    }
}

// ============ 访问者信息 ============

/// 请求方信息，由 client_info 中间件从请求中提取
#[derive(Debug, Clone, Default)]
pub struct Visitor {
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
}

// ============ Service 容器 ============

/// 启动时构造一次，各 service 以 `web::Data<Arc<_>>` 注入 handler
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub posts: Arc<PostService>,
    pub life: Arc<LifeService>,
    pub tags: Arc<TagService>,
    pub comments: Arc<CommentService>,
    pub bills: Arc<BillService>,
    pub categories: Arc<CategoryService>,
    pub site_config: Arc<SiteConfigService>,
    pub analytics: Arc<AnalyticsService>,
    pub feeds: Arc<FeedService>,
    pub uploads: Arc<UploadService>,
    pub contributions: Arc<ContributionService>,
}

impl AppServices {
    pub fn new(storage: Arc<SeaOrmStorage>, config: Arc<AppConfig>) -> Self {
        let posts = Arc::new(PostService::new(storage.clone(), config.clone()));
        let store: Option<Arc<dyn ObjectStore>> = if config.upload.local_dir.trim().is_empty() {
            None
        } else {
            Some(Arc::new(LocalDiskStore::new(
                &config.upload.local_dir,
                &config.upload.public_base_url,
            )))
        };

        Self {
            auth: Arc::new(AuthService::new(storage.clone(), config.clone())),
            life: Arc::new(LifeService::new(storage.clone(), config.clone())),
            tags: Arc::new(TagService::new(storage.clone(), posts.clone())),
            comments: Arc::new(CommentService::new(storage.clone(), config.clone())),
            bills: Arc::new(BillService::new(storage.clone())),
            categories: Arc::new(CategoryService::new(storage.clone())),
            site_config: Arc::new(SiteConfigService::new(storage.clone())),
            analytics: Arc::new(AnalyticsService::new(storage.clone())),
            feeds: Arc::new(FeedService::new(storage.clone(), config.clone())),
            uploads: Arc::new(UploadService::new(store, config.upload.clone())),
            contributions: Arc::new(ContributionService::new(storage)),
            posts,
        }
    }
}
