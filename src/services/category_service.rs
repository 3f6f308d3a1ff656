//! Ledger category service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use super::post_service::{check_max_len, check_required};
use crate::api::services::types::TS_EXPORT_PATH;
use crate::errors::{AppError, Result};
use crate::storage::SeaOrmStorage;
use crate::storage::backend::{CategoryWithCount, KIND_EXPENSE, KIND_INCOME};

use migration::entities::category;

const NAME_MAX: usize = 50;
const KEY_MAX: usize = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub key: String,
    /// 缺省为 expense
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_count: Option<i64>,
}

impl From<category::Model> for CategoryView {
    fn from(c: category::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
            key: c.key,
            kind: c.kind,
            created_at: c.created_at,
            bill_count: None,
        }
    }
}

impl From<CategoryWithCount> for CategoryView {
    fn from(c: CategoryWithCount) -> Self {
        let mut view = CategoryView::from(c.category);
        view.bill_count = Some(c.bill_count);
        view
    }
}

/// 收支类型只能是 expense / income
pub(crate) fn check_kind(kind: &str) -> Result<()> {
    match kind {
        KIND_EXPENSE | KIND_INCOME => Ok(()),
        _ => Err(AppError::field("type", "type must be expense or income")),
    }
}

pub struct CategoryService {
    storage: Arc<SeaOrmStorage>,
}

impl CategoryService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn list(&self, query: &CategoryListQuery) -> Result<Vec<CategoryView>> {
        let kind = query.kind.as_deref().filter(|k| !k.is_empty());
        if let Some(kind) = kind {
            check_kind(kind)?;
        }
        let categories = self.storage.list_categories(kind).await?;
        Ok(categories.into_iter().map(CategoryView::from).collect())
    }

    pub async fn create(&self, req: CreateCategoryRequest) -> Result<CategoryView> {
        let name = req.name.trim();
        let key = req.key.trim();
        check_required("name", name)?;
        check_max_len("name", name, NAME_MAX)?;
        check_required("key", key)?;
        check_max_len("key", key, KEY_MAX)?;

        let kind = req
            .kind
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| KIND_EXPENSE.to_string());
        check_kind(&kind)?;

        if self.storage.category_key_exists(key).await? {
            return Err(AppError::conflict(format!(
                "category key '{}' already exists",
                key
            )));
        }
        if self.storage.find_category_by_name(name, &kind).await?.is_some() {
            return Err(AppError::conflict(format!(
                "category '{}' already exists for {}",
                name, kind
            )));
        }

        let created = self.storage.insert_category(name, key, &kind).await?;
        info!("CategoryService: created category {} '{}'", created.id, created.key);
        Ok(created.into())
    }

    /// 删除分类，其账单迁移到 `other`
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.storage.delete_category_reassigning(id).await?;
        info!("CategoryService: deleted category {}", id);
        Ok(())
    }
}
