//! 账单分类

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::SeaOrmStorage;
use crate::errors::{AppError, Result};

use migration::entities::{bill, category};

/// 兜底分类的 key，删除分类时账单迁移到这里
pub const OTHER_CATEGORY_KEY: &str = "other";
const OTHER_CATEGORY_NAME: &str = "Other";

#[derive(Debug, Clone)]
pub struct CategoryWithCount {
    pub category: category::Model,
    pub bill_count: i64,
}

#[derive(Debug, FromQueryResult)]
struct BillCountRow {
    category_id: i64,
    count: i64,
}

impl SeaOrmStorage {
    pub async fn list_categories(&self, kind: Option<&str>) -> Result<Vec<CategoryWithCount>> {
        let mut query = category::Entity::find();
        if let Some(kind) = kind {
            query = query.filter(category::Column::Kind.eq(kind));
        }
        let categories = query
            .order_by_asc(category::Column::Kind)
            .order_by_asc(category::Column::Id)
            .all(&self.db)
            .await?;

        let counts: HashMap<i64, i64> = bill::Entity::find()
            .select_only()
            .column(bill::Column::CategoryId)
            .column_as(bill::Column::Id.count(), "count")
            .filter(bill::Column::DeletedAt.is_null())
            .group_by(bill::Column::CategoryId)
            .into_model::<BillCountRow>()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| (r.category_id, r.count))
            .collect();

        Ok(categories
            .into_iter()
            .map(|category| {
                let bill_count = counts.get(&category.id).copied().unwrap_or(0);
                CategoryWithCount {
                    category,
                    bill_count,
                }
            })
            .collect())
    }

    pub async fn find_category(&self, id: i64) -> Result<Option<category::Model>> {
        Ok(category::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_category_by_name(
        &self,
        name: &str,
        kind: &str,
    ) -> Result<Option<category::Model>> {
        Ok(category::Entity::find()
            .filter(category::Column::Name.eq(name))
            .filter(category::Column::Kind.eq(kind))
            .one(&self.db)
            .await?)
    }

    pub async fn category_key_exists(&self, key: &str) -> Result<bool> {
        Ok(category::Entity::find()
            .filter(category::Column::Key.eq(key))
            .count(&self.db)
            .await?
            > 0)
    }

    pub async fn categories_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, category::Model>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(category::Entity::find()
            .filter(category::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect())
    }

    pub async fn insert_category(
        &self,
        name: &str,
        key: &str,
        kind: &str,
    ) -> Result<category::Model> {
        let model = category::ActiveModel {
            name: Set(name.to_string()),
            key: Set(key.to_string()),
            kind: Set(kind.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?)
    }

    /// 删除分类，其下账单迁移到 `other` 分类（不存在则创建）
    pub async fn delete_category_reassigning(&self, id: i64) -> Result<()> {
        let txn = self.db.begin().await?;

        let Some(target) = category::Entity::find_by_id(id).one(&txn).await? else {
            return Err(AppError::not_found("category not found"));
        };

        let bill_count = bill::Entity::find()
            .filter(bill::Column::CategoryId.eq(id))
            .count(&txn)
            .await?;

        if bill_count > 0 {
            if target.key == OTHER_CATEGORY_KEY {
                return Err(AppError::validation(
                    "cannot delete the 'other' category while it still has bills",
                ));
            }

            let other = match category::Entity::find()
                .filter(category::Column::Key.eq(OTHER_CATEGORY_KEY))
                .one(&txn)
                .await?
            {
                Some(other) => other,
                None => {
                    category::ActiveModel {
                        name: Set(OTHER_CATEGORY_NAME.to_string()),
                        key: Set(OTHER_CATEGORY_KEY.to_string()),
                        kind: Set(target.kind.clone()),
                        created_at: Set(Utc::now()),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?
                }
            };

            bill::Entity::update_many()
                .col_expr(bill::Column::CategoryId, Expr::value(other.id))
                .filter(bill::Column::CategoryId.eq(id))
                .exec(&txn)
                .await?;
        }

        category::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}
