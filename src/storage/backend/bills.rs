//! 账单存储与聚合统计
//!
//! 支出金额按 `amount - refund` 计，收入按 `amount` 计；退款与报销共用 refund 列。

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ExprTrait, FromQueryResult,
    PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{DateBucket, SeaOrmStorage, page_index};
use crate::errors::{AppError, Result};

use migration::entities::bill;

pub const KIND_EXPENSE: &str = "expense";
pub const KIND_INCOME: &str = "income";

/// 累加上限比较的容差，金额已按分存储
const HALF_CENT: f64 = 0.005;

const NET_SUM: &str = "SUM(CASE WHEN kind = 'expense' THEN amount - refund ELSE amount END)";

/// 账单列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    pub kind: Option<String>,
    pub category_id: Option<i64>,
    /// 含当天
    pub start_date: Option<NaiveDate>,
    /// 含当天
    pub end_date: Option<NaiveDate>,
    pub period_type: Option<String>,
    pub is_consumed: Option<bool>,
    pub refund_type: Option<i32>,
    /// 备注模糊匹配
    pub search: Option<String>,
}

/// 统计过滤条件：总计与分类统计共用同一组条件
#[derive(Debug, Clone, Default)]
pub struct BillStatsFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub kind: Option<String>,
    pub is_consumed: Option<bool>,
}

#[derive(Debug, Clone, FromQueryResult)]
pub struct KindSumRow {
    pub kind: String,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, FromQueryResult)]
pub struct CategorySumRow {
    pub category_id: i64,
    pub kind: String,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, FromQueryResult)]
pub struct PeriodSumRow {
    pub label: String,
    pub kind: String,
    pub total: Option<f64>,
}

fn alive() -> Condition {
    Condition::all().add(bill::Column::DeletedAt.is_null())
}

impl BillStatsFilter {
    fn condition(&self) -> Condition {
        let mut condition = alive();
        if let Some(start) = self.start_date {
            condition = condition.add(bill::Column::Date.gte(start));
        }
        if let Some(end) = self.end_date {
            condition = condition.add(bill::Column::Date.lte(end));
        }
        if let Some(ref kind) = self.kind {
            condition = condition.add(bill::Column::Kind.eq(kind.as_str()));
        }
        if let Some(consumed) = self.is_consumed {
            condition = condition.add(bill::Column::IsConsumed.eq(consumed));
        }
        condition
    }
}

/// 以分为单位比较，避免浮点误差
fn cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

impl SeaOrmStorage {
    pub async fn list_bills(
        &self,
        filter: &BillFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<bill::Model>, u64)> {
        let mut condition = alive();
        if let Some(ref kind) = filter.kind {
            condition = condition.add(bill::Column::Kind.eq(kind.as_str()));
        }
        if let Some(category_id) = filter.category_id {
            condition = condition.add(bill::Column::CategoryId.eq(category_id));
        }
        if let Some(start) = filter.start_date {
            condition = condition.add(bill::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            condition = condition.add(bill::Column::Date.lte(end));
        }
        if let Some(ref period) = filter.period_type {
            condition = condition.add(bill::Column::PeriodType.eq(period.as_str()));
        }
        if let Some(consumed) = filter.is_consumed {
            condition = condition.add(bill::Column::IsConsumed.eq(consumed));
        }
        if let Some(refund_type) = filter.refund_type {
            condition = condition.add(bill::Column::RefundType.eq(refund_type));
        }
        if let Some(ref search) = filter.search {
            condition = condition.add(bill::Column::Description.contains(search));
        }

        let paginator = bill::Entity::find()
            .filter(condition)
            .order_by_desc(bill::Column::Date)
            .order_by_desc(bill::Column::Id)
            .paginate(&self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page_index(page)).await?;
        Ok((items, total))
    }

    pub async fn find_bill(&self, id: i64) -> Result<Option<bill::Model>> {
        Ok(bill::Entity::find_by_id(id)
            .filter(alive())
            .one(&self.db)
            .await?)
    }

    pub async fn insert_bill(&self, model: bill::ActiveModel) -> Result<bill::Model> {
        Ok(model.insert(&self.db).await?)
    }

    pub async fn update_bill(&self, model: bill::ActiveModel) -> Result<bill::Model> {
        Ok(model.update(&self.db).await?)
    }

    pub async fn soft_delete_bill(&self, id: i64) -> Result<bool> {
        let result = bill::Entity::update_many()
            .col_expr(bill::Column::DeletedAt, Expr::value(Some(Utc::now())))
            .filter(bill::Column::Id.eq(id))
            .filter(bill::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// 在事务内累加退款 / 报销金额
    ///
    /// 第一条语句就是带条件的 UPDATE：`refund + amount <= amount` 在数据库侧判断，
    /// 行锁（SQLite 为写锁）随之取得，并发累加按提交顺序串行，不会互相覆盖。
    /// 没有命中时再读一次行，区分不存在、类型不符和超额。
    pub async fn add_bill_refund(
        &self,
        id: i64,
        amount: f64,
        refund_type: i32,
        expense_only: bool,
    ) -> Result<bill::Model> {
        let txn = self.db.begin().await?;

        let mut guard = alive()
            .add(bill::Column::Id.eq(id))
            .add(
                Expr::col(bill::Column::Refund)
                    .add(amount)
                    .lte(Expr::col(bill::Column::Amount).add(HALF_CENT)),
            );
        if expense_only {
            guard = guard.add(bill::Column::Kind.eq(KIND_EXPENSE));
        }

        let result = bill::Entity::update_many()
            .col_expr(
                bill::Column::Refund,
                Expr::col(bill::Column::Refund).add(amount),
            )
            .col_expr(bill::Column::RefundType, Expr::value(refund_type))
            .col_expr(bill::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(guard)
            .exec(&txn)
            .await?;

        let Some(current) = bill::Entity::find_by_id(id)
            .filter(alive())
            .one(&txn)
            .await?
        else {
            return Err(AppError::not_found("bill not found"));
        };

        if result.rows_affected == 0 {
            if expense_only && current.kind != KIND_EXPENSE {
                return Err(AppError::RefundExpenseOnly(
                    "only expense bills can be refunded".to_string(),
                ));
            }
            return Err(AppError::RefundExceedsAmount(format!(
                "refund total {:.2} exceeds bill amount {:.2}",
                current.refund + amount,
                current.amount
            )));
        }

        // 浮点累加后对齐到分
        let rounded = cents(current.refund) as f64 / 100.0;
        let updated = if rounded != current.refund {
            let mut model: bill::ActiveModel = current.into();
            model.refund = Set(rounded);
            model.update(&txn).await?
        } else {
            current
        };

        txn.commit().await?;
        Ok(updated)
    }

    /// 按收支类型汇总
    pub async fn sum_bills_by_kind(&self, filter: &BillStatsFilter) -> Result<Vec<KindSumRow>> {
        Ok(bill::Entity::find()
            .select_only()
            .column(bill::Column::Kind)
            .column_as(Expr::cust(NET_SUM), "total")
            .filter(filter.condition())
            .group_by(bill::Column::Kind)
            .into_model::<KindSumRow>()
            .all(&self.db)
            .await?)
    }

    /// 按分类 + 收支类型汇总
    pub async fn sum_bills_by_category(
        &self,
        filter: &BillStatsFilter,
    ) -> Result<Vec<CategorySumRow>> {
        Ok(bill::Entity::find()
            .select_only()
            .column(bill::Column::CategoryId)
            .column(bill::Column::Kind)
            .column_as(Expr::cust(NET_SUM), "total")
            .filter(filter.condition())
            .group_by(bill::Column::CategoryId)
            .group_by(bill::Column::Kind)
            .into_model::<CategorySumRow>()
            .all(&self.db)
            .await?)
    }

    /// 按日 / 按月 + 收支类型汇总，label 升序
    pub async fn sum_bills_by_period(
        &self,
        filter: &BillStatsFilter,
        bucket: DateBucket,
    ) -> Result<Vec<PeriodSumRow>> {
        let label = self.date_expr("date", bucket);
        Ok(bill::Entity::find()
            .select_only()
            .column_as(label.clone(), "label")
            .column(bill::Column::Kind)
            .column_as(Expr::cust(NET_SUM), "total")
            .filter(filter.condition())
            .group_by(label)
            .group_by(bill::Column::Kind)
            .order_by_asc(Expr::cust("label"))
            .into_model::<PeriodSumRow>()
            .all(&self.db)
            .await?)
    }
}
