//! Bill (ledger) service
//!
//! 金额一律取绝对值并保留两位小数；退款与报销共用 refund 列：
//! - refund_type = 1：退款，仅限支出
//! - refund_type = 2：报销 / 代付，任意类型
//!
//! 任意操作之后都满足 refund <= amount。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{Datelike, Days, Local, Months, NaiveDate, Utc};
use sea_orm::{ActiveValue::NotSet, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use super::category_service::check_kind;
use super::post_service::check_max_len;
use super::{CategoryView, PageParams, Paginated};
use crate::api::services::types::TS_EXPORT_PATH;
use crate::errors::{AppError, Result};
use crate::storage::SeaOrmStorage;
use crate::storage::backend::{
    BillFilter, BillStatsFilter, CategorySumRow, DateBucket, KIND_EXPENSE, KIND_INCOME,
    PeriodSumRow,
};
use crate::utils::round_cents;

use migration::entities::{bill, category};

pub const REFUND_NONE: i32 = 0;
pub const REFUND_REFUND: i32 = 1;
pub const REFUND_CHARGEBACK: i32 = 2;

const PERIOD_MONTH: &str = "month";
const PERIOD_YEAR: &str = "year";
const DESC_MAX: usize = 500;
const DAILY_TREND_DAYS: u64 = 30;
const MONTHLY_TREND_MONTHS: u32 = 12;

// ============ Request/Response DTOs ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub period_type: Option<String>,
    pub is_consumed: Option<bool>,
    pub refund_type: Option<i32>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBillRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub category_id: Option<i64>,
    /// 未给 category_id 时按 (名称, 类型) 查找分类
    pub category_name: Option<String>,
    pub amount: f64,
    #[serde(rename = "desc", default)]
    pub description: String,
    /// YYYY-MM-DD
    pub date: String,
    pub period_type: Option<String>,
    pub is_consumed: Option<bool>,
    pub refund: Option<f64>,
    pub refund_type: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBillRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub amount: Option<f64>,
    #[serde(rename = "desc")]
    pub description: Option<String>,
    pub date: Option<String>,
    pub period_type: Option<String>,
    pub is_consumed: Option<bool>,
    pub refund: Option<f64>,
    pub refund_type: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundRequest {
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillStatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub is_consumed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct BillView {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub category_id: i64,
    pub amount: f64,
    #[serde(rename = "desc")]
    pub description: String,
    pub date: NaiveDate,
    pub period_type: String,
    pub is_consumed: bool,
    pub refund: f64,
    pub refund_type: i32,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub category: Option<CategoryView>,
}

#[derive(Debug, Clone, Default, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct BillStatistics {
    pub total_expense: f64,
    pub total_income: f64,
    pub month_expense: f64,
    pub month_income: f64,
    pub year_expense: f64,
    pub year_income: f64,
    /// 分类名 -> 金额
    pub expense_by_category: BTreeMap<String, f64>,
    pub income_by_category: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct TrendPoint {
    pub date: String,
    pub expense: f64,
    pub income: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CategoryRankingItem {
    pub category_name: String,
    pub total: f64,
}

impl BillView {
    fn new(b: bill::Model, category: Option<category::Model>) -> Self {
        Self {
            id: b.id,
            kind: b.kind,
            category_id: b.category_id,
            amount: b.amount,
            description: b.description,
            date: b.date,
            period_type: b.period_type,
            is_consumed: b.is_consumed,
            refund: b.refund,
            refund_type: b.refund_type,
            created_at: b.created_at,
            updated_at: b.updated_at,
            category: category.map(CategoryView::from),
        }
    }
}

// ============ 校验 ============

fn cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// 取绝对值并保留两位小数；0 与非有限数拒绝
pub(crate) fn normalize_amount(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(AppError::field(field, format!("{} must be a number", field)));
    }
    let amount = round_cents(value.abs());
    if cents(amount) == 0 {
        return Err(AppError::field(field, format!("{} must not be zero", field)));
    }
    Ok(amount)
}

pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::DateParse(format!("{} must be in YYYY-MM-DD format", field))
    })
}

fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_date(field, v).map(Some),
        None => Ok(None),
    }
}

fn check_period(period: &str) -> Result<()> {
    match period {
        PERIOD_MONTH | PERIOD_YEAR => Ok(()),
        _ => Err(AppError::field("period_type", "period_type must be month or year")),
    }
}

/// 校验并规范化 (refund, refund_type)
///
/// refund = 0 时 refund_type 强制为 0；refund > 0 时 refund_type 必须为 1 或 2。
fn normalize_refund(refund: f64, refund_type: i32, amount: f64) -> Result<(f64, i32)> {
    if !refund.is_finite() || refund < 0.0 {
        return Err(AppError::field("refund", "refund must not be negative"));
    }
    let refund = round_cents(refund);
    if cents(refund) == 0 {
        return Ok((0.0, REFUND_NONE));
    }
    if refund_type != REFUND_REFUND && refund_type != REFUND_CHARGEBACK {
        return Err(AppError::InvalidRefundType(
            "refund_type must be 1 (refund) or 2 (chargeback) when refund is set".to_string(),
        ));
    }
    if cents(refund) > cents(amount) {
        return Err(AppError::RefundExceedsAmount(format!(
            "refund {:.2} exceeds bill amount {:.2}",
            refund, amount
        )));
    }
    Ok((refund, refund_type))
}

// ============ 日期窗口 ============

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

fn year_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
    let end = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date);
    (start, end)
}

/// 以 today 结尾的 n 天，升序
fn day_labels(today: NaiveDate, n: u64) -> Vec<String> {
    (0..n)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect()
}

/// 以 today 所在月结尾的 n 个月，升序
fn month_labels(today: NaiveDate, n: u32) -> Vec<String> {
    let this_month = first_of_month(today);
    (0..n)
        .rev()
        .filter_map(|back| this_month.checked_sub_months(Months::new(back)))
        .map(|d| d.format("%Y-%m").to_string())
        .collect()
}

/// 按 label 补零
fn zero_fill(labels: Vec<String>, rows: Vec<PeriodSumRow>) -> Vec<TrendPoint> {
    let mut sums: HashMap<String, (f64, f64)> = HashMap::new();
    for row in rows {
        let entry = sums.entry(row.label).or_default();
        let total = row.total.unwrap_or(0.0);
        if row.kind == KIND_EXPENSE {
            entry.0 += total;
        } else if row.kind == KIND_INCOME {
            entry.1 += total;
        }
    }
    labels
        .into_iter()
        .map(|label| {
            let (expense, income) = sums.get(&label).copied().unwrap_or_default();
            TrendPoint {
                date: label,
                expense: round_cents(expense),
                income: round_cents(income),
            }
        })
        .collect()
}

fn rank_categories(
    rows: Vec<CategorySumRow>,
    names: &HashMap<i64, category::Model>,
) -> Vec<CategoryRankingItem> {
    let mut items: Vec<CategoryRankingItem> = rows
        .into_iter()
        .map(|row| CategoryRankingItem {
            category_name: names
                .get(&row.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("#{}", row.category_id)),
            total: round_cents(row.total.unwrap_or(0.0)),
        })
        .collect();
    items.sort_by(|a, b| {
        cents(b.total)
            .cmp(&cents(a.total))
            .then_with(|| a.category_name.cmp(&b.category_name))
    });
    items
}

// ============ BillService ============

pub struct BillService {
    storage: Arc<SeaOrmStorage>,
}

impl BillService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    async fn with_category(&self, bill: bill::Model) -> Result<BillView> {
        let category = self.storage.find_category(bill.category_id).await?;
        Ok(BillView::new(bill, category))
    }

    /// 按 id，或按 (名称, 类型) 解析分类；都解析不到时 400
    async fn resolve_category(
        &self,
        category_id: Option<i64>,
        category_name: Option<&str>,
        kind: &str,
    ) -> Result<category::Model> {
        if let Some(id) = category_id.filter(|id| *id > 0) {
            return self
                .storage
                .find_category(id)
                .await?
                .ok_or_else(|| AppError::field("category_id", "category does not exist"));
        }
        if let Some(name) = category_name.map(str::trim).filter(|n| !n.is_empty()) {
            return self
                .storage
                .find_category_by_name(name, kind)
                .await?
                .ok_or_else(|| {
                    AppError::field("category_name", "no category with this name and type")
                });
        }
        Err(AppError::field(
            "category_id",
            "category_id or category_name is required",
        ))
    }

    pub async fn list(&self, query: &BillListQuery) -> Result<Paginated<BillView>> {
        let params = PageParams::new(query.page, query.limit);
        let filter = BillFilter {
            kind: query.kind.clone().filter(|k| !k.is_empty()),
            category_id: query.category_id,
            start_date: parse_optional_date("start_date", query.start_date.as_deref())?,
            end_date: parse_optional_date("end_date", query.end_date.as_deref())?,
            period_type: query.period_type.clone().filter(|p| !p.is_empty()),
            is_consumed: query.is_consumed,
            refund_type: query.refund_type,
            search: query
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        };

        let (bills, total) = self
            .storage
            .list_bills(&filter, params.page, params.limit)
            .await?;
        let ids: Vec<i64> = bills.iter().map(|b| b.category_id).collect();
        let categories = self.storage.categories_by_ids(&ids).await?;

        let items = bills
            .into_iter()
            .map(|b| {
                let category = categories.get(&b.category_id).cloned();
                BillView::new(b, category)
            })
            .collect();
        Ok(Paginated::new(items, params, total))
    }

    pub async fn get(&self, id: i64) -> Result<BillView> {
        let bill = self
            .storage
            .find_bill(id)
            .await?
            .ok_or_else(|| AppError::not_found("bill not found"))?;
        self.with_category(bill).await
    }

    pub async fn create(&self, req: CreateBillRequest) -> Result<BillView> {
        check_kind(&req.kind)?;
        let amount = normalize_amount("amount", req.amount)?;
        check_max_len("desc", &req.description, DESC_MAX)?;
        let date = parse_date("date", &req.date)?;
        let period_type = req
            .period_type
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| PERIOD_MONTH.to_string());
        check_period(&period_type)?;
        let (refund, refund_type) = normalize_refund(
            req.refund.unwrap_or(0.0),
            req.refund_type.unwrap_or(REFUND_NONE),
            amount,
        )?;

        let category = self
            .resolve_category(req.category_id, req.category_name.as_deref(), &req.kind)
            .await?;

        let now = Utc::now();
        let saved = self
            .storage
            .insert_bill(bill::ActiveModel {
                id: NotSet,
                kind: Set(req.kind),
                category_id: Set(category.id),
                amount: Set(amount),
                description: Set(req.description),
                date: Set(date),
                period_type: Set(period_type),
                is_consumed: Set(req.is_consumed.unwrap_or(true)),
                refund: Set(refund),
                refund_type: Set(refund_type),
                created_at: Set(now),
                updated_at: Set(now),
                deleted_at: Set(None),
            })
            .await?;

        info!(
            "BillService: created {} bill {} ({:.2})",
            saved.kind, saved.id, saved.amount
        );
        Ok(BillView::new(saved, Some(category)))
    }

    /// 只应用出现的字段，合并后重新校验 refund <= amount
    pub async fn update(&self, id: i64, req: UpdateBillRequest) -> Result<BillView> {
        let existing = self
            .storage
            .find_bill(id)
            .await?
            .ok_or_else(|| AppError::not_found("bill not found"))?;

        let kind = match req.kind.filter(|k| !k.is_empty()) {
            Some(kind) => {
                check_kind(&kind)?;
                kind
            }
            None => existing.kind.clone(),
        };
        let amount = match req.amount {
            Some(a) => normalize_amount("amount", a)?,
            None => existing.amount,
        };

        let category_id = if req.category_id.is_some() || req.category_name.is_some() {
            self.resolve_category(req.category_id, req.category_name.as_deref(), &kind)
                .await?
                .id
        } else {
            existing.category_id
        };

        let (refund, refund_type) = match (req.refund, req.refund_type) {
            (Some(refund), refund_type) => {
                let refund_type = refund_type.unwrap_or(existing.refund_type);
                normalize_refund(refund, refund_type, amount)?
            }
            (None, Some(REFUND_NONE)) => (0.0, REFUND_NONE),
            (None, Some(refund_type)) => normalize_refund(existing.refund, refund_type, amount)?,
            (None, None) => normalize_refund(existing.refund, existing.refund_type, amount)?,
        };

        let mut model = existing.into_active_model();
        model.kind = Set(kind);
        model.amount = Set(amount);
        model.category_id = Set(category_id);
        model.refund = Set(refund);
        model.refund_type = Set(refund_type);
        if let Some(description) = req.description {
            check_max_len("desc", &description, DESC_MAX)?;
            model.description = Set(description);
        }
        if let Some(date) = req.date.filter(|d| !d.is_empty()) {
            model.date = Set(parse_date("date", &date)?);
        }
        if let Some(period) = req.period_type.filter(|p| !p.is_empty()) {
            check_period(&period)?;
            model.period_type = Set(period);
        }
        if let Some(consumed) = req.is_consumed {
            model.is_consumed = Set(consumed);
        }
        model.updated_at = Set(Utc::now());

        let saved = self.storage.update_bill(model).await?;
        self.with_category(saved).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.storage.soft_delete_bill(id).await? {
            return Err(AppError::not_found("bill not found"));
        }
        info!("BillService: deleted bill {}", id);
        Ok(())
    }

    /// 退款：仅支出，累加，refund_type = 1
    pub async fn refund(&self, id: i64, amount: f64) -> Result<BillView> {
        let amount = normalize_amount("amount", amount)?;
        let saved = self
            .storage
            .add_bill_refund(id, amount, REFUND_REFUND, true)
            .await?;
        info!("BillService: refund {:.2} on bill {}", amount, id);
        self.with_category(saved).await
    }

    /// 报销 / 代付：任意类型，累加，refund_type = 2
    pub async fn charge_back(&self, id: i64, amount: f64) -> Result<BillView> {
        let amount = normalize_amount("amount", amount)?;
        let saved = self
            .storage
            .add_bill_refund(id, amount, REFUND_CHARGEBACK, false)
            .await?;
        info!("BillService: chargeback {:.2} on bill {}", amount, id);
        self.with_category(saved).await
    }

    // ============ 统计 ============

    pub async fn statistics(&self, query: &BillStatsQuery) -> Result<BillStatistics> {
        let kind = query.kind.clone().filter(|k| !k.is_empty());
        if let Some(ref kind) = kind {
            check_kind(kind)?;
        }
        let filter = BillStatsFilter {
            start_date: parse_optional_date("start_date", query.start_date.as_deref())?,
            end_date: parse_optional_date("end_date", query.end_date.as_deref())?,
            kind: kind.clone(),
            is_consumed: query.is_consumed,
        };

        let today = Local::now().date_naive();
        let month_filter = BillStatsFilter {
            start_date: Some(first_of_month(today)),
            end_date: Some(last_of_month(today)),
            kind: kind.clone(),
            is_consumed: query.is_consumed,
        };
        let (year_start, year_end) = year_bounds(today);
        let year_filter = BillStatsFilter {
            start_date: Some(year_start),
            end_date: Some(year_end),
            kind,
            is_consumed: query.is_consumed,
        };

        let mut stats = BillStatistics::default();
        (stats.total_expense, stats.total_income) = self.kind_totals(&filter).await?;
        (stats.month_expense, stats.month_income) = self.kind_totals(&month_filter).await?;
        (stats.year_expense, stats.year_income) = self.kind_totals(&year_filter).await?;

        let rows = self.storage.sum_bills_by_category(&filter).await?;
        let ids: Vec<i64> = rows.iter().map(|r| r.category_id).collect();
        let names = self.storage.categories_by_ids(&ids).await?;
        for row in rows {
            let name = names
                .get(&row.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("#{}", row.category_id));
            let target = if row.kind == KIND_EXPENSE {
                &mut stats.expense_by_category
            } else {
                &mut stats.income_by_category
            };
            let total = target.entry(name).or_default();
            *total = round_cents(*total + row.total.unwrap_or(0.0));
        }

        Ok(stats)
    }

    async fn kind_totals(&self, filter: &BillStatsFilter) -> Result<(f64, f64)> {
        let mut expense = 0.0;
        let mut income = 0.0;
        for row in self.storage.sum_bills_by_kind(filter).await? {
            match row.kind.as_str() {
                KIND_EXPENSE => expense += row.total.unwrap_or(0.0),
                KIND_INCOME => income += row.total.unwrap_or(0.0),
                _ => {}
            }
        }
        Ok((round_cents(expense), round_cents(income)))
    }

    /// 最近 30 天（含今天）每日收支，补零
    pub async fn daily_trend(&self) -> Result<Vec<TrendPoint>> {
        let today = Local::now().date_naive();
        let labels = day_labels(today, DAILY_TREND_DAYS);
        let filter = BillStatsFilter {
            start_date: today.checked_sub_days(Days::new(DAILY_TREND_DAYS - 1)),
            end_date: Some(today),
            ..Default::default()
        };
        let rows = self
            .storage
            .sum_bills_by_period(&filter, DateBucket::Day)
            .await?;
        Ok(zero_fill(labels, rows))
    }

    /// 最近 12 个月（含本月）每月收支，补零
    pub async fn monthly_trend(&self) -> Result<Vec<TrendPoint>> {
        let today = Local::now().date_naive();
        let labels = month_labels(today, MONTHLY_TREND_MONTHS);
        let filter = BillStatsFilter {
            start_date: first_of_month(today)
                .checked_sub_months(Months::new(MONTHLY_TREND_MONTHS - 1)),
            end_date: Some(last_of_month(today)),
            ..Default::default()
        };
        let rows = self
            .storage
            .sum_bills_by_period(&filter, DateBucket::Month)
            .await?;
        Ok(zero_fill(labels, rows))
    }

    /// 近 12 个月支出分类排行：金额降序，同额按名称升序
    pub async fn category_ranking(&self) -> Result<Vec<CategoryRankingItem>> {
        let today = Local::now().date_naive();
        let filter = BillStatsFilter {
            start_date: first_of_month(today)
                .checked_sub_months(Months::new(MONTHLY_TREND_MONTHS - 1)),
            end_date: None,
            kind: Some(KIND_EXPENSE.to_string()),
            is_consumed: None,
        };
        let rows = self.storage.sum_bills_by_category(&filter).await?;
        let ids: Vec<i64> = rows.iter().map(|r| r.category_id).collect();
        let names = self.storage.categories_by_ids(&ids).await?;
        Ok(rank_categories(rows, &names))
    }
}
