//! 访问日志与埋点事件
//!
//! 聚合查询返回 `anyhow::Result`，由 AnalyticsService 转换为 AppError。

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use super::{DateBucket, SeaOrmStorage};
use crate::errors::Result;

use migration::entities::{analytics_event, page_view};

// ============ 写入参数 ============

/// 一条页面访问记录
#[derive(Debug, Clone, Default)]
pub struct NewPageView {
    pub page_type: String,
    pub page_id: Option<i64>,
    pub ip_address: String,
    pub user_agent: String,
    pub referer: String,
    pub device_type: String,
    pub browser: String,
    pub os: String,
}

// ============ 查询结果类型 ============

#[derive(Debug, FromQueryResult)]
pub struct VisitRow {
    pub label: String,
    pub pv: i64,
    pub uv: i64,
}

#[derive(Debug, FromQueryResult)]
pub struct EventCountRow {
    pub event_name: String,
    pub count: i64,
}

#[derive(Debug, FromQueryResult)]
pub struct DistributionRow {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

impl SeaOrmStorage {
    pub async fn insert_page_view(&self, view: NewPageView) -> Result<()> {
        page_view::ActiveModel {
            page_type: Set(view.page_type),
            page_id: Set(view.page_id),
            ip_address: Set(view.ip_address),
            user_agent: Set(view.user_agent),
            referer: Set(view.referer),
            country: Set(String::new()),
            city: Set(String::new()),
            device_type: Set(view.device_type),
            browser: Set(view.browser),
            os: Set(view.os),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }

    /// 同一访客 (ip + ua) 在 since 之后是否访问过该页面
    pub async fn has_recent_view(
        &self,
        page_type: &str,
        page_id: i64,
        ip: &str,
        user_agent: &str,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let count = page_view::Entity::find()
            .filter(page_view::Column::PageType.eq(page_type))
            .filter(page_view::Column::PageId.eq(page_id))
            .filter(page_view::Column::IpAddress.eq(ip))
            .filter(page_view::Column::UserAgent.eq(user_agent))
            .filter(page_view::Column::CreatedAt.gt(since))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn insert_event(&self, model: analytics_event::ActiveModel) -> Result<()> {
        model.insert(&self.db).await?;
        Ok(())
    }

    /// [start, end) 区间内的 PV
    pub async fn count_page_views(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        page_view::Entity::find()
            .filter(page_view::Column::CreatedAt.gte(start))
            .filter(page_view::Column::CreatedAt.lt(end))
            .count(&self.db)
            .await
            .map_err(Into::into)
    }

    /// [start, end) 区间内的 UV（按 IP 去重）
    pub async fn count_unique_visitors(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let row = page_view::Entity::find()
            .select_only()
            .column_as(Expr::cust("COUNT(DISTINCT ip_address)"), "count")
            .filter(page_view::Column::CreatedAt.gte(start))
            .filter(page_view::Column::CreatedAt.lt(end))
            .into_model::<CountRow>()
            .one(&self.db)
            .await?;
        Ok(row.map(|r| r.count.max(0) as u64).unwrap_or(0))
    }

    /// 按天统计 PV / UV
    pub async fn daily_visits(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<VisitRow>> {
        let label = self.date_expr("created_at", DateBucket::Day);
        page_view::Entity::find()
            .select_only()
            .column_as(label.clone(), "label")
            .column_as(page_view::Column::Id.count(), "pv")
            .column_as(Expr::cust("COUNT(DISTINCT ip_address)"), "uv")
            .filter(page_view::Column::CreatedAt.gte(start))
            .filter(page_view::Column::CreatedAt.lt(end))
            .group_by(label)
            .order_by_asc(Expr::cust("label"))
            .into_model::<VisitRow>()
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// 出现次数最多的事件名
    pub async fn top_events(
        &self,
        event_type: Option<&str>,
        limit: u64,
    ) -> anyhow::Result<Vec<EventCountRow>> {
        let mut query = analytics_event::Entity::find()
            .select_only()
            .column(analytics_event::Column::EventName)
            .column_as(analytics_event::Column::Id.count(), "count");
        if let Some(event_type) = event_type {
            query = query.filter(analytics_event::Column::EventType.eq(event_type));
        }
        query
            .group_by(analytics_event::Column::EventName)
            .order_by_desc(Expr::cust("count"))
            .limit(limit)
            .into_model::<EventCountRow>()
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// 按某一列（device_type / browser / os）统计访问分布
    pub async fn page_view_distribution(
        &self,
        column: page_view::Column,
        limit: u64,
    ) -> anyhow::Result<Vec<DistributionRow>> {
        page_view::Entity::find()
            .select_only()
            .column_as(column, "label")
            .column_as(page_view::Column::Id.count(), "count")
            .filter(column.ne(""))
            .group_by(column)
            .order_by_desc(Expr::cust("count"))
            .limit(limit)
            .into_model::<DistributionRow>()
            .all(&self.db)
            .await
            .map_err(Into::into)
    }
}
