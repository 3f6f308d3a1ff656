//! Analytics service layer
//!
//! 访问记录（page_views）与前端埋点（analytics_events）的写入和聚合。
//! 聚合查询由 storage 返回 `anyhow::Result`，在这里统一转换为 AppError。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{ActiveValue::NotSet, Set};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, EnumString};
use tracing::{debug, info};
use ts_rs::TS;

use super::Visitor;
use super::life_service::PAGE_TYPE_LIFE;
use super::post_service::{PAGE_TYPE_POST, check_max_len, check_required};
use crate::api::services::types::TS_EXPORT_PATH;
use crate::errors::{AppError, Result};
use crate::storage::SeaOrmStorage;
use crate::storage::backend::NewPageView;
use crate::utils::user_agent::detect_device;

use migration::entities::{analytics_event, page_view};

const DEFAULT_VISIT_DAYS: u32 = 30;
const MAX_VISIT_DAYS: u32 = 365;
const DEFAULT_POPULAR_LIMIT: u64 = 10;
const MAX_POPULAR_LIMIT: u64 = 50;
const TOP_EVENTS_LIMIT: u64 = 20;
const DISTRIBUTION_LIMIT: u64 = 10;
const AVERAGE_WINDOW_DAYS: i64 = 30;

// ============ 公共类型定义 ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackEventRequest {
    pub event_type: String,
    pub event_name: String,
    #[serde(default)]
    pub page_type: String,
    pub page_id: Option<i64>,
    /// 前端生成的匿名访客 id
    #[serde(default)]
    pub user_id: String,
    pub properties: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackPageViewRequest {
    pub page_type: String,
    pub page_id: Option<i64>,
    #[serde(default)]
    pub referer: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitsQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsQuery {
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartsQuery {
    #[serde(default)]
    pub chart_type: String,
}

/// 支持的分布图类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ChartType {
    DeviceDistribution,
    BrowserDistribution,
    OsDistribution,
}

impl ChartType {
    fn column(self) -> page_view::Column {
        match self {
            ChartType::DeviceDistribution => page_view::Column::DeviceType,
            ChartType::BrowserDistribution => page_view::Column::Browser,
            ChartType::OsDistribution => page_view::Column::Os,
        }
    }

    /// 设备类型只有几种，不截断
    fn limit(self) -> u64 {
        match self {
            ChartType::DeviceDistribution => u64::MAX,
            _ => DISTRIBUTION_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Overview {
    pub total_pv: u64,
    pub today_pv: u64,
    pub avg_pv_30_days: f64,
    pub total_uv: u64,
    pub today_uv: u64,
    pub avg_uv_30_days: f64,
    pub post_count: u64,
    pub life_count: u64,
    pub comment_count: u64,
    pub tag_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct VisitPoint {
    pub date: String,
    pub pv: u64,
    pub uv: u64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PopularItem {
    pub id: i64,
    pub title: String,
    pub view_count: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PopularContent {
    pub posts: Vec<PopularItem>,
    pub life: Vec<PopularItem>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct EventCount {
    pub event_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct DistributionItem {
    pub name: String,
    pub count: u64,
    pub percentage: f64,
}

/// 百分比保留两位小数
fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 10000.0).round() / 100.0
}

fn query_failed(what: &str, err: anyhow::Error) -> AppError {
    AppError::database_operation(format!("{} query failed: {}", what, err))
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

/// 以 end 为最后一天的连续 days 天，缺失的日期补 0
fn zero_fill_days(rows: HashMap<String, (u64, u64)>, end: NaiveDate, days: u32) -> Vec<VisitPoint> {
    (0..days as i64)
        .rev()
        .map(|offset| {
            let date = (end - Duration::days(offset)).format("%Y-%m-%d").to_string();
            let (pv, uv) = rows.get(&date).copied().unwrap_or((0, 0));
            VisitPoint { date, pv, uv }
        })
        .collect()
}

// ============ AnalyticsService ============

pub struct AnalyticsService {
    storage: Arc<SeaOrmStorage>,
}

impl AnalyticsService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    // ============ 采集 ============

    pub async fn track_event(&self, req: TrackEventRequest, visitor: &Visitor) -> Result<()> {
        check_required("event_type", &req.event_type)?;
        check_required("event_name", &req.event_name)?;
        check_max_len("event_type", &req.event_type, 50)?;
        check_max_len("event_name", &req.event_name, 100)?;

        let properties = match req.properties {
            Some(Value::Object(map)) => Some(serde_json::to_string(&map)?),
            Some(Value::Null) | None => None,
            Some(_) => {
                return Err(AppError::field("properties", "properties must be an object"));
            }
        };

        self.storage
            .insert_event(analytics_event::ActiveModel {
                id: NotSet,
                event_type: Set(req.event_type),
                event_name: Set(req.event_name),
                page_type: Set(req.page_type),
                page_id: Set(req.page_id),
                user_id: Set(req.user_id),
                properties: Set(properties),
                ip_address: Set(visitor.ip.clone()),
                user_agent: Set(visitor.user_agent.clone()),
                created_at: Set(Utc::now()),
            })
            .await
    }

    /// 前端主动上报的页面访问；referer 以请求体为准，缺省时取请求头
    pub async fn record_pageview(&self, req: TrackPageViewRequest, visitor: &Visitor) -> Result<()> {
        check_required("page_type", &req.page_type)?;
        check_max_len("page_type", &req.page_type, 50)?;

        let device = detect_device(&visitor.user_agent);
        let referer = if req.referer.is_empty() {
            visitor.referer.clone()
        } else {
            req.referer
        };
        self.storage
            .insert_page_view(NewPageView {
                page_type: req.page_type,
                page_id: req.page_id,
                ip_address: visitor.ip.clone(),
                user_agent: visitor.user_agent.clone(),
                referer,
                device_type: device.device_type,
                browser: device.browser,
                os: device.os,
            })
            .await
    }

    // ============ 统计 ============

    pub async fn overview(&self) -> Result<Overview> {
        let now = Utc::now();
        let today = day_start(now.date_naive());
        let tomorrow = today + Duration::days(1);
        let window_start = today - Duration::days(AVERAGE_WINDOW_DAYS - 1);

        let total_pv = self
            .storage
            .count_page_views(DateTime::UNIX_EPOCH, tomorrow)
            .await
            .map_err(|e| query_failed("Total PV", e))?;
        let total_uv = self
            .storage
            .count_unique_visitors(DateTime::UNIX_EPOCH, tomorrow)
            .await
            .map_err(|e| query_failed("Total UV", e))?;
        let today_pv = self
            .storage
            .count_page_views(today, tomorrow)
            .await
            .map_err(|e| query_failed("Today PV", e))?;
        let today_uv = self
            .storage
            .count_unique_visitors(today, tomorrow)
            .await
            .map_err(|e| query_failed("Today UV", e))?;

        // 30 天平均：每日 UV 求和后平均
        let window = self
            .storage
            .daily_visits(window_start, tomorrow)
            .await
            .map_err(|e| query_failed("Daily visits", e))?;
        let (pv_sum, uv_sum) = window.iter().fold((0i64, 0i64), |(pv, uv), row| {
            (pv + row.pv, uv + row.uv)
        });
        let round2 = |v: f64| (v * 100.0).round() / 100.0;

        let overview = Overview {
            total_pv,
            today_pv,
            avg_pv_30_days: round2(pv_sum as f64 / AVERAGE_WINDOW_DAYS as f64),
            total_uv,
            today_uv,
            avg_uv_30_days: round2(uv_sum as f64 / AVERAGE_WINDOW_DAYS as f64),
            post_count: self.storage.count_published_posts().await?,
            life_count: self.storage.count_published_life().await?,
            comment_count: self.storage.count_approved_comments().await?,
            tag_count: self.storage.count_tags().await?,
        };
        debug!("Analytics: overview {:?}", overview);
        Ok(overview)
    }

    /// 最近 days 天（含今天）的 PV / UV
    pub async fn visits(&self, query: &VisitsQuery) -> Result<Vec<VisitPoint>> {
        let days = query
            .days
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_VISIT_DAYS)
            .min(MAX_VISIT_DAYS);
        let today = Utc::now().date_naive();
        let start = day_start(today - Duration::days(days as i64 - 1));
        let end = day_start(today) + Duration::days(1);

        info!("Analytics: visits for the last {} days", days);
        let rows = self
            .storage
            .daily_visits(start, end)
            .await
            .map_err(|e| query_failed("Daily visits", e))?;
        let rows = rows
            .into_iter()
            .map(|r| (r.label, (r.pv.max(0) as u64, r.uv.max(0) as u64)))
            .collect();
        Ok(zero_fill_days(rows, today, days))
    }

    pub async fn popular(&self, query: &PopularQuery) -> Result<PopularContent> {
        let limit = query
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_POPULAR_LIMIT)
            .min(MAX_POPULAR_LIMIT);

        let posts = self
            .storage
            .most_viewed_posts(limit)
            .await?
            .into_iter()
            .map(|p| PopularItem {
                id: p.id,
                title: p.title,
                view_count: p.view_count,
                kind: PAGE_TYPE_POST.to_string(),
            })
            .collect();
        let life = self
            .storage
            .most_viewed_life(limit)
            .await?
            .into_iter()
            .map(|l| PopularItem {
                id: l.id,
                title: l.title,
                view_count: l.view_count,
                kind: PAGE_TYPE_LIFE.to_string(),
            })
            .collect();
        Ok(PopularContent { posts, life })
    }

    pub async fn events(&self, query: &EventsQuery) -> Result<Vec<EventCount>> {
        let event_type = query.event_type.as_deref().filter(|t| !t.is_empty());
        let rows = self
            .storage
            .top_events(event_type, TOP_EVENTS_LIMIT)
            .await
            .map_err(|e| query_failed("Event", e))?;
        Ok(rows
            .into_iter()
            .map(|r| EventCount {
                event_name: r.event_name,
                count: r.count.max(0) as u64,
            })
            .collect())
    }

    /// 设备 / 浏览器 / 系统分布，百分比相对于全部 PV
    pub async fn charts(&self, query: &ChartsQuery) -> Result<Vec<DistributionItem>> {
        let chart: ChartType = query.chart_type.parse().map_err(|_| {
            AppError::validation(format!("unsupported chart type '{}'", query.chart_type))
        })?;

        let total = self
            .storage
            .count_page_views(DateTime::UNIX_EPOCH, Utc::now() + Duration::days(1))
            .await
            .map_err(|e| query_failed("Total PV", e))?;
        let rows = self
            .storage
            .page_view_distribution(chart.column(), chart.limit())
            .await
            .map_err(|e| query_failed(chart.as_ref(), e))?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let count = r.count.max(0) as u64;
                DistributionItem {
                    name: r.label,
                    count,
                    percentage: percentage(count, total),
                }
            })
            .collect())
    }
}
