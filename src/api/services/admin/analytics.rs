//! Admin API 访问统计

use std::sync::Arc;

use actix_web::{HttpResponse, web};

use crate::api::services::helpers::api_result;
use crate::services::{AnalyticsService, ChartsQuery, EventsQuery, PopularQuery, VisitsQuery};

pub async fn overview(analytics: web::Data<Arc<AnalyticsService>>) -> HttpResponse {
    api_result(analytics.overview().await)
}

pub async fn visits(
    query: web::Query<VisitsQuery>,
    analytics: web::Data<Arc<AnalyticsService>>,
) -> HttpResponse {
    api_result(analytics.visits(&query).await)
}

pub async fn popular(
    query: web::Query<PopularQuery>,
    analytics: web::Data<Arc<AnalyticsService>>,
) -> HttpResponse {
    api_result(analytics.popular(&query).await)
}

pub async fn events(
    query: web::Query<EventsQuery>,
    analytics: web::Data<Arc<AnalyticsService>>,
) -> HttpResponse {
    api_result(analytics.events(&query).await)
}

pub async fn charts(
    query: web::Query<ChartsQuery>,
    analytics: web::Data<Arc<AnalyticsService>>,
) -> HttpResponse {
    api_result(analytics.charts(&query).await)
}
