//! 站点级端点：站点配置、贡献日历、RSS / sitemap / robots、访问统计上报

use std::sync::Arc;

use actix_web::{HttpResponse, web};

use crate::api::services::helpers::{api_result, error_from_app, message_result};
use crate::services::{
    AnalyticsService, ContributionQuery, ContributionService, FeedKind, FeedService,
    ROBOTS_CONTENT_TYPE, RSS_CONTENT_TYPE, SITEMAP_CONTENT_TYPE, SiteConfigService,
    TrackEventRequest, TrackPageViewRequest, Visitor,
};

pub async fn site_config(site_config: web::Data<Arc<SiteConfigService>>) -> HttpResponse {
    api_result(site_config.public_view().await)
}

pub async fn contributions(
    query: web::Query<ContributionQuery>,
    contributions: web::Data<Arc<ContributionService>>,
) -> HttpResponse {
    api_result(contributions.calendar(&query).await)
}

// ============ Feeds ============

fn text_body(content_type: &'static str, body: String) -> HttpResponse {
    HttpResponse::Ok().content_type(content_type).body(body)
}

async fn rss(feeds: &FeedService, kind: FeedKind) -> HttpResponse {
    match feeds.rss(kind).await {
        Ok(xml) => text_body(RSS_CONTENT_TYPE, xml),
        Err(e) => error_from_app(&e),
    }
}

pub async fn rss_all(feeds: web::Data<Arc<FeedService>>) -> HttpResponse {
    rss(&feeds, FeedKind::All).await
}

pub async fn rss_posts(feeds: web::Data<Arc<FeedService>>) -> HttpResponse {
    rss(&feeds, FeedKind::Posts).await
}

pub async fn rss_life(feeds: web::Data<Arc<FeedService>>) -> HttpResponse {
    rss(&feeds, FeedKind::Life).await
}

pub async fn sitemap(feeds: web::Data<Arc<FeedService>>) -> HttpResponse {
    match feeds.sitemap().await {
        Ok(xml) => text_body(SITEMAP_CONTENT_TYPE, xml),
        Err(e) => error_from_app(&e),
    }
}

pub async fn robots(feeds: web::Data<Arc<FeedService>>) -> HttpResponse {
    text_body(ROBOTS_CONTENT_TYPE, feeds.robots())
}

// ============ 访问统计上报 ============

pub async fn track_event(
    body: web::Json<TrackEventRequest>,
    visitor: Visitor,
    analytics: web::Data<Arc<AnalyticsService>>,
) -> HttpResponse {
    message_result(
        analytics.track_event(body.into_inner(), &visitor).await,
        "event recorded",
    )
}

pub async fn track_pageview(
    body: web::Json<TrackPageViewRequest>,
    visitor: Visitor,
    analytics: web::Data<Arc<AnalyticsService>>,
) -> HttpResponse {
    message_result(
        analytics.record_pageview(body.into_inner(), &visitor).await,
        "pageview recorded",
    )
}
