//! Admin API 账单与分类
//!
//! webhook 的三个端点复用这里的 create / refund / chargeback。

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::api::constants::messages;
use crate::api::services::helpers::{api_result, created_result, message_result};
use crate::services::{
    BillListQuery, BillService, BillStatsQuery, CategoryListQuery, CategoryService,
    CreateBillRequest, CreateCategoryRequest, RefundRequest, UpdateBillRequest,
};

// ============ 账单 ============

pub async fn list_bills(
    query: web::Query<BillListQuery>,
    bills: web::Data<Arc<BillService>>,
) -> HttpResponse {
    api_result(bills.list(&query).await)
}

pub async fn get_bill(id: web::Path<i64>, bills: web::Data<Arc<BillService>>) -> HttpResponse {
    api_result(bills.get(id.into_inner()).await)
}

pub async fn create_bill(
    body: web::Json<CreateBillRequest>,
    bills: web::Data<Arc<BillService>>,
) -> HttpResponse {
    created_result(bills.create(body.into_inner()).await)
}

pub async fn update_bill(
    id: web::Path<i64>,
    body: web::Json<UpdateBillRequest>,
    bills: web::Data<Arc<BillService>>,
) -> HttpResponse {
    api_result(bills.update(id.into_inner(), body.into_inner()).await)
}

pub async fn delete_bill(id: web::Path<i64>, bills: web::Data<Arc<BillService>>) -> HttpResponse {
    message_result(bills.delete(id.into_inner()).await, messages::DELETED)
}

pub async fn refund_bill(
    id: web::Path<i64>,
    body: web::Json<RefundRequest>,
    bills: web::Data<Arc<BillService>>,
) -> HttpResponse {
    let id = id.into_inner();
    info!("Bill {}: refund {}", id, body.amount);
    api_result(bills.refund(id, body.amount).await)
}

pub async fn chargeback_bill(
    id: web::Path<i64>,
    body: web::Json<RefundRequest>,
    bills: web::Data<Arc<BillService>>,
) -> HttpResponse {
    let id = id.into_inner();
    info!("Bill {}: chargeback {}", id, body.amount);
    api_result(bills.charge_back(id, body.amount).await)
}

pub async fn statistics(
    query: web::Query<BillStatsQuery>,
    bills: web::Data<Arc<BillService>>,
) -> HttpResponse {
    api_result(bills.statistics(&query).await)
}

pub async fn daily_trend(bills: web::Data<Arc<BillService>>) -> HttpResponse {
    api_result(bills.daily_trend().await)
}

pub async fn monthly_trend(bills: web::Data<Arc<BillService>>) -> HttpResponse {
    api_result(bills.monthly_trend().await)
}

pub async fn category_ranking(bills: web::Data<Arc<BillService>>) -> HttpResponse {
    api_result(bills.category_ranking().await)
}

// ============ 分类 ============

pub async fn list_categories(
    query: web::Query<CategoryListQuery>,
    categories: web::Data<Arc<CategoryService>>,
) -> HttpResponse {
    api_result(categories.list(&query).await)
}

pub async fn create_category(
    body: web::Json<CreateCategoryRequest>,
    categories: web::Data<Arc<CategoryService>>,
) -> HttpResponse {
    created_result(categories.create(body.into_inner()).await)
}

pub async fn delete_category(
    id: web::Path<i64>,
    categories: web::Data<Arc<CategoryService>>,
) -> HttpResponse {
    message_result(categories.delete(id.into_inner()).await, messages::DELETED)
}
