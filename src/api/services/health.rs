//! 存活探针

use actix_web::{HttpResponse, web};
use serde::Serialize;

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthStatus { status: "ok" })
}

pub fn health_routes() -> actix_web::Resource {
    web::resource("/health").route(web::get().to(health)).route(web::head().to(health))
}
