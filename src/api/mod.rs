//! HTTP 层：中间件、handler 与路由

pub mod constants;
pub mod jwt;
pub mod middleware;
pub mod services;
