//! 管理后台 API（`/api/admin`）
//!
//! 除 login / refresh 外全部经过 `AdminAuth`。

pub mod analytics;
pub mod auth;
pub mod comments;
pub mod config_ops;
pub mod content;
pub mod ledger;
pub mod upload;
