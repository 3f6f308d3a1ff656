//! API 通用类型：响应包裹、分页查询参数

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::FieldError;

/// 输出目录常量
pub const TS_EXPORT_PATH: &str = "../web/src/services/types.generated.ts";

/// 统一响应包裹 `{code, message, data, timestamp, errors?}`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
    /// RFC 3339
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl<T> ApiResponse<T> {
    pub fn new(code: i32, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
            errors: None,
        }
    }
}

/// 分页查询参数 `?page=&limit=`
#[derive(Serialize, Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn params(&self) -> crate::services::PageParams {
        crate::services::PageParams::new(self.page, self.limit)
    }
}
