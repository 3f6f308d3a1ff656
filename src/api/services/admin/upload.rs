//! Admin API 文件上传（multipart 字段 `file`）

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use bytes::BytesMut;
use futures_util::StreamExt;
use tracing::{error, info};

use crate::api::services::helpers::{api_result, error_from_app};
use crate::errors::AppError;
use crate::services::UploadService;

const FILE_FIELD: &str = "file";

pub async fn upload_file(
    mut payload: Multipart,
    uploads: web::Data<Arc<UploadService>>,
) -> HttpResponse {
    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to parse multipart field: {}", e);
                return error_from_app(&AppError::validation(format!(
                    "invalid multipart data: {}",
                    e
                )));
            }
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        if let Err(e) = uploads.check_content_type(&content_type) {
            return error_from_app(&e);
        }
        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();

        // 边读边检查大小，超限立即中断
        let mut data = BytesMut::new();
        while let Some(chunk) = field.next().await {
            match chunk {
                Ok(bytes) => {
                    if let Err(e) = uploads.check_size(data.len() + bytes.len()) {
                        return error_from_app(&e);
                    }
                    data.extend_from_slice(&bytes);
                }
                Err(e) => {
                    error!("Failed to read upload chunk: {}", e);
                    return error_from_app(&AppError::validation(format!(
                        "failed to read file: {}",
                        e
                    )));
                }
            }
        }

        let result = uploads
            .upload(&original_name, &content_type, data.freeze())
            .await;
        if let Ok(uploaded) = &result {
            info!(
                "Admin API: uploaded {} ({} bytes)",
                uploaded.filename, uploaded.size
            );
        }
        return api_result(result);
    }

    error_from_app(&AppError::field(FILE_FIELD, "file is required"))
}
