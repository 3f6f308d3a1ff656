//! File upload service
//!
//! 上传文件先做类型和大小校验，再交给 [`ObjectStore`] 持久化。
//! 当前只有本地磁盘实现；`upload.local_dir` 为空时上传接口返回未配置。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Local;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info};
use ts_rs::TS;

use crate::api::services::types::TS_EXPORT_PATH;
use crate::config::UploadConfig;
use crate::errors::{AppError, Result};
use crate::utils::generate_random_code;

/// 对象存储后端
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 保存对象，返回可公开访问的 URL
    async fn put(&self, name: &str, content_type: &str, data: Bytes) -> Result<String>;

    fn backend_name(&self) -> &'static str;
}

/// 写入本地目录，URL 由 `public_base_url` 拼接
pub struct LocalDiskStore {
    root: PathBuf,
    base_url: String,
}

impl LocalDiskStore {
    pub fn new(dir: &str, base_url: &str) -> Self {
        Self {
            root: PathBuf::from(dir),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStore for LocalDiskStore {
    async fn put(&self, name: &str, _content_type: &str, data: Bytes) -> Result<String> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::file_operation(format!(
                "cannot create upload dir {}: {}",
                self.root.display(),
                e
            ))
        })?;
        let path = self.root.join(name);
        fs::write(&path, &data).await.map_err(|e| {
            AppError::file_operation(format!("cannot write {}: {}", path.display(), e))
        })?;
        debug!("Stored upload at {}", path.display());
        Ok(format!("{}/{}", self.base_url, name))
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UploadResult {
    pub url: String,
    pub filename: String,
    pub size: u64,
}

/// `image/PNG; charset=binary` -> `image/png`
fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// 按已校验的 content type 决定扩展名，客户端文件名不参与
fn extension_for(content_type: &str) -> &'static str {
    match mime_essence(content_type).as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/avif" => ".avif",
        "image/bmp" => ".bmp",
        "image/svg+xml" => ".svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        "application/pdf" => ".pdf",
        _ => "",
    }
}

/// `YYYYMMDDHHMMSS_{8 位随机串}{ext}`
fn generate_filename(content_type: &str) -> String {
    format!(
        "{}_{}{}",
        Local::now().format("%Y%m%d%H%M%S"),
        generate_random_code(8),
        extension_for(content_type)
    )
}

pub struct UploadService {
    store: Option<Arc<dyn ObjectStore>>,
    config: UploadConfig,
}

impl UploadService {
    pub fn new(store: Option<Arc<dyn ObjectStore>>, config: UploadConfig) -> Self {
        Self { store, config }
    }

    pub fn max_file_size(&self) -> usize {
        self.config.max_file_size
    }

    pub fn check_content_type(&self, content_type: &str) -> Result<()> {
        let essence = mime_essence(content_type);
        if self.config.allowed_types.iter().any(|t| *t == essence) {
            Ok(())
        } else {
            Err(AppError::InvalidFileType(format!(
                "file type '{}' is not allowed",
                content_type
            )))
        }
    }

    pub fn check_size(&self, size: usize) -> Result<()> {
        if size > self.config.max_file_size {
            return Err(AppError::FileTooLarge(format!(
                "file exceeds {} bytes",
                self.config.max_file_size
            )));
        }
        Ok(())
    }

    pub async fn upload(
        &self,
        original_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<UploadResult> {
        let Some(store) = &self.store else {
            return Err(AppError::not_configured("upload storage is not configured"));
        };
        if data.is_empty() {
            return Err(AppError::field("file", "file is empty"));
        }
        self.check_size(data.len())?;
        self.check_content_type(content_type)?;

        let filename = generate_filename(content_type);
        let size = data.len() as u64;
        let url = store.put(&filename, content_type, data).await?;
        info!(
            "Uploaded '{}' as {} ({} bytes, {})",
            original_name,
            filename,
            size,
            store.backend_name()
        );
        Ok(UploadResult {
            url,
            filename,
            size,
        })
    }
}
