//! 服务启动前的准备：连接数据库、执行迁移、构造 service、初始化管理员账户

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::services::AppServices;
use crate::storage::{SeaOrmStorage, StorageFactory};

pub struct StartupContext {
    pub config: Arc<AppConfig>,
    pub storage: Arc<SeaOrmStorage>,
    pub services: AppServices,
}

/// 启动前检查配置中容易踩坑的项，只告警不阻止启动
fn warn_risky_config(config: &AppConfig) {
    if config.webhook.bill_secret.is_empty() {
        warn!("webhook.bill_secret is empty, bill webhook requests will be rejected");
    }
    if config.upload.local_dir.trim().is_empty() {
        warn!("upload.local_dir is empty, file upload is disabled");
    }
    if config.cors.enabled
        && config.cors.allow_credentials
        && config.cors.allowed_origins.iter().any(|o| o == "*")
    {
        warn!("cors: wildcard origin with credentials is not allowed, credentials disabled");
    }
}

/// 准备服务器启动所需的上下文
pub async fn prepare_server_startup(config: Arc<AppConfig>) -> Result<StartupContext> {
    let start_time = Instant::now();
    debug!("Starting pre-startup processing...");

    if let Err(problems) = config.validate() {
        for problem in &problems {
            warn!("Config: {}", problem);
        }
        anyhow::bail!("invalid configuration ({} problems)", problems.len());
    }
    warn_risky_config(&config);

    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.get_backend_name());

    let services = AppServices::new(storage.clone(), config.clone());

    match services.auth.seed_admin().await {
        Ok(Some(user)) => info!("Initial admin account created: {}", user.username),
        Ok(None) => debug!("Users table is not empty, skip admin seeding"),
        Err(e) => return Err(anyhow::anyhow!("failed to seed admin account: {}", e)),
    }

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        config,
        storage,
        services,
    })
}
