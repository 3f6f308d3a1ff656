use serde::{Deserialize, Serialize};

/// 应用配置（从 TOML + 环境变量加载，启动时构造一次后注入）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 站点对外地址，用于 RSS / sitemap / robots 中的绝对链接
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,
    /// 可信反向代理 IP，只有来自这些地址的请求才读取 X-Forwarded-For
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// JSON 请求体上限（字节）
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default = "default_slow_request_ms")]
    pub slow_request_ms: u64,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// text | json
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
}

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// 为空时启动阶段生成随机密钥（重启后旧 token 失效）
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub issuer: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: u64,
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: u64,
}

/// 单条限流规则：window_secs 内最多 limit 次
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitRule {
    pub limit: u32,
    pub window_secs: u64,
}

impl RateLimitRule {
    pub const fn new(limit: u32, window_secs: u64) -> Self {
        Self { limit, window_secs }
    }
}

/// 按路由类别划分的限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_public_rule")]
    pub public: RateLimitRule,
    #[serde(default = "default_comment_rule")]
    pub comment: RateLimitRule,
    #[serde(default = "default_login_rule")]
    pub login: RateLimitRule,
    #[serde(default = "default_upload_rule")]
    pub upload: RateLimitRule,
}

impl RateLimitConfig {
    pub fn rules(&self) -> [(&'static str, RateLimitRule); 4] {
        [
            ("public", self.public),
            ("comment", self.comment),
            ("login", self.login),
            ("upload", self.upload),
        ]
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_enabled")]
    pub enabled: bool,
    /// 为空或包含 "*" 时允许任意来源
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: usize,
    #[serde(default)]
    pub allow_credentials: bool,
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// 本地存储目录，留空表示未配置上传存储
    #[serde(default = "default_upload_dir")]
    pub local_dir: String,
    /// 返回给前端的文件 URL 前缀
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

/// 账单 webhook 配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookConfig {
    #[serde(default)]
    pub bill_secret: String,
}

/// 初始管理员账号（仅在 users 表为空时创建）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    /// 为空时生成随机密码并在日志中输出一次
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_admin_email")]
    pub email: String,
}

/// 内容展示相关参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,
    #[serde(default = "default_life_preview_length")]
    pub life_preview_length: usize,
    /// 超过该长度的动态在列表中截断
    #[serde(default = "default_life_full_threshold")]
    pub life_full_threshold: usize,
    #[serde(default = "default_reply_limit")]
    pub reply_limit: u64,
    #[serde(default = "default_feed_limit")]
    pub feed_limit: u64,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_admin_prefix() -> String {
    "/admin".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}

fn default_slow_request_ms() -> u64 {
    1000
}

fn default_database_url() -> String {
    "inkpost.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_enable_rotation() -> bool {
    true
}

fn default_max_backups() -> u32 {
    5
}

fn default_jwt_issuer() -> String {
    "inkpost".to_string()
}

fn default_access_token_minutes() -> u64 {
    15
}

fn default_refresh_token_days() -> u64 {
    7
}

fn default_public_rule() -> RateLimitRule {
    RateLimitRule::new(100, 60)
}

fn default_comment_rule() -> RateLimitRule {
    RateLimitRule::new(5, 60)
}

fn default_login_rule() -> RateLimitRule {
    RateLimitRule::new(5, 15 * 60)
}

fn default_upload_rule() -> RateLimitRule {
    RateLimitRule::new(10, 60)
}

fn default_cors_enabled() -> bool {
    true
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_cors_headers() -> Vec<String> {
    [
        "Authorization",
        "Content-Type",
        "X-Request-Id",
        "X-Bill-Timestamp",
        "X-Bill-Signature",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_cors_max_age() -> usize {
    3600
}

fn default_max_file_size() -> usize {
    5 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    [
        "image/jpeg",
        "image/jpg",
        "image/png",
        "image/gif",
        "image/webp",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_public_base_url() -> String {
    "/uploads".to_string()
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@example.com".to_string()
}

fn default_excerpt_length() -> usize {
    200
}

fn default_life_preview_length() -> usize {
    300
}

fn default_life_full_threshold() -> usize {
    500
}

fn default_reply_limit() -> u64 {
    3
}

fn default_feed_limit() -> u64 {
    20
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            site_url: default_site_url(),
            api_prefix: default_api_prefix(),
            admin_prefix: default_admin_prefix(),
            trusted_proxies: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
            max_body_size: default_max_body_size(),
            slow_request_ms: default_slow_request_ms(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            enable_rotation: default_enable_rotation(),
            max_backups: default_max_backups(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: default_jwt_issuer(),
            access_token_minutes: default_access_token_minutes(),
            refresh_token_days: default_refresh_token_days(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            public: default_public_rule(),
            comment: default_comment_rule(),
            login: default_login_rule(),
            upload: default_upload_rule(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_cors_enabled(),
            allowed_origins: Vec::new(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            max_age: default_cors_max_age(),
            allow_credentials: false,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
            local_dir: default_upload_dir(),
            public_base_url: default_public_base_url(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: String::new(),
            email: default_admin_email(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            excerpt_length: default_excerpt_length(),
            life_preview_length: default_life_preview_length(),
            life_full_threshold: default_life_full_threshold(),
            reply_limit: default_reply_limit(),
            feed_limit: default_feed_limit(),
        }
    }
}
