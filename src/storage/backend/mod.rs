//! SeaORM storage backend
//!
//! 每个资源一个文件，方法都挂在 `SeaOrmStorage` 上。支持 SQLite、MySQL/MariaDB 和 PostgreSQL。

mod analytics;
mod bills;
mod categories;
mod comments;
mod connection;
mod life;
mod posts;
mod site_config;
mod tags;
mod users;
pub mod retry;

use sea_orm::sea_query::Expr;
use sea_orm::{DatabaseConnection, DbBackend};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};

pub use analytics::{DistributionRow, EventCountRow, NewPageView, VisitRow};
pub use bills::{
    BillFilter, BillStatsFilter, CategorySumRow, KIND_EXPENSE, KIND_INCOME, KindSumRow,
    PeriodSumRow,
};
pub use categories::{CategoryWithCount, OTHER_CATEGORY_KEY};
pub use comments::{
    AdminCommentFilter, CommentTarget, STATUS_APPROVED, STATUS_PENDING, STATUS_SPAM,
};
pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use posts::{PostListFilter, PostWrite, STATUS_PUBLISHED};
pub use tags::TagWithCount;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://")
    {
        Ok("postgres".to_string())
    } else {
        Err(AppError::database_connection(format!(
            "cannot infer database type from URL '{}'; expected sqlite://, mysql://, mariadb:// or postgres://",
            database_url
        )))
    }
}

/// 分组统计时的日期粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBucket {
    Day,
    Month,
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    /// 连接数据库并执行迁移
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let database_url = config.database_url.trim();
        if database_url.is_empty() {
            return Err(AppError::database_connection("database_url is empty"));
        }

        let backend_name = infer_backend_from_url(database_url)?;
        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(config, &backend_name).await?
        };

        run_migrations(&db).await?;

        info!("{} storage initialized", backend_name.to_uppercase());
        Ok(Self {
            db,
            backend_name,
            retry_config: retry::RetryConfig::from(config),
        })
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn get_backend_name(&self) -> &str {
        &self.backend_name
    }

    pub(crate) fn db_backend(&self) -> DbBackend {
        match self.backend_name.as_str() {
            "sqlite" => DbBackend::Sqlite,
            "mysql" => DbBackend::MySql,
            _ => DbBackend::Postgres,
        }
    }

    /// 按数据库方言生成日期分组表达式，结果形如 `2024-01-05` / `2024-01`
    pub(crate) fn date_expr(&self, column: &str, bucket: DateBucket) -> Expr {
        let (sqlite_fmt, mysql_fmt, pg_fmt) = match bucket {
            DateBucket::Day => ("%Y-%m-%d", "%Y-%m-%d", "YYYY-MM-DD"),
            DateBucket::Month => ("%Y-%m", "%Y-%m", "YYYY-MM"),
        };

        match self.db_backend() {
            DbBackend::Sqlite => Expr::cust(format!("strftime('{}', {})", sqlite_fmt, column)),
            DbBackend::MySql => Expr::cust(format!("DATE_FORMAT({}, '{}')", column, mysql_fmt)),
            _ => Expr::cust(format!("TO_CHAR({}, '{}')", column, pg_fmt)),
        }
    }
}

/// 把 1-based 页码转换为 SeaORM 的 0-based 页码
pub(crate) fn page_index(page: u64) -> u64 {
    page.max(1) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend() {
        assert_eq!(infer_backend_from_url("inkpost.db").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("sqlite:///tmp/x?mode=rwc").unwrap(),
            "sqlite"
        );
        assert_eq!(
            infer_backend_from_url("mariadb://u:p@localhost/blog").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/blog").unwrap(),
            "postgres"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }

    #[test]
    fn test_page_index() {
        assert_eq!(page_index(0), 0);
        assert_eq!(page_index(1), 0);
        assert_eq!(page_index(4), 3);
    }
}
