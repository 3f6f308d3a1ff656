//! 站点配置键值表

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, QueryOrder, Set, TransactionTrait};
use tracing::debug;

use super::SeaOrmStorage;
use crate::errors::Result;

use migration::entities::site_config;

impl SeaOrmStorage {
    pub async fn all_site_configs(&self) -> Result<Vec<site_config::Model>> {
        Ok(site_config::Entity::find()
            .order_by_asc(site_config::Column::ConfigKey)
            .all(&self.db)
            .await?)
    }

    /// 批量 upsert `(key, value, value_type)`，全部成功或全部回滚
    pub async fn upsert_site_configs(&self, entries: &[(String, String, String)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;

        for (key, value, value_type) in entries {
            let model = site_config::ActiveModel {
                config_key: Set(key.clone()),
                value: Set(value.clone()),
                value_type: Set(value_type.clone()),
                updated_at: Set(now),
                ..Default::default()
            };

            site_config::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(site_config::Column::ConfigKey)
                        .update_columns([
                            site_config::Column::Value,
                            site_config::Column::ValueType,
                            site_config::Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        debug!("Upserted {} site config entries", entries.len());
        Ok(())
    }
}
