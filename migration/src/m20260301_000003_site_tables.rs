//! 站点配置与访问统计表

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SiteConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SiteConfigs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SiteConfigs::ConfigKey)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SiteConfigs::Value).text().not_null())
                    .col(
                        ColumnDef::new(SiteConfigs::ValueType)
                            .string_len(20)
                            .not_null()
                            .default("string"),
                    )
                    .col(
                        ColumnDef::new(SiteConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PageViews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PageViews::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PageViews::PageType).string_len(50).not_null())
                    .col(ColumnDef::new(PageViews::PageId).big_integer().null())
                    .col(ColumnDef::new(PageViews::IpAddress).string_len(45).not_null())
                    .col(ColumnDef::new(PageViews::UserAgent).text().not_null())
                    .col(ColumnDef::new(PageViews::Referer).text().not_null())
                    .col(ColumnDef::new(PageViews::Country).string_len(50).not_null().default(""))
                    .col(ColumnDef::new(PageViews::City).string_len(50).not_null().default(""))
                    .col(ColumnDef::new(PageViews::DeviceType).string_len(20).not_null())
                    .col(ColumnDef::new(PageViews::Browser).string_len(50).not_null())
                    .col(ColumnDef::new(PageViews::Os).string_len(50).not_null())
                    .col(
                        ColumnDef::new(PageViews::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 浏览量去重检查：(page_type, page_id, ip_address, created_at)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_page_views_dedup")
                    .table(PageViews::Table)
                    .col(PageViews::PageType)
                    .col(PageViews::PageId)
                    .col(PageViews::IpAddress)
                    .col(PageViews::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_page_views_created_at")
                    .table(PageViews::Table)
                    .col(PageViews::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AnalyticsEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnalyticsEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AnalyticsEvents::EventType).string_len(50).not_null())
                    .col(ColumnDef::new(AnalyticsEvents::EventName).string_len(100).not_null())
                    .col(
                        ColumnDef::new(AnalyticsEvents::PageType)
                            .string_len(50)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(AnalyticsEvents::PageId).big_integer().null())
                    .col(
                        ColumnDef::new(AnalyticsEvents::UserId)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(AnalyticsEvents::Properties).text().null())
                    .col(ColumnDef::new(AnalyticsEvents::IpAddress).string_len(45).not_null())
                    .col(ColumnDef::new(AnalyticsEvents::UserAgent).text().not_null())
                    .col(
                        ColumnDef::new(AnalyticsEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_analytics_events_type_name")
                    .table(AnalyticsEvents::Table)
                    .col(AnalyticsEvents::EventType)
                    .col(AnalyticsEvents::EventName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnalyticsEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PageViews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SiteConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SiteConfigs {
    Table,
    Id,
    ConfigKey,
    Value,
    ValueType,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PageViews {
    Table,
    Id,
    PageType,
    PageId,
    IpAddress,
    UserAgent,
    Referer,
    Country,
    City,
    DeviceType,
    Browser,
    Os,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AnalyticsEvents {
    Table,
    Id,
    EventType,
    EventName,
    PageType,
    PageId,
    UserId,
    Properties,
    IpAddress,
    UserAgent,
    CreatedAt,
}
