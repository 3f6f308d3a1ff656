//! 账本表：categories / bills

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Categories::Key)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Categories::Kind)
                            .string_len(10)
                            .not_null()
                            .default("expense"),
                    )
                    .col(
                        ColumnDef::new(Categories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 同类型下名称唯一
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_categories_name_kind")
                    .table(Categories::Table)
                    .col(Categories::Name)
                    .col(Categories::Kind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Bills::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bills::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bills::Kind).string_len(10).not_null())
                    .col(ColumnDef::new(Bills::CategoryId).big_integer().not_null())
                    .col(ColumnDef::new(Bills::Amount).double().not_null())
                    .col(
                        ColumnDef::new(Bills::Description)
                            .string_len(500)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Bills::Date).date().not_null())
                    .col(
                        ColumnDef::new(Bills::PeriodType)
                            .string_len(10)
                            .not_null()
                            .default("month"),
                    )
                    .col(
                        ColumnDef::new(Bills::IsConsumed)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Bills::Refund).double().not_null().default(0.0))
                    .col(ColumnDef::new(Bills::RefundType).integer().not_null().default(0))
                    .col(ColumnDef::new(Bills::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Bills::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Bills::DeletedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        // 统计查询按日期范围 + 类型过滤
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_bills_date_kind")
                    .table(Bills::Table)
                    .col(Bills::Date)
                    .col(Bills::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_bills_category_id")
                    .table(Bills::Table)
                    .col(Bills::CategoryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bills::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Key,
    Kind,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Bills {
    Table,
    Id,
    Kind,
    CategoryId,
    Amount,
    Description,
    Date,
    PeriodType,
    IsConsumed,
    Refund,
    RefundType,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
