//! 内容相关表
//!
//! users / posts / tags / post_tags / life_records / comments

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string_len(255).not_null())
                    .col(ColumnDef::new(Users::Email).string_len(100).not_null().default(""))
                    .col(ColumnDef::new(Users::Avatar).string_len(500).not_null().default(""))
                    .col(ColumnDef::new(Users::LastLogin).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Posts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Posts::Title).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Posts::Slug)
                            .string_len(200)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Posts::Content).text().not_null())
                    .col(ColumnDef::new(Posts::Excerpt).text().not_null())
                    .col(ColumnDef::new(Posts::CoverImage).string_len(500).not_null().default(""))
                    .col(ColumnDef::new(Posts::Status).string_len(20).not_null().default("draft"))
                    .col(ColumnDef::new(Posts::ViewCount).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Posts::AuthorId).big_integer().not_null())
                    .col(ColumnDef::new(Posts::PublishedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Posts::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Posts::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Posts::DeletedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        // 公开列表按 status + published_at 查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_posts_status_published")
                    .table(Posts::Table)
                    .col(Posts::Status)
                    .col(Posts::PublishedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tags::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tags::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tags::Name).string_len(50).not_null().unique_key())
                    .col(ColumnDef::new(Tags::Slug).string_len(50).not_null().unique_key())
                    .col(ColumnDef::new(Tags::Description).text().not_null())
                    .col(ColumnDef::new(Tags::Color).string_len(20).not_null().default(""))
                    .col(ColumnDef::new(Tags::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PostTags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PostTags::PostId).big_integer().not_null())
                    .col(ColumnDef::new(PostTags::TagId).big_integer().not_null())
                    .primary_key(Index::create().col(PostTags::PostId).col(PostTags::TagId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_post_tags_tag_id")
                    .table(PostTags::Table)
                    .col(PostTags::TagId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LifeRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LifeRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LifeRecords::Title).string_len(200).not_null().default(""))
                    .col(ColumnDef::new(LifeRecords::Content).text().not_null())
                    .col(
                        ColumnDef::new(LifeRecords::CoverImage)
                            .string_len(500)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(LifeRecords::Status)
                            .string_len(20)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(LifeRecords::AuthorId).big_integer().not_null())
                    .col(
                        ColumnDef::new(LifeRecords::ViewCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(LifeRecords::PublishedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(LifeRecords::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(LifeRecords::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(LifeRecords::DeletedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comments::PostId).big_integer().null())
                    .col(ColumnDef::new(Comments::LifeRecordId).big_integer().null())
                    .col(ColumnDef::new(Comments::ParentId).big_integer().null())
                    .col(ColumnDef::new(Comments::ReplyToId).big_integer().null())
                    .col(ColumnDef::new(Comments::Nickname).string_len(50).not_null())
                    .col(ColumnDef::new(Comments::Email).string_len(100).not_null())
                    .col(ColumnDef::new(Comments::Avatar).string_len(500).not_null().default(""))
                    .col(ColumnDef::new(Comments::Website).string_len(500).not_null().default(""))
                    .col(ColumnDef::new(Comments::Content).text().not_null())
                    .col(ColumnDef::new(Comments::IsAdmin).boolean().not_null().default(false))
                    .col(ColumnDef::new(Comments::IsPinned).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Comments::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Comments::IpAddress).string_len(45).not_null().default(""))
                    .col(ColumnDef::new(Comments::UserAgent).text().not_null())
                    .col(ColumnDef::new(Comments::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Comments::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Comments::DeletedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_comments_post_id", Comments::PostId),
            ("idx_comments_life_record_id", Comments::LifeRecordId),
            ("idx_comments_parent_id", Comments::ParentId),
            ("idx_comments_email", Comments::Email),
            ("idx_comments_status", Comments::Status),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Comments::Table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LifeRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PostTags::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tags::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Email,
    Avatar,
    LastLogin,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    Title,
    Slug,
    Content,
    Excerpt,
    CoverImage,
    Status,
    ViewCount,
    AuthorId,
    PublishedAt,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Tags {
    Table,
    Id,
    Name,
    Slug,
    Description,
    Color,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PostTags {
    Table,
    PostId,
    TagId,
}

#[derive(DeriveIden)]
enum LifeRecords {
    Table,
    Id,
    Title,
    Content,
    CoverImage,
    Status,
    AuthorId,
    ViewCount,
    PublishedAt,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    PostId,
    LifeRecordId,
    ParentId,
    ReplyToId,
    Nickname,
    Email,
    Avatar,
    Website,
    Content,
    IsAdmin,
    IsPinned,
    Status,
    IpAddress,
    UserAgent,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
