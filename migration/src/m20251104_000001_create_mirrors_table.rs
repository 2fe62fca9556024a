use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Mirrors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Mirrors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Mirrors::Slug)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Mirrors::TargetOrigin)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Mirrors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Mirrors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Mirrors::LastPath).string_len(2048))
                    .col(
                        ColumnDef::new(Mirrors::Disabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建索引
        manager
            .create_index(
                Index::create()
                    .name("idx_mirrors_target_origin")
                    .table(Mirrors::Table)
                    .col(Mirrors::TargetOrigin)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_mirrors_disabled")
                    .table(Mirrors::Table)
                    .col(Mirrors::Disabled)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Mirrors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Mirrors {
    Table,
    Id,
    Slug,
    TargetOrigin,
    CreatedAt,
    UpdatedAt,
    LastPath,
    Disabled,
}
