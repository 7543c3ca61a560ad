use sea_orm_migration::prelude::*;

use super::m20250901_000001_initial::{Posts, Users};

#[derive(DeriveIden)]
enum Purchases {
    Table,
    Id,
    UserId,
    PostId,
    Provider,
    ProviderSessionId,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Purchases::Id).string_len(36).not_null().primary_key())
                    .col(ColumnDef::new(Purchases::UserId).string_len(36).not_null())
                    .col(ColumnDef::new(Purchases::PostId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Purchases::Provider)
                            .string_len(32)
                            .not_null()
                            .default("stripe"),
                    )
                    .col(
                        ColumnDef::new(Purchases::ProviderSessionId)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Purchases::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchases_user")
                            .from(Purchases::Table, Purchases::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchases_post")
                            .from(Purchases::Table, Purchases::PostId)
                            .to(Posts::Table, Posts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // one purchase per reader and post, the confirm and webhook paths both rely on it
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_purchases_user_post")
                    .table(Purchases::Table)
                    .col(Purchases::UserId)
                    .col(Purchases::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await?;
        Ok(())
    }
}
