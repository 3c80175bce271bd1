use sea_orm_migration::prelude::*;

use super::super::super::model::table::Media;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Supports sweeping rows older than the refresh max age.
        manager
            .create_index(
                Index::create()
                    .name("media_created_at_idx")
                    .table(Media::Table)
                    .col(Media::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("media_created_at_idx")
                    .table(Media::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
