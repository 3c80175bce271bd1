use sea_orm_migration::prelude::*;

use super::super::super::model::table::Media;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Media::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Media::Mint).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Media::Decimals)
                            .small_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Media::ImageUri).text().not_null())
                    .col(ColumnDef::new(Media::ImageType).string().not_null())
                    .col(ColumnDef::new(Media::MediaUri).text())
                    .col(ColumnDef::new(Media::MediaType).string())
                    .col(ColumnDef::new(Media::LocalPath).text().not_null())
                    .col(ColumnDef::new(Media::Name).text().not_null())
                    .col(ColumnDef::new(Media::Symbol).text().not_null())
                    .col(ColumnDef::new(Media::UpdateAuthority).string())
                    .col(ColumnDef::new(Media::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Media::Table).to_owned())
            .await?;

        Ok(())
    }
}
