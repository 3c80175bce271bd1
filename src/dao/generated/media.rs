//! `SeaORM` Entity for cached token media

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub mint: String,
    pub decimals: i16,
    pub image_uri: String,
    pub image_type: String,
    pub media_uri: Option<String>,
    pub media_type: Option<String>,
    pub local_path: String,
    pub name: String,
    pub symbol: String,
    pub update_authority: Option<String>,
    /// Unix seconds of the last write.
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
