use sea_orm_migration::prelude::*;

#[derive(Copy, Clone, Iden)]
pub enum Media {
    Table,
    Mint,
    Decimals,
    ImageUri,
    ImageType,
    MediaUri,
    MediaType,
    LocalPath,
    Name,
    Symbol,
    UpdateAuthority,
    CreatedAt,
}
