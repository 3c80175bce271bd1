use sea_orm_migration::MigrationTrait;

pub mod m20240601_000001_init;
pub mod m20240601_000002_add_created_at_index;

pub fn get_standard_migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
        Box::new(m20240601_000001_init::Migration),
        Box::new(m20240601_000002_add_created_at_index::Migration),
    ]
}
