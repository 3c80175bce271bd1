use migrations::standard::get_standard_migrations;

pub use sea_orm_migration::prelude::*;

mod migrations;
mod model;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        get_standard_migrations()
    }
}
