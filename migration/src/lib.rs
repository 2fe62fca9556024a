pub use sea_orm_migration::prelude::*;

mod m20251104_000001_create_mirrors_table;
mod m20251104_000002_create_events_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251104_000001_create_mirrors_table::Migration),
            Box::new(m20251104_000002_create_events_table::Migration),
        ]
    }
}
