pub use sea_orm_migration::prelude::*;

mod m20251018_090000_create_reading_history_table;
mod m20251018_090500_create_bookmarks_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251018_090000_create_reading_history_table::Migration),
            Box::new(m20251018_090500_create_bookmarks_table::Migration),
        ]
    }
}
