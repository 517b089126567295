use sea_orm_migration::prelude::*;

mod m20250601_000001_create_services_table;
mod m20250601_000002_create_service_groups_table;
mod m20250601_000003_create_tool_cache_table;
mod m20250601_000004_create_call_logs_table;
mod m20250601_000005_create_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_services_table::Migration),
            Box::new(m20250601_000002_create_service_groups_table::Migration),
            Box::new(m20250601_000003_create_tool_cache_table::Migration),
            Box::new(m20250601_000004_create_call_logs_table::Migration),
            Box::new(m20250601_000005_create_indexes::Migration),
        ]
    }
}
