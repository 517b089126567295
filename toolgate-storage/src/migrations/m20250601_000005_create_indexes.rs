use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_services_table::Services;
use super::m20250601_000004_create_call_logs_table::CallLogs;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Index on services.name for admin search; the name is not unique
        manager
            .create_index(
                Index::create()
                    .name("idx_services_name")
                    .table(Services::Table)
                    .col(Services::Name)
                    .to_owned(),
            )
            .await?;

        // Index on services.enabled for candidate collection
        manager
            .create_index(
                Index::create()
                    .name("idx_services_enabled")
                    .table(Services::Table)
                    .col(Services::Enabled)
                    .to_owned(),
            )
            .await?;

        // Index on call_logs.service_id for cascade deletes
        manager
            .create_index(
                Index::create()
                    .name("idx_call_logs_service_id")
                    .table(CallLogs::Table)
                    .col(CallLogs::ServiceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_services_name").table(Services::Table).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_services_enabled")
                    .table(Services::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_call_logs_service_id")
                    .table(CallLogs::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
