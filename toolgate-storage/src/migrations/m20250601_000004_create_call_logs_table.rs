use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CallLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CallLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CallLogs::ServiceId).integer().not_null())
                    .col(
                        ColumnDef::new(CallLogs::ToolName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CallLogs::Success).boolean().not_null())
                    .col(ColumnDef::new(CallLogs::Error).text().not_null().default(""))
                    .col(
                        ColumnDef::new(CallLogs::DurationMs)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CallLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CallLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum CallLogs {
    Table,
    Id,
    ServiceId,
    ToolName,
    Success,
    Error,
    DurationMs,
    CreatedAt,
}
