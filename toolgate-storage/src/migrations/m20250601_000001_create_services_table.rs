use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Services::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Services::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Services::DisplayName)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Services::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Services::Category)
                            .string_len(32)
                            .not_null()
                            .default("custom"),
                    )
                    .col(ColumnDef::new(Services::Sort).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Services::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Services::ServiceType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Services::Command)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Services::Args).text().not_null().default("[]"))
                    .col(
                        ColumnDef::new(Services::Cwd)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Services::ApiEndpoint)
                            .string_len(512)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Services::ApiKeyName)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Services::ApiKeyCiphertext)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Services::ApiKeyHeader)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Services::ApiKeyPrefix)
                            .string_len(64)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Services::Headers).text().not_null().default("{}"))
                    .col(ColumnDef::new(Services::EnvDefs).text().not_null().default("[]"))
                    .col(
                        ColumnDef::new(Services::EnvDefaults)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(Services::Tools).text().not_null().default("[]"))
                    .col(
                        ColumnDef::new(Services::RpdLimit)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Services::McpEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Services::AccessToken)
                            .string_len(128)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Services::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Services::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Services::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Services {
    Table,
    Id,
    Name,
    DisplayName,
    Description,
    Category,
    Sort,
    Enabled,
    ServiceType,
    Command,
    Args,
    Cwd,
    ApiEndpoint,
    ApiKeyName,
    ApiKeyCiphertext,
    ApiKeyHeader,
    ApiKeyPrefix,
    Headers,
    EnvDefs,
    EnvDefaults,
    Tools,
    RpdLimit,
    McpEnabled,
    AccessToken,
    CreatedAt,
    UpdatedAt,
}
