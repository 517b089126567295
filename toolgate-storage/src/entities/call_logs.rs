use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tool-call log entry. Written best-effort by the handlers; deleted when
/// the owning service is removed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "call_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub service_id: i32,

    pub tool_name: String,

    pub success: bool,

    /// Error message when success is false
    #[sea_orm(column_type = "Text")]
    pub error: String,

    pub duration_ms: i64,

    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
