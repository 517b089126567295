use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

use crate::connection::DatabaseConnection;
use crate::entities::{call_logs, CallLogs};
use crate::error::StorageResult;

/// Repository for tool-call log rows
#[derive(Clone)]
pub struct CallLogRepository {
    db: DatabaseConnection,
}

impl CallLogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn record(
        &self,
        service_id: i32,
        tool_name: &str,
        success: bool,
        error: &str,
        duration_ms: i64,
    ) -> StorageResult<()> {
        let active = call_logs::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            service_id: Set(service_id),
            tool_name: Set(tool_name.to_string()),
            success: Set(success),
            error: Set(error.to_string()),
            duration_ms: Set(duration_ms),
            created_at: Set(Utc::now()),
        };
        active.insert(self.db.get_connection()).await?;
        Ok(())
    }

    pub async fn delete_by_service(&self, service_id: i32) -> StorageResult<u64> {
        let result = CallLogs::delete_many()
            .filter(call_logs::Column::ServiceId.eq(service_id))
            .exec(self.db.get_connection())
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::connect_memory;

    #[tokio::test]
    async fn test_record_and_cascade_delete() {
        let db = connect_memory().await;
        let repo = CallLogRepository::new(db);

        repo.record(1, "search", true, "", 42).await.unwrap();
        repo.record(1, "search", false, "boom", 10).await.unwrap();
        repo.record(2, "fetch", true, "", 5).await.unwrap();

        assert_eq!(repo.delete_by_service(1).await.unwrap(), 2);
        assert_eq!(repo.delete_by_service(1).await.unwrap(), 0);
    }
}
