use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter,
};

use toolgate_core::cache::CachedServiceTools;

use crate::connection::DatabaseConnection;
use crate::entities::{tool_cache, ToolCacheEntries, ToolCacheRow};
use crate::error::StorageResult;

/// Repository for the cold tier of the tool cache
#[derive(Clone)]
pub struct ToolCacheRepository {
    db: DatabaseConnection,
}

impl ToolCacheRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_service(
        &self,
        service_id: i32,
    ) -> StorageResult<Option<CachedServiceTools>> {
        let row = ToolCacheEntries::find()
            .filter(tool_cache::Column::ServiceId.eq(service_id))
            .one(self.db.get_connection())
            .await?;
        Ok(row.map(|r| r.to_domain()))
    }

    /// Write an entry, replacing any existing row for the service.
    ///
    /// Read-then-assign rather than a backend-specific upsert clause so the
    /// same code runs on every supported engine. A concurrent refresh may
    /// double-write; last writer wins and the payloads are equivalent.
    pub async fn upsert(&self, entry: &CachedServiceTools) -> StorageResult<()> {
        let existing = ToolCacheEntries::find()
            .filter(tool_cache::Column::ServiceId.eq(entry.service_id))
            .one(self.db.get_connection())
            .await?;

        let mut active = ToolCacheRow::from_domain(entry).into_active_model();
        match existing {
            Some(row) => {
                active.id = ActiveValue::Set(row.id);
                active.update(self.db.get_connection()).await?;
            }
            None => {
                active.id = ActiveValue::NotSet;
                active.insert(self.db.get_connection()).await?;
            }
        }
        Ok(())
    }

    pub async fn delete_by_service(&self, service_id: i32) -> StorageResult<()> {
        ToolCacheEntries::delete_many()
            .filter(tool_cache::Column::ServiceId.eq(service_id))
            .exec(self.db.get_connection())
            .await?;
        Ok(())
    }

    /// Remove rows past their hard expiry, returning the count. The hot KV
    /// tier relies on its own TTL eviction.
    pub async fn clean_expired(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        let result = ToolCacheEntries::delete_many()
            .filter(tool_cache::Column::HardExpiry.lt(now))
            .exec(self.db.get_connection())
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::connect_memory;
    use chrono::Duration;
    use toolgate_core::tool::ToolDefinition;

    fn sample_entry(service_id: i32) -> CachedServiceTools {
        let mut entry = CachedServiceTools::new(
            service_id,
            vec![ToolDefinition::new(
                "search",
                "web search",
                serde_json::json!({"type":"object","properties":{}}),
            )],
            Utc::now(),
        );
        entry.server_name = "stub".into();
        entry
    }

    #[tokio::test]
    async fn test_upsert_insert_then_update() {
        let db = connect_memory().await;
        let repo = ToolCacheRepository::new(db);

        let entry = sample_entry(1);
        repo.upsert(&entry).await.unwrap();
        let found = repo.find_by_service(1).await.unwrap().unwrap();
        assert_eq!(found.tools.len(), 1);
        assert_eq!(found.server_name, "stub");

        let mut newer = sample_entry(1);
        newer.server_name = "stub-v2".into();
        repo.upsert(&newer).await.unwrap();
        let found = repo.find_by_service(1).await.unwrap().unwrap();
        assert_eq!(found.server_name, "stub-v2");
    }

    #[tokio::test]
    async fn test_clean_expired_counts_rows() {
        let db = connect_memory().await;
        let repo = ToolCacheRepository::new(db);

        let mut dead = sample_entry(1);
        dead.hard_expiry = Utc::now() - Duration::seconds(5);
        repo.upsert(&dead).await.unwrap();
        repo.upsert(&sample_entry(2)).await.unwrap();

        let cleaned = repo.clean_expired(Utc::now()).await.unwrap();
        assert_eq!(cleaned, 1);
        assert!(repo.find_by_service(1).await.unwrap().is_none());
        assert!(repo.find_by_service(2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_by_service() {
        let db = connect_memory().await;
        let repo = ToolCacheRepository::new(db);

        repo.upsert(&sample_entry(3)).await.unwrap();
        repo.delete_by_service(3).await.unwrap();
        assert!(repo.find_by_service(3).await.unwrap().is_none());
        // Deleting an absent row is not an error
        repo.delete_by_service(3).await.unwrap();
    }
}
