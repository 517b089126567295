use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use toolgate_core::service::Service;

use crate::connection::DatabaseConnection;
use crate::entities::{
    service_groups, services, CallLogs, ServiceGroups, ServiceRow, Services, ToolCacheEntries,
};
use crate::error::{StorageError, StorageResult};
use crate::filters::{ListPage, ListQuery};

/// Repository for service records
#[derive(Clone)]
pub struct ServiceRepository {
    db: DatabaseConnection,
}

impl ServiceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a new service, returning it with the assigned id
    pub async fn create(&self, service: &Service) -> StorageResult<Service> {
        let mut active = ServiceRow::from_domain(service).into_active_model();
        active.id = ActiveValue::NotSet;
        let row = active.insert(self.db.get_connection()).await?;
        Ok(row.to_domain())
    }

    pub async fn find_by_id(&self, id: i32) -> StorageResult<Option<Service>> {
        let row = Services::find_by_id(id).one(self.db.get_connection()).await?;
        Ok(row.map(|r| r.to_domain()))
    }

    pub async fn find_by_ids(&self, ids: &[i32]) -> StorageResult<Vec<Service>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Services::find()
            .filter(services::Column::Id.is_in(ids.to_vec()))
            .all(self.db.get_connection())
            .await?;
        Ok(rows.into_iter().map(|r| r.to_domain()).collect())
    }

    pub async fn find_all(&self) -> StorageResult<Vec<Service>> {
        let rows = Services::find()
            .order_by_asc(services::Column::Sort)
            .order_by_asc(services::Column::Id)
            .all(self.db.get_connection())
            .await?;
        Ok(rows.into_iter().map(|r| r.to_domain()).collect())
    }

    /// Paged listing ordered `sort ASC, id ASC`, with case-insensitive
    /// substring search over name/display/description.
    pub async fn list(&self, query: &ListQuery) -> StorageResult<ListPage<Service>> {
        let query = query.normalized();
        let mut select = Services::find();

        if !query.search.is_empty() {
            let pattern = format!("%{}%", query.search.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            services::Entity,
                            services::Column::Name,
                        ))))
                        .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            services::Entity,
                            services::Column::DisplayName,
                        ))))
                        .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            services::Entity,
                            services::Column::Description,
                        ))))
                        .like(pattern),
                    ),
            );
        }

        let select = select
            .order_by_asc(services::Column::Sort)
            .order_by_asc(services::Column::Id);

        let paginator = select.paginate(self.db.get_connection(), query.page_size);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(query.page_index()).await?;

        Ok(ListPage {
            items: rows.into_iter().map(|r| r.to_domain()).collect(),
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }

    /// Full update of an existing service
    pub async fn update(&self, service: &Service) -> StorageResult<Service> {
        let active = ServiceRow::from_domain(service).into_active_model();
        let row = active.update(self.db.get_connection()).await?;
        Ok(row.to_domain())
    }

    pub async fn set_enabled(&self, id: i32, enabled: bool) -> StorageResult<()> {
        let active = services::ActiveModel {
            id: ActiveValue::Set(id),
            enabled: ActiveValue::Set(enabled),
            updated_at: ActiveValue::Set(chrono::Utc::now()),
            ..Default::default()
        };
        active.update(self.db.get_connection()).await?;
        Ok(())
    }

    /// Whether any service already uses this exact name
    pub async fn name_exists(&self, name: &str) -> StorageResult<bool> {
        let count = Services::find()
            .filter(services::Column::Name.eq(name))
            .count(self.db.get_connection())
            .await?;
        Ok(count > 0)
    }

    pub async fn count(&self) -> StorageResult<u64> {
        Ok(Services::find().count(self.db.get_connection()).await?)
    }

    pub async fn delete(&self, id: i32) -> StorageResult<()> {
        let result = Services::delete_by_id(id)
            .exec(self.db.get_connection())
            .await?;
        if result.rows_affected == 0 {
            return Err(StorageError::NotFound(format!("service {}", id)));
        }
        Ok(())
    }

    /// Delete every service in one transaction: group membership lists are
    /// cleared first so no group is left pointing at a removed id, then the
    /// dependent tool-cache and log rows go, then the services themselves.
    pub async fn delete_all(&self) -> StorageResult<u64> {
        let txn = self.db.get_connection().begin().await?;

        ServiceGroups::update_many()
            .col_expr(service_groups::Column::ServiceIds, Expr::value("[]"))
            .col_expr(
                service_groups::Column::UpdatedAt,
                Expr::value(chrono::Utc::now()),
            )
            .exec(&txn)
            .await?;
        ToolCacheEntries::delete_many().exec(&txn).await?;
        CallLogs::delete_many().exec(&txn).await?;
        let deleted = Services::delete_many().exec(&txn).await?;

        txn.commit().await?;
        Ok(deleted.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::connect_memory;
    use chrono::Utc;
    use std::collections::HashMap;
    use toolgate_core::service::ServiceType;

    pub fn sample_service(name: &str) -> Service {
        Service {
            id: 0,
            name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            category: "custom".into(),
            sort: 0,
            enabled: true,
            service_type: ServiceType::Stdio,
            command: "npx".into(),
            args: vec!["-y".into(), "some-server".into()],
            cwd: String::new(),
            api_endpoint: String::new(),
            api_key_name: String::new(),
            api_key_ciphertext: String::new(),
            api_key_header: String::new(),
            api_key_prefix: String::new(),
            headers: HashMap::new(),
            env_defs: vec![],
            env_defaults: HashMap::new(),
            tools: vec![],
            rpd_limit: 0,
            mcp_enabled: false,
            access_token: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_round_trips() {
        let db = connect_memory().await;
        let repo = ServiceRepository::new(db);

        let created = repo.create(&sample_service("alpha")).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.args, vec!["-y", "some-server"]);

        let found = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_duplicate_names_allowed() {
        let db = connect_memory().await;
        let repo = ServiceRepository::new(db);

        let a = repo.create(&sample_service("same")).await.unwrap();
        let b = repo.create(&sample_service("same")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(repo.name_exists("same").await.unwrap());
        assert!(!repo.name_exists("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_paging_and_search() {
        let db = connect_memory().await;
        let repo = ServiceRepository::new(db);

        for i in 0..3 {
            let mut svc = sample_service(&format!("search-{}", i));
            svc.sort = 10 - i;
            repo.create(&svc).await.unwrap();
        }
        repo.create(&sample_service("unrelated")).await.unwrap();

        let page = repo
            .list(&ListQuery {
                page: 1,
                page_size: 2,
                search: "SEARCH".into(),
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        // sort ASC: the lowest sort value comes first
        assert_eq!(page.items[0].name, "search-2");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = connect_memory().await;
        let repo = ServiceRepository::new(db);

        let mut created = repo.create(&sample_service("victim")).await.unwrap();
        created.description = "updated".into();
        let updated = repo.update(&created).await.unwrap();
        assert_eq!(updated.description, "updated");

        repo.delete(created.id).await.unwrap();
        assert!(repo.find_by_id(created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(created.id).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_all_clears_group_memberships() {
        let db = connect_memory().await;
        let services = ServiceRepository::new(db.clone());
        let groups = crate::repositories::GroupRepository::new(db);

        let svc = services.create(&sample_service("member")).await.unwrap();
        let mut group = crate::repositories::group_repository::tests::sample_group("g1");
        group.service_ids = vec![svc.id];
        let group = groups.create(&group).await.unwrap();

        let deleted = services.delete_all().await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(services.count().await.unwrap(), 0);

        let reloaded = groups.find_by_id(group.id).await.unwrap().unwrap();
        assert!(reloaded.service_ids.is_empty());
    }
}
