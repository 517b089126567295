use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder,
};

use toolgate_core::group::ServiceGroup;

use crate::connection::DatabaseConnection;
use crate::entities::{service_groups, GroupRow, ServiceGroups};
use crate::error::{StorageError, StorageResult};
use crate::filters::{ListPage, ListQuery};

/// Repository for service-group records
#[derive(Clone)]
pub struct GroupRepository {
    db: DatabaseConnection,
}

impl GroupRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, group: &ServiceGroup) -> StorageResult<ServiceGroup> {
        let mut active = GroupRow::from_domain(group).into_active_model();
        active.id = ActiveValue::NotSet;
        let row = active.insert(self.db.get_connection()).await?;
        Ok(row.to_domain())
    }

    pub async fn find_by_id(&self, id: i32) -> StorageResult<Option<ServiceGroup>> {
        let row = ServiceGroups::find_by_id(id)
            .one(self.db.get_connection())
            .await?;
        Ok(row.map(|r| r.to_domain()))
    }

    pub async fn find_by_name(&self, name: &str) -> StorageResult<Option<ServiceGroup>> {
        let row = ServiceGroups::find()
            .filter(service_groups::Column::Name.eq(name))
            .one(self.db.get_connection())
            .await?;
        Ok(row.map(|r| r.to_domain()))
    }

    pub async fn find_all(&self) -> StorageResult<Vec<ServiceGroup>> {
        let rows = ServiceGroups::find()
            .order_by_desc(service_groups::Column::Id)
            .all(self.db.get_connection())
            .await?;
        Ok(rows.into_iter().map(|r| r.to_domain()).collect())
    }

    /// Paged listing, newest first, with case-insensitive substring search
    /// over name and description
    pub async fn list(&self, query: &ListQuery) -> StorageResult<ListPage<ServiceGroup>> {
        let query = query.normalized();
        let mut select = ServiceGroups::find();

        if !query.search.is_empty() {
            let pattern = format!("%{}%", query.search.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            service_groups::Entity,
                            service_groups::Column::Name,
                        ))))
                        .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            service_groups::Entity,
                            service_groups::Column::Description,
                        ))))
                        .like(pattern),
                    ),
            );
        }

        let select = select.order_by_desc(service_groups::Column::Id);
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

    pub async fn update(&self, group: &ServiceGroup) -> StorageResult<ServiceGroup> {
        let active = GroupRow::from_domain(group).into_active_model();
        let row = active.update(self.db.get_connection()).await?;
        Ok(row.to_domain())
    }

    pub async fn delete(&self, id: i32) -> StorageResult<()> {
        let result = ServiceGroups::delete_by_id(id)
            .exec(self.db.get_connection())
            .await?;
        if result.rows_affected == 0 {
            return Err(StorageError::NotFound(format!("group {}", id)));
        }
        Ok(())
    }

    /// Names of every group whose stored id list references the service.
    /// Membership lives in JSON text, so each group's list is parsed here
    /// rather than matched in SQL.
    pub async fn groups_referencing(&self, service_id: i32) -> StorageResult<Vec<String>> {
        let groups = self.find_all().await?;
        Ok(groups
            .into_iter()
            .filter(|g| g.service_ids.contains(&service_id))
            .map(|g| g.name)
            .collect())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::testing::connect_memory;
    use chrono::Utc;
    use std::collections::HashMap;
    use toolgate_core::group::ToolAliasMap;

    pub fn sample_group(name: &str) -> ServiceGroup {
        ServiceGroup {
            id: 0,
            name: name.to_string(),
            description: String::new(),
            enabled: true,
            aggregation_enabled: true,
            access_token: String::new(),
            service_ids: vec![],
            weights: HashMap::new(),
            tool_aliases: ToolAliasMap::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_find_update() {
        let db = connect_memory().await;
        let repo = GroupRepository::new(db);

        let mut group = sample_group("prod");
        group.service_ids = vec![1, 2, 3];
        group.weights.insert(1, 200);
        let created = repo.create(&group).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.service_ids, vec![1, 2, 3]);
        assert_eq!(created.weight_of(1), 200);
        assert_eq!(created.weight_of(2), 100);

        let by_name = repo.find_by_name("prod").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);

        let mut modified = created.clone();
        modified.service_ids = vec![2];
        let updated = repo.update(&modified).await.unwrap();
        assert_eq!(updated.service_ids, vec![2]);
    }

    #[tokio::test]
    async fn test_legacy_alias_shape_read_back() {
        let db = connect_memory().await;
        let repo = GroupRepository::new(db.clone());

        let created = repo.create(&sample_group("aliased")).await.unwrap();

        // Simulate a legacy row written by an earlier version
        use sea_orm::ActiveValue::Set;
        let active = service_groups::ActiveModel {
            id: Set(created.id),
            tool_aliases: Set(r#"{"search":["web_search_exa"]}"#.to_string()),
            ..Default::default()
        };
        active.update(db.get_connection()).await.unwrap();

        let reloaded = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(reloaded.tool_aliases.canonical_of("web_search_exa"), "search");
    }

    #[tokio::test]
    async fn test_groups_referencing() {
        let db = connect_memory().await;
        let repo = GroupRepository::new(db);

        let mut g1 = sample_group("g1");
        g1.service_ids = vec![7];
        repo.create(&g1).await.unwrap();
        let g2 = sample_group("g2");
        repo.create(&g2).await.unwrap();

        let referencing = repo.groups_referencing(7).await.unwrap();
        assert_eq!(referencing, vec!["g1".to_string()]);
        assert!(repo.groups_referencing(8).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = connect_memory().await;
        let repo = GroupRepository::new(db);

        repo.create(&sample_group("first")).await.unwrap();
        repo.create(&sample_group("second")).await.unwrap();

        let page = repo.list(&ListQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].name, "second");
    }
}
