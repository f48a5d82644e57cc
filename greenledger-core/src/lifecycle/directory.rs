use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use tracing::debug;

use crate::database::entities::{organization_users, organizations, users};

/// Organization and membership operations used by cascading deletes
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    async fn organization_exists(&self, organization_id: i32) -> Result<bool>;

    async fn list_user_ids(&self, organization_id: i32) -> Result<Vec<i32>>;

    /// Removes the organization row and its memberships
    async fn delete(&self, organization_id: i32) -> Result<()>;

    /// Whether the user still belongs to any organization
    async fn user_has_other_orgs(&self, user_id: i32) -> Result<bool>;

    async fn delete_user(&self, user_id: i32) -> Result<()>;
}

/// Directory backed by the `organizations` and `organization_users` tables
pub struct SeaOrmDirectory {
    db: DatabaseConnection,
}

impl SeaOrmDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrganizationDirectory for SeaOrmDirectory {
    async fn organization_exists(&self, organization_id: i32) -> Result<bool> {
        Ok(organizations::Entity::find_by_id(organization_id)
            .one(&self.db)
            .await?
            .is_some())
    }

    async fn list_user_ids(&self, organization_id: i32) -> Result<Vec<i32>> {
        let ids = organization_users::Entity::find()
            .select_only()
            .column(organization_users::Column::UserId)
            .filter(organization_users::Column::OrganizationId.eq(organization_id))
            .into_tuple::<i32>()
            .all(&self.db)
            .await?;
        Ok(ids)
    }

    async fn delete(&self, organization_id: i32) -> Result<()> {
        organization_users::Entity::delete_many()
            .filter(organization_users::Column::OrganizationId.eq(organization_id))
            .exec(&self.db)
            .await?;
        organizations::Entity::delete_by_id(organization_id)
            .exec(&self.db)
            .await?;
        debug!(organization_id, "Deleted organization row");
        Ok(())
    }

    async fn user_has_other_orgs(&self, user_id: i32) -> Result<bool> {
        let memberships = organization_users::Entity::find()
            .filter(organization_users::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;
        Ok(memberships > 0)
    }

    async fn delete_user(&self, user_id: i32) -> Result<()> {
        users::Entity::delete_by_id(user_id).exec(&self.db).await?;
        Ok(())
    }
}
