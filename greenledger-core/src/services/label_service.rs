use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{debug, info};

use crate::database::entities::{inventory, inventory_views, status_labels, view_labels, LabelColor};
use crate::errors::{InventoryError, InventoryResult};

/// Status labels every organization starts with
pub const DEFAULT_LABELS: [&str; 14] = [
    "Residential",
    "Non-Residential",
    "Violation",
    "Compliant",
    "Missing Data",
    "Questionable Report",
    "Update Bldg Info",
    "Call",
    "Email",
    "High EUI",
    "Low EUI",
    "Exempted",
    "Extension",
    "Change of Ownership",
];

pub struct LabelService {
    db: DatabaseConnection,
}

impl LabelService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create whichever default labels the organization is missing
    pub async fn ensure_default_labels(
        &self,
        organization_id: i32,
    ) -> InventoryResult<Vec<status_labels::Model>> {
        let existing = self.list_labels(organization_id).await?;
        let mut created = 0;

        for name in DEFAULT_LABELS {
            if existing.iter().any(|label| label.name == name) {
                continue;
            }
            self.insert_label(organization_id, name, LabelColor::default())
                .await?;
            created += 1;
        }

        if created > 0 {
            info!(organization_id, created, "Created default status labels");
        }
        self.list_labels(organization_id).await
    }

    pub async fn create_label(
        &self,
        organization_id: i32,
        name: &str,
        color: LabelColor,
    ) -> InventoryResult<status_labels::Model> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InventoryError::validation("Label name cannot be empty"));
        }

        let duplicate = status_labels::Entity::find()
            .filter(status_labels::Column::OrganizationId.eq(organization_id))
            .filter(status_labels::Column::Name.eq(name))
            .one(&self.db)
            .await?;
        if duplicate.is_some() {
            return Err(InventoryError::validation(format!(
                "Label '{}' already exists",
                name
            )));
        }

        self.insert_label(organization_id, name, color).await
    }

    async fn insert_label(
        &self,
        organization_id: i32,
        name: &str,
        color: LabelColor,
    ) -> InventoryResult<status_labels::Model> {
        Ok(status_labels::ActiveModel {
            organization_id: Set(organization_id),
            name: Set(name.to_string()),
            color: Set(color.as_str().to_string()),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?)
    }

    /// Labels of an organization, ordered by name descending
    pub async fn list_labels(
        &self,
        organization_id: i32,
    ) -> InventoryResult<Vec<status_labels::Model>> {
        Ok(status_labels::Entity::find()
            .filter(status_labels::Column::OrganizationId.eq(organization_id))
            .order_by_desc(status_labels::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn apply_label(&self, view_id: i32, label_id: i32) -> InventoryResult<()> {
        let (view, label) = self.load_pair(view_id, label_id).await?;

        let existing = view_labels::Entity::find_by_id((view.id, label.id))
            .one(&self.db)
            .await?;
        if existing.is_none() {
            view_labels::ActiveModel {
                view_id: Set(view.id),
                label_id: Set(label.id),
            }
            .insert(&self.db)
            .await?;
            debug!(view_id, label = %label.name, "Applied label");
        }
        Ok(())
    }

    pub async fn remove_label(&self, view_id: i32, label_id: i32) -> InventoryResult<bool> {
        let result = view_labels::Entity::delete_by_id((view_id, label_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn labels_for_view(&self, view_id: i32) -> InventoryResult<Vec<status_labels::Model>> {
        let view = inventory_views::Entity::find_by_id(view_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| InventoryError::not_found("View", view_id))?;

        Ok(view
            .find_related(status_labels::Entity)
            .order_by_asc(status_labels::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// A label may only be applied to views of its own organization
    async fn load_pair(
        &self,
        view_id: i32,
        label_id: i32,
    ) -> InventoryResult<(inventory_views::Model, status_labels::Model)> {
        let view = inventory_views::Entity::find_by_id(view_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| InventoryError::not_found("View", view_id))?;
        let label = status_labels::Entity::find_by_id(label_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| InventoryError::not_found("StatusLabel", label_id))?;
        let entity = inventory::Entity::find_by_id(view.inventory_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| InventoryError::not_found("Inventory", view.inventory_id))?;

        if entity.organization_id != label.organization_id {
            return Err(InventoryError::validation(format!(
                "Label {} does not belong to the organization of view {}",
                label_id, view_id
            )));
        }
        Ok((view, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::SourceType;
    use crate::database::test_utils::{seed_cycle, seed_organization, seed_state, setup_test_db};
    use crate::services::PromotionService;

    #[tokio::test]
    async fn test_default_labels_are_idempotent() {
        let db = setup_test_db().await;
        let org = seed_organization(&db, "Label Org").await;
        let service = LabelService::new(db.clone());

        let first = service.ensure_default_labels(org.id).await.unwrap();
        let second = service.ensure_default_labels(org.id).await.unwrap();

        assert_eq!(first.len(), DEFAULT_LABELS.len());
        assert_eq!(second.len(), DEFAULT_LABELS.len());
        assert!(first.iter().all(|label| label.get_color() == LabelColor::Green));
        assert_eq!(first[0].name, "Violation");
    }

    #[tokio::test]
    async fn test_apply_and_remove_labels() {
        let db = setup_test_db().await;
        let org = seed_organization(&db, "Apply Org").await;
        let cycle = seed_cycle(&db, org.id, 2024).await;
        let state = seed_state(&db, org.id, None, SourceType::PortfolioFinal).await;
        let view = PromotionService::new(db.clone())
            .promote(state.id, cycle.id)
            .await
            .unwrap();
        let service = LabelService::new(db.clone());

        let high = service
            .create_label(org.id, "High EUI", LabelColor::Red)
            .await
            .unwrap();
        let call = service
            .create_label(org.id, "Call", LabelColor::Blue)
            .await
            .unwrap();
        assert!(service
            .create_label(org.id, "Call", LabelColor::Blue)
            .await
            .is_err());

        service.apply_label(view.id, high.id).await.unwrap();
        service.apply_label(view.id, call.id).await.unwrap();
        service.apply_label(view.id, call.id).await.unwrap();

        let names: Vec<String> = service
            .labels_for_view(view.id)
            .await
            .unwrap()
            .into_iter()
            .map(|label| label.name)
            .collect();
        assert_eq!(names, vec!["Call".to_string(), "High EUI".to_string()]);

        assert!(service.remove_label(view.id, call.id).await.unwrap());
        assert!(!service.remove_label(view.id, call.id).await.unwrap());
        assert_eq!(service.labels_for_view(view.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_label_from_other_org_is_rejected() {
        let db = setup_test_db().await;
        let org = seed_organization(&db, "Home Org").await;
        let other = seed_organization(&db, "Other Org").await;
        let cycle = seed_cycle(&db, org.id, 2024).await;
        let state = seed_state(&db, org.id, None, SourceType::PortfolioFinal).await;
        let view = PromotionService::new(db.clone())
            .promote(state.id, cycle.id)
            .await
            .unwrap();

        let service = LabelService::new(db.clone());
        let foreign = service
            .create_label(other.id, "Compliant", LabelColor::Green)
            .await
            .unwrap();
        let err = service.apply_label(view.id, foreign.id).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }
}
