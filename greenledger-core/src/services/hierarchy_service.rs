use std::collections::HashSet;

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{debug, info, instrument};

use crate::database::entities::inventory;
use crate::errors::{InventoryError, InventoryResult};

/// Campus/building grouping of inventory records.
///
/// All walks are iterative and bounded by `max_depth`.
pub struct HierarchyService {
    db: DatabaseConnection,
    max_depth: usize,
}

impl HierarchyService {
    pub fn new(db: DatabaseConnection, max_depth: usize) -> Self {
        Self { db, max_depth }
    }

    async fn get(&self, entity_id: i32) -> InventoryResult<inventory::Model> {
        inventory::Entity::find_by_id(entity_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| InventoryError::not_found("Inventory", entity_id))
    }

    pub async fn set_group(
        &self,
        entity_id: i32,
        is_group: bool,
    ) -> InventoryResult<inventory::Model> {
        let entity = self.get(entity_id).await?;
        if !is_group {
            let members = self.members(entity_id).await?;
            if !members.is_empty() {
                return Err(InventoryError::validation(format!(
                    "Inventory {} still has {} members",
                    entity_id,
                    members.len()
                )));
            }
        }

        let mut active: inventory::ActiveModel = entity.into();
        active.is_group = Set(is_group);
        Ok(active.update(&self.db).await?)
    }

    /// Move `entity_id` under `parent_id`, or detach it with `None`
    #[instrument(skip(self))]
    pub async fn set_parent(
        &self,
        entity_id: i32,
        parent_id: Option<i32>,
    ) -> InventoryResult<inventory::Model> {
        let entity = self.get(entity_id).await?;

        if let Some(parent_id) = parent_id {
            if parent_id == entity_id {
                return Err(InventoryError::HierarchyCycle {
                    entity_id,
                    parent_id,
                });
            }

            let parent = self.get(parent_id).await?;
            if !parent.is_group {
                return Err(InventoryError::validation(format!(
                    "Inventory {} is not a group",
                    parent_id
                )));
            }
            if parent.organization_id != entity.organization_id {
                return Err(InventoryError::validation(format!(
                    "Inventory {} belongs to a different organization",
                    parent_id
                )));
            }

            let ancestors = self.ancestors(parent_id).await?;
            if ancestors.iter().any(|ancestor| ancestor.id == entity_id) {
                return Err(InventoryError::HierarchyCycle {
                    entity_id,
                    parent_id,
                });
            }
            let height = self.descendant_levels(entity_id).await?.len();
            if ancestors.len() + 1 + height > self.max_depth {
                return Err(InventoryError::HierarchyTooDeep {
                    entity_id,
                    max_depth: self.max_depth,
                });
            }
        }

        let mut active: inventory::ActiveModel = entity.into();
        active.parent_id = Set(parent_id);
        let entity = active.update(&self.db).await?;
        info!(entity_id, parent_id = ?parent_id, "Re-parented inventory record");
        Ok(entity)
    }

    /// Ancestors of `entity_id`, nearest first
    pub async fn ancestors(&self, entity_id: i32) -> InventoryResult<Vec<inventory::Model>> {
        let mut current = self.get(entity_id).await?;
        let mut visited = HashSet::from([entity_id]);
        let mut ancestors = Vec::new();

        while let Some(parent_id) = current.parent_id {
            if !visited.insert(parent_id) {
                return Err(InventoryError::HierarchyCycle {
                    entity_id: current.id,
                    parent_id,
                });
            }
            if ancestors.len() >= self.max_depth {
                return Err(InventoryError::HierarchyTooDeep {
                    entity_id,
                    max_depth: self.max_depth,
                });
            }

            let parent = self.get(parent_id).await?;
            ancestors.push(parent.clone());
            current = parent;
        }

        debug!(entity_id, depth = ancestors.len(), "Resolved ancestors");
        Ok(ancestors)
    }

    /// Direct members of a group
    pub async fn members(&self, group_id: i32) -> InventoryResult<Vec<inventory::Model>> {
        Ok(inventory::Entity::find()
            .filter(inventory::Column::ParentId.eq(group_id))
            .all(&self.db)
            .await?)
    }

    /// All transitive members, breadth-first
    pub async fn descendants(&self, group_id: i32) -> InventoryResult<Vec<inventory::Model>> {
        Ok(self
            .descendant_levels(group_id)
            .await?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Members grouped by distance below `group_id`. The number of levels is
    /// the height of the subtree.
    async fn descendant_levels(
        &self,
        group_id: i32,
    ) -> InventoryResult<Vec<Vec<inventory::Model>>> {
        let mut visited = HashSet::from([group_id]);
        let mut frontier = vec![group_id];
        let mut levels = Vec::new();

        while !frontier.is_empty() {
            if levels.len() > self.max_depth {
                return Err(InventoryError::HierarchyTooDeep {
                    entity_id: group_id,
                    max_depth: self.max_depth,
                });
            }

            let children = inventory::Entity::find()
                .filter(inventory::Column::ParentId.is_in(frontier.drain(..)))
                .all(&self.db)
                .await?;
            let level: Vec<inventory::Model> = children
                .into_iter()
                .filter(|child| visited.insert(child.id))
                .collect();
            if level.is_empty() {
                break;
            }
            frontier.extend(level.iter().map(|child| child.id));
            levels.push(level);
        }

        Ok(levels)
    }
}
