use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::database::entities::inventory_states::{self, is_fixed_field};
use crate::database::entities::{
    inventory_audit_logs as audit_logs, inventory_views, DataState, MergeState, SourceType,
};
use crate::errors::{InventoryError, InventoryResult};

/// Creates states and guards their attribute bag.
pub struct StateService {
    db: DatabaseConnection,
}

impl StateService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a new state after validating its extension map
    #[instrument(skip(self, state))]
    pub async fn create_state(
        &self,
        state: inventory_states::ActiveModel,
    ) -> InventoryResult<inventory_states::Model> {
        let mut state = state;
        match &state.extra_data {
            ActiveValue::Set(extra) | ActiveValue::Unchanged(extra) => {
                validate_extra_data(extra)?;
            }
            ActiveValue::NotSet => {
                state.extra_data = Set(Value::Object(Map::new()));
            }
        }
        if state.created_at.is_not_set() {
            state.created_at = Set(chrono::Utc::now());
        }

        let state = state.insert(&self.db).await?;
        debug!(state_id = state.id, source_type = %state.source_type, "Created state");
        Ok(state)
    }

    pub async fn get_state(&self, state_id: i32) -> InventoryResult<inventory_states::Model> {
        inventory_states::Entity::find_by_id(state_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| InventoryError::not_found("State", state_id))
    }

    /// Whether any view or audit entry references the state
    pub async fn is_bound(&self, state_id: i32) -> InventoryResult<bool> {
        let entries = audit_logs::Entity::find()
            .filter(audit_logs::Column::StateId.eq(state_id))
            .count(&self.db)
            .await?;
        if entries > 0 {
            return Ok(true);
        }

        let views = inventory_views::Entity::find()
            .filter(inventory_views::Column::StateId.eq(state_id))
            .count(&self.db)
            .await?;
        Ok(views > 0)
    }

    /// Set one extension field. Rejected for keys that shadow a fixed
    /// column and for states already bound to history.
    #[instrument(skip(self, value))]
    pub async fn set_extra_field(
        &self,
        state_id: i32,
        key: &str,
        value: Value,
    ) -> InventoryResult<inventory_states::Model> {
        if is_fixed_field(key) {
            return Err(InventoryError::ExtraDataCollision(key.to_string()));
        }

        let state = self.get_state(state_id).await?;
        if self.is_bound(state_id).await? {
            return Err(InventoryError::StateFrozen(state_id));
        }

        let mut extra = match state.extra_data.clone() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        extra.insert(key.to_string(), value);

        let mut active: inventory_states::ActiveModel = state.into();
        active.extra_data = Set(Value::Object(extra));
        Ok(active.update(&self.db).await?)
    }

    /// Advance the pipeline status. Allowed on bound states.
    #[instrument(skip(self))]
    pub async fn set_data_state(
        &self,
        state_id: i32,
        next: DataState,
    ) -> InventoryResult<inventory_states::Model> {
        let state = self.get_state(state_id).await?;
        let current = state.get_data_state().unwrap_or(DataState::Unknown);
        if !current.can_transition_to(next) {
            return Err(InventoryError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        let mut active: inventory_states::ActiveModel = state.into();
        active.data_state = Set(next.as_str().to_string());
        let state = active.update(&self.db).await?;
        info!(state_id, from = %current, to = %next, "Data state advanced");
        Ok(state)
    }

    pub async fn set_merge_state(
        &self,
        state_id: i32,
        merge_state: MergeState,
    ) -> InventoryResult<inventory_states::Model> {
        let state = self.get_state(state_id).await?;
        let mut active: inventory_states::ActiveModel = state.into();
        active.merge_state = Set(merge_state.as_str().to_string());
        Ok(active.update(&self.db).await?)
    }

    /// States of an import file that still need matching: everything except
    /// raw rows and composites.
    pub async fn find_unmatched(
        &self,
        import_file_id: i32,
    ) -> InventoryResult<Vec<inventory_states::Model>> {
        let excluded: Vec<&str> = SourceType::excluded_from_matching()
            .iter()
            .map(|source| source.as_str())
            .collect();

        Ok(inventory_states::Entity::find()
            .filter(inventory_states::Column::ImportFileId.eq(import_file_id))
            .filter(inventory_states::Column::SourceType.is_not_in(excluded))
            .order_by_asc(inventory_states::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Serialize a state, masked to `fields` when any are given.
    ///
    /// Requested fixed fields are copied as-is; requested keys found in the
    /// extension map go under `extra_data`. `id` is always present.
    pub fn to_json(state: &inventory_states::Model, fields: &[&str]) -> InventoryResult<Value> {
        let full = serde_json::to_value(state)
            .map_err(|e| InventoryError::validation(format!("Failed to serialize state: {}", e)))?;
        if fields.is_empty() {
            return Ok(full);
        }

        let Value::Object(columns) = full else {
            return Ok(full);
        };
        let extra = state.extra_data.as_object();

        let mut result = Map::new();
        let mut extra_result = Map::new();
        for field in fields {
            if is_fixed_field(field) && *field != "extra_data" {
                if let Some(value) = columns.get(*field) {
                    result.insert(field.to_string(), value.clone());
                }
            } else if let Some(value) = extra.and_then(|map| map.get(*field)) {
                extra_result.insert(field.to_string(), value.clone());
            }
        }
        result.insert("extra_data".to_string(), Value::Object(extra_result));
        result.insert("id".to_string(), Value::from(state.id));

        Ok(Value::Object(result))
    }
}

/// The extension map must be a JSON object with no key shadowing a fixed column
pub fn validate_extra_data(extra: &Value) -> InventoryResult<()> {
    let map = extra
        .as_object()
        .ok_or_else(|| InventoryError::validation("extra_data must be a JSON object"))?;

    if let Some(key) = map.keys().find(|key| is_fixed_field(key)) {
        return Err(InventoryError::ExtraDataCollision(key.clone()));
    }
    Ok(())
}
