use std::collections::HashSet;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::database::entities::{
    inventory, inventory_audit_logs as audit_logs, inventory_states, inventory_views,
    AuditRecordType,
};
use crate::errors::{InventoryError, InventoryResult};

pub const ROOT_ON_CREATE_DESCRIPTION: &str = "Initial audit log added on creation/save.";
pub const ROOT_ON_UPDATE_DESCRIPTION: &str = "Initial audit log added on update.";

/// Caller-supplied annotations for a new audit log entry
#[derive(Clone, Debug)]
pub struct AuditMetadata {
    pub record_type: AuditRecordType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub import_filename: Option<String>,
}

impl AuditMetadata {
    pub fn new(record_type: AuditRecordType) -> Self {
        Self {
            record_type,
            name: None,
            description: None,
            import_filename: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_import_filename(mut self, filename: impl Into<String>) -> Self {
        self.import_filename = Some(filename.into());
        self
    }
}

/// Result of rebinding a view: the view as persisted and the entry recording it
#[derive(Clone, Debug)]
pub struct StateUpdate {
    pub view: inventory_views::Model,
    pub entry: audit_logs::Model,
}

/// A loaded view with a lazily resolved, instance-scoped import filename.
///
/// The filename is looked up on first read and kept for the life of the
/// handle. It is never written back to storage.
#[derive(Debug)]
pub struct ViewHandle {
    view: inventory_views::Model,
    import_filename: OnceCell<Option<String>>,
}

impl ViewHandle {
    pub fn new(view: inventory_views::Model) -> Self {
        Self {
            view,
            import_filename: OnceCell::new(),
        }
    }

    pub fn view(&self) -> &inventory_views::Model {
        &self.view
    }

    pub async fn import_filename(
        &self,
        service: &AuditLogService,
    ) -> InventoryResult<Option<String>> {
        let filename = self
            .import_filename
            .get_or_try_init(|| service.import_filename(self.view.id))
            .await?;
        Ok(filename.clone())
    }
}

/// Appends to and queries the audit lineage DAG.
pub struct AuditLogService {
    db: DatabaseConnection,
}

impl AuditLogService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Rebind a view to `new_state_id` and chain a new audit entry off the
    /// entry for its current state. View rebind and audit append commit
    /// together or not at all.
    #[instrument(skip(self, metadata), fields(record_type = %metadata.record_type))]
    pub async fn update_state(
        &self,
        view_id: i32,
        new_state_id: i32,
        metadata: AuditMetadata,
    ) -> InventoryResult<StateUpdate> {
        self.rebind(view_id, new_state_id, None, metadata).await
    }

    /// Same as [`update_state`](Self::update_state), with `parent2_id` recorded
    /// as the second lineage the new state was merged from.
    #[instrument(skip(self, metadata), fields(record_type = %metadata.record_type))]
    pub async fn update_state_with_parent2(
        &self,
        view_id: i32,
        new_state_id: i32,
        parent2_id: i32,
        metadata: AuditMetadata,
    ) -> InventoryResult<StateUpdate> {
        self.rebind(view_id, new_state_id, Some(parent2_id), metadata)
            .await
    }

    async fn rebind(
        &self,
        view_id: i32,
        new_state_id: i32,
        parent2_id: Option<i32>,
        metadata: AuditMetadata,
    ) -> InventoryResult<StateUpdate> {
        let txn = self.db.begin().await?;

        let view = inventory_views::Entity::find_by_id(view_id)
            .one(&txn)
            .await?
            .ok_or_else(|| InventoryError::not_found("View", view_id))?;

        let update = update_state_in(&txn, &view, new_state_id, parent2_id, metadata).await?;

        txn.commit().await?;
        Ok(update)
    }

    pub fn handle(&self, view: inventory_views::Model) -> ViewHandle {
        ViewHandle::new(view)
    }

    /// Filename of the earliest audit entry reachable from the view.
    ///
    /// `Ok(None)` means the lineage exists but its root carries no filename.
    #[instrument(skip(self))]
    pub async fn import_filename(&self, view_id: i32) -> InventoryResult<Option<String>> {
        let entries = self.lineage(view_id).await?;
        let earliest = entries
            .iter()
            .min_by_key(|entry| (entry.created_at, entry.id))
            .ok_or(InventoryError::LineageGap { view_id })?;

        debug!(view_id, entry_id = earliest.id, "Resolved import filename");
        Ok(earliest.import_filename.clone())
    }

    /// Every audit entry reachable from the view, newest first
    pub async fn history(&self, view_id: i32) -> InventoryResult<Vec<audit_logs::Model>> {
        let mut entries = self.lineage(view_id).await?;
        if entries.is_empty() {
            return Err(InventoryError::LineageGap { view_id });
        }
        entries.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(entries)
    }

    /// Distinct per-source final states the entry descends from. The walk
    /// does not continue past raw import rows.
    #[instrument(skip(self))]
    pub async fn final_ancestor_states(
        &self,
        entry_id: i32,
    ) -> InventoryResult<Vec<inventory_states::Model>> {
        let start = audit_logs::Entity::find_by_id(entry_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| InventoryError::not_found("AuditLog", entry_id))?;

        let mut stack: Vec<i32> = start.parent_ids().collect();
        let mut visited = HashSet::new();
        let mut seen_states = HashSet::new();
        let mut finals = Vec::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(entry) = audit_logs::Entity::find_by_id(id).one(&self.db).await? else {
                continue;
            };
            let Some(state) = inventory_states::Entity::find_by_id(entry.state_id)
                .one(&self.db)
                .await?
            else {
                continue;
            };

            match state.get_source_type() {
                Some(source) if source.is_raw() => continue,
                Some(source) if source.is_final() => {
                    if seen_states.insert(state.id) {
                        finals.push(state);
                    }
                }
                _ => {}
            }
            stack.extend(entry.parent_ids());
        }

        Ok(finals)
    }

    async fn lineage(&self, view_id: i32) -> InventoryResult<Vec<audit_logs::Model>> {
        let view = inventory_views::Entity::find_by_id(view_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| InventoryError::not_found("View", view_id))?;

        let mut seeds = audit_logs::Entity::find()
            .filter(audit_logs::Column::ViewId.eq(view.id))
            .all(&self.db)
            .await?;
        if let Some(current) = first_entry_for_state(&self.db, view.state_id).await? {
            seeds.push(current);
        }

        Ok(reachable_entries(&self.db, seeds).await?)
    }
}

/// Oldest entry recording `state_id`. Ties on timestamp fall back to id.
pub(crate) async fn first_entry_for_state<C: ConnectionTrait>(
    conn: &C,
    state_id: i32,
) -> Result<Option<audit_logs::Model>, sea_orm::DbErr> {
    audit_logs::Entity::find()
        .filter(audit_logs::Column::StateId.eq(state_id))
        .order_by_asc(audit_logs::Column::CreatedAt)
        .order_by_asc(audit_logs::Column::Id)
        .one(conn)
        .await
}

pub(crate) async fn insert_root_entry<C: ConnectionTrait>(
    conn: &C,
    organization_id: i32,
    state_id: i32,
    view_id: i32,
    metadata: AuditMetadata,
) -> Result<audit_logs::Model, sea_orm::DbErr> {
    let mut entry = audit_logs::ActiveModel::new(organization_id, state_id, metadata.record_type);
    entry.view_id = Set(Some(view_id));
    entry.name = Set(metadata.name);
    entry.description = Set(metadata.description);
    entry.import_filename = Set(metadata.import_filename);
    entry.insert(conn).await
}

/// Entry for the view's current state, synthesizing a root when the lineage
/// has a gap.
pub(crate) async fn current_entry_or_root<C: ConnectionTrait>(
    conn: &C,
    view: &inventory_views::Model,
) -> InventoryResult<audit_logs::Model> {
    if let Some(entry) = first_entry_for_state(conn, view.state_id).await? {
        return Ok(entry);
    }

    warn!(
        view_id = view.id,
        state_id = view.state_id,
        "View state has no audit entry; initializing a fallback root"
    );
    let organization_id = view_organization(conn, view).await?;
    let metadata = AuditMetadata::new(AuditRecordType::ImportCreate)
        .with_name("Import Creation")
        .with_description(ROOT_ON_UPDATE_DESCRIPTION);
    Ok(insert_root_entry(conn, organization_id, view.state_id, view.id, metadata).await?)
}

/// Core of every view rebind. Must run inside a transaction owned by the
/// caller so the rebind and the append commit together.
pub(crate) async fn update_state_in<C: ConnectionTrait>(
    conn: &C,
    view: &inventory_views::Model,
    new_state_id: i32,
    parent2_id: Option<i32>,
    metadata: AuditMetadata,
) -> InventoryResult<StateUpdate> {
    inventory_states::Entity::find_by_id(new_state_id)
        .one(conn)
        .await?
        .ok_or_else(|| InventoryError::not_found("State", new_state_id))?;

    let parent1 = current_entry_or_root(conn, view).await?;

    if let Some(parent2_id) = parent2_id {
        if parent2_id == parent1.id {
            return Err(InventoryError::validation(format!(
                "Second parent {} is the same entry as the first parent",
                parent2_id
            )));
        }
        let parent2 = audit_logs::Entity::find_by_id(parent2_id)
            .one(conn)
            .await?
            .ok_or_else(|| InventoryError::not_found("AuditLog", parent2_id))?;

        let organization_id = view_organization(conn, view).await?;
        if parent2.organization_id != organization_id {
            return Err(InventoryError::validation(format!(
                "Second parent {} belongs to organization {}, not {}",
                parent2_id, parent2.organization_id, organization_id
            )));
        }

        // A second parent must bring in a lineage the view does not already have
        let own_lineage = reachable_entries(conn, vec![parent1.clone()]).await?;
        if own_lineage.iter().any(|entry| entry.id == parent2_id) {
            return Err(InventoryError::validation(format!(
                "Second parent {} is already in the lineage of view {}",
                parent2_id, view.id
            )));
        }
    }

    let now = chrono::Utc::now();
    let rebound = inventory_views::Entity::update_many()
        .col_expr(inventory_views::Column::StateId, Expr::value(new_state_id))
        .col_expr(inventory_views::Column::UpdatedAt, Expr::value(now))
        .filter(inventory_views::Column::Id.eq(view.id))
        .filter(inventory_views::Column::StateId.eq(view.state_id))
        .exec(conn)
        .await?;
    if rebound.rows_affected != 1 {
        return Err(InventoryError::StaleView {
            view_id: view.id,
            expected_state_id: view.state_id,
        });
    }

    let record_type = metadata.record_type;
    let mut entry = audit_logs::ActiveModel::new(parent1.organization_id, new_state_id, record_type);
    entry.view_id = Set(Some(view.id));
    entry.parent1_id = Set(Some(parent1.id));
    entry.parent2_id = Set(parent2_id);
    entry.name = Set(metadata.name);
    entry.description = Set(metadata.description);
    entry.import_filename = Set(metadata.import_filename);
    let entry = entry.insert(conn).await?;

    info!(
        view_id = view.id,
        from_state = view.state_id,
        to_state = new_state_id,
        entry_id = entry.id,
        parent1 = parent1.id,
        parent2 = ?parent2_id,
        "Rebound view to new state"
    );

    let mut view = view.clone();
    view.state_id = new_state_id;
    view.updated_at = now;

    Ok(StateUpdate { view, entry })
}

async fn view_organization<C: ConnectionTrait>(
    conn: &C,
    view: &inventory_views::Model,
) -> InventoryResult<i32> {
    let entity = inventory::Entity::find_by_id(view.inventory_id)
        .one(conn)
        .await?
        .ok_or_else(|| InventoryError::not_found("Inventory", view.inventory_id))?;
    Ok(entity.organization_id)
}

/// Breadth-first walk over parent1/parent2 from `seeds`. The visited set
/// guards against cycles introduced by bad data.
async fn reachable_entries<C: ConnectionTrait>(
    conn: &C,
    seeds: Vec<audit_logs::Model>,
) -> Result<Vec<audit_logs::Model>, sea_orm::DbErr> {
    let mut visited = HashSet::new();
    let mut entries = Vec::new();
    let mut frontier = Vec::new();

    for entry in seeds {
        if visited.insert(entry.id) {
            frontier.extend(entry.parent_ids());
            entries.push(entry);
        }
    }

    while !frontier.is_empty() {
        let pending: Vec<i32> = frontier
            .drain(..)
            .filter(|id| !visited.contains(id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if pending.is_empty() {
            break;
        }

        let parents = audit_logs::Entity::find()
            .filter(audit_logs::Column::Id.is_in(pending))
            .all(conn)
            .await?;
        for parent in parents {
            if visited.insert(parent.id) {
                frontier.extend(parent.parent_ids());
                entries.push(parent);
            }
        }
    }

    Ok(entries)
}
