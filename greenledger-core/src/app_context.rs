use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::config::LedgerConfig;
use crate::database::entities::{inventory_audit_logs, inventory_views};
use crate::errors::CoreError;
use crate::lifecycle::{
    BulkDeleteManager, DeleteJob, InMemoryProgressStore, ProgressRecord, ProgressStore,
    SeaOrmDirectory, TaskExecutor, TokioTaskExecutor,
};
use crate::services::{
    AuditLogService, HierarchyService, LabelService, MergeService, PromotionService, StateService,
};

/// Shared application context exposing core services to the CLI and embedders.
#[derive(Clone)]
pub struct AppContext {
    db: DatabaseConnection,
    config: LedgerConfig,
    promotion_service: Arc<PromotionService>,
    audit_log_service: Arc<AuditLogService>,
    merge_service: Arc<MergeService>,
    state_service: Arc<StateService>,
    hierarchy_service: Arc<HierarchyService>,
    label_service: Arc<LabelService>,
    bulk_delete_manager: Arc<BulkDeleteManager>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ViewSummary {
    pub id: i32,
    pub inventory_id: i32,
    pub cycle_id: i32,
    pub state_id: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<inventory_views::Model> for ViewSummary {
    fn from(model: inventory_views::Model) -> Self {
        Self {
            id: model.id,
            inventory_id: model.inventory_id,
            cycle_id: model.cycle_id,
            state_id: model.state_id,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditEntrySummary {
    pub id: i32,
    pub state_id: i32,
    pub view_id: Option<i32>,
    pub parent1_id: Option<i32>,
    pub parent2_id: Option<i32>,
    pub record_type: String,
    pub description: Option<String>,
    pub import_filename: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<inventory_audit_logs::Model> for AuditEntrySummary {
    fn from(model: inventory_audit_logs::Model) -> Self {
        Self {
            id: model.id,
            state_id: model.state_id,
            view_id: model.view_id,
            parent1_id: model.parent1_id,
            parent2_id: model.parent2_id,
            record_type: model.record_type,
            description: model.description,
            import_filename: model.import_filename,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct LineageSummary {
    pub view_id: i32,
    pub import_filename: Option<String>,
    pub entries: Vec<AuditEntrySummary>,
}

impl AppContext {
    pub fn new(db: DatabaseConnection, config: LedgerConfig) -> Self {
        Self::with_lifecycle(
            db,
            config,
            Arc::new(TokioTaskExecutor::new()),
            Arc::new(InMemoryProgressStore::new()),
        )
    }

    /// Build a context whose bulk operations run on the given executor and
    /// report through the given progress store
    pub fn with_lifecycle(
        db: DatabaseConnection,
        config: LedgerConfig,
        executor: Arc<dyn TaskExecutor>,
        progress: Arc<dyn ProgressStore>,
    ) -> Self {
        let promotion_service = Arc::new(PromotionService::new(db.clone()));
        let audit_log_service = Arc::new(AuditLogService::new(db.clone()));
        let merge_service = Arc::new(MergeService::new(db.clone()));
        let state_service = Arc::new(StateService::new(db.clone()));
        let hierarchy_service = Arc::new(HierarchyService::new(
            db.clone(),
            config.max_hierarchy_depth,
        ));
        let label_service = Arc::new(LabelService::new(db.clone()));
        let bulk_delete_manager = Arc::new(BulkDeleteManager::new(
            db.clone(),
            config.clone(),
            executor,
            progress,
            Arc::new(SeaOrmDirectory::new(db.clone())),
        ));

        Self {
            db,
            config,
            promotion_service,
            audit_log_service,
            merge_service,
            state_service,
            hierarchy_service,
            label_service,
            bulk_delete_manager,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn promotion_service(&self) -> Arc<PromotionService> {
        self.promotion_service.clone()
    }

    pub fn audit_log_service(&self) -> Arc<AuditLogService> {
        self.audit_log_service.clone()
    }

    pub fn merge_service(&self) -> Arc<MergeService> {
        self.merge_service.clone()
    }

    pub fn state_service(&self) -> Arc<StateService> {
        self.state_service.clone()
    }

    pub fn hierarchy_service(&self) -> Arc<HierarchyService> {
        self.hierarchy_service.clone()
    }

    pub fn label_service(&self) -> Arc<LabelService> {
        self.label_service.clone()
    }

    pub fn bulk_delete_manager(&self) -> Arc<BulkDeleteManager> {
        self.bulk_delete_manager.clone()
    }

    // ----- Operator helpers ------------------------------------------------
    pub async fn promote(&self, state_id: i32, cycle_id: i32) -> Result<ViewSummary, CoreError> {
        let view = self.promotion_service.promote(state_id, cycle_id).await?;
        Ok(ViewSummary::from(view))
    }

    pub async fn lineage(&self, view_id: i32) -> Result<LineageSummary, CoreError> {
        let entries = self.audit_log_service.history(view_id).await?;
        let import_filename = self.audit_log_service.import_filename(view_id).await?;

        Ok(LineageSummary {
            view_id,
            import_filename,
            entries: entries.into_iter().map(AuditEntrySummary::from).collect(),
        })
    }

    pub async fn delete_organization(&self, organization_id: i32) -> Result<DeleteJob, CoreError> {
        Ok(self
            .bulk_delete_manager
            .delete_organization(organization_id)
            .await?)
    }

    pub async fn delete_progress(
        &self,
        organization_id: i32,
    ) -> Result<Option<ProgressRecord>, CoreError> {
        Ok(self.bulk_delete_manager.progress(organization_id).await?)
    }
}
