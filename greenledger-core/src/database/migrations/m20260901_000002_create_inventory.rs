use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Inventory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Inventory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Inventory::OrganizationId).integer().not_null())
                    .col(ColumnDef::new(Inventory::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Inventory::IsGroup)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Inventory::ParentId).integer())
                    .col(ColumnDef::new(Inventory::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_organization_id")
                            .from(Inventory::Table, Inventory::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_parent_id")
                            .from(Inventory::Table, Inventory::ParentId)
                            .to(Inventory::Table, Inventory::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_organization_kind")
                    .table(Inventory::Table)
                    .col(Inventory::OrganizationId)
                    .col(Inventory::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryStates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryStates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InventoryStates::OrganizationId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryStates::Kind).string().not_null())
                    .col(ColumnDef::new(InventoryStates::ImportFileId).integer())
                    .col(ColumnDef::new(InventoryStates::SourceType).string().not_null())
                    .col(
                        ColumnDef::new(InventoryStates::DataState)
                            .string()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(
                        ColumnDef::new(InventoryStates::MergeState)
                            .string()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(ColumnDef::new(InventoryStates::Confidence).double())
                    .col(ColumnDef::new(InventoryStates::JurisdictionPropertyId).string())
                    .col(ColumnDef::new(InventoryStates::JurisdictionTaxLotId).string())
                    .col(ColumnDef::new(InventoryStates::CustomId1).string())
                    .col(ColumnDef::new(InventoryStates::PmParentPropertyId).string())
                    .col(ColumnDef::new(InventoryStates::PmPropertyId).string())
                    .col(ColumnDef::new(InventoryStates::LotNumber).string())
                    .col(ColumnDef::new(InventoryStates::BlockNumber).string())
                    .col(ColumnDef::new(InventoryStates::District).string())
                    .col(ColumnDef::new(InventoryStates::PropertyName).string())
                    .col(ColumnDef::new(InventoryStates::AddressLine1).string())
                    .col(ColumnDef::new(InventoryStates::AddressLine2).string())
                    .col(ColumnDef::new(InventoryStates::City).string())
                    .col(ColumnDef::new(InventoryStates::StateProvince).string())
                    .col(ColumnDef::new(InventoryStates::PostalCode).string())
                    .col(ColumnDef::new(InventoryStates::BuildingCount).integer())
                    .col(ColumnDef::new(InventoryStates::NumberProperties).integer())
                    .col(ColumnDef::new(InventoryStates::UseDescription).string())
                    .col(ColumnDef::new(InventoryStates::YearBuilt).integer())
                    .col(ColumnDef::new(InventoryStates::GrossFloorArea).double())
                    .col(ColumnDef::new(InventoryStates::ConditionedFloorArea).double())
                    .col(ColumnDef::new(InventoryStates::OccupiedFloorArea).double())
                    .col(ColumnDef::new(InventoryStates::RecentSaleDate).timestamp())
                    .col(ColumnDef::new(InventoryStates::Owner).string())
                    .col(ColumnDef::new(InventoryStates::OwnerEmail).string())
                    .col(ColumnDef::new(InventoryStates::OwnerTelephone).string())
                    .col(ColumnDef::new(InventoryStates::PropertyNotes).text())
                    .col(ColumnDef::new(InventoryStates::YearEnding).date())
                    .col(ColumnDef::new(InventoryStates::EnergyScore).integer())
                    .col(ColumnDef::new(InventoryStates::SiteEui).double())
                    .col(ColumnDef::new(InventoryStates::SourceEui).double())
                    .col(ColumnDef::new(InventoryStates::SiteEuiWeatherNormalized).double())
                    .col(ColumnDef::new(InventoryStates::SourceEuiWeatherNormalized).double())
                    .col(ColumnDef::new(InventoryStates::GenerationDate).timestamp())
                    .col(ColumnDef::new(InventoryStates::ReleaseDate).timestamp())
                    .col(ColumnDef::new(InventoryStates::EnergyAlerts).text())
                    .col(ColumnDef::new(InventoryStates::SpaceAlerts).text())
                    .col(ColumnDef::new(InventoryStates::BuildingCertification).string())
                    .col(
                        ColumnDef::new(InventoryStates::ExtraData)
                            .json()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(InventoryStates::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_states_organization_id")
                            .from(InventoryStates::Table, InventoryStates::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_states_import_file_id")
                            .from(InventoryStates::Table, InventoryStates::ImportFileId)
                            .to(ImportFiles::Table, ImportFiles::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_states_organization_kind")
                    .table(InventoryStates::Table)
                    .col(InventoryStates::OrganizationId)
                    .col(InventoryStates::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_states_import_file_id")
                    .table(InventoryStates::Table)
                    .col(InventoryStates::ImportFileId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryViews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryViews::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InventoryViews::InventoryId).integer().not_null())
                    .col(ColumnDef::new(InventoryViews::CycleId).integer().not_null())
                    .col(ColumnDef::new(InventoryViews::StateId).integer().not_null())
                    .col(
                        ColumnDef::new(InventoryViews::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryViews::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_views_inventory_id")
                            .from(InventoryViews::Table, InventoryViews::InventoryId)
                            .to(Inventory::Table, Inventory::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_views_cycle_id")
                            .from(InventoryViews::Table, InventoryViews::CycleId)
                            .to(Cycles::Table, Cycles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_views_state_id")
                            .from(InventoryViews::Table, InventoryViews::StateId)
                            .to(InventoryStates::Table, InventoryStates::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One view per record per cycle
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_views_inventory_cycle")
                    .table(InventoryViews::Table)
                    .col(InventoryViews::InventoryId)
                    .col(InventoryViews::CycleId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_views_state_cycle")
                    .table(InventoryViews::Table)
                    .col(InventoryViews::StateId)
                    .col(InventoryViews::CycleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryAuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryAuditLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InventoryAuditLogs::OrganizationId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryAuditLogs::StateId).integer().not_null())
                    .col(ColumnDef::new(InventoryAuditLogs::ViewId).integer())
                    .col(ColumnDef::new(InventoryAuditLogs::Parent1Id).integer())
                    .col(ColumnDef::new(InventoryAuditLogs::Parent2Id).integer())
                    .col(ColumnDef::new(InventoryAuditLogs::Name).string())
                    .col(ColumnDef::new(InventoryAuditLogs::Description).text())
                    .col(ColumnDef::new(InventoryAuditLogs::ImportFilename).string())
                    .col(
                        ColumnDef::new(InventoryAuditLogs::RecordType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryAuditLogs::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_audit_logs_organization_id")
                            .from(InventoryAuditLogs::Table, InventoryAuditLogs::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_audit_logs_state_id")
                            .from(InventoryAuditLogs::Table, InventoryAuditLogs::StateId)
                            .to(InventoryStates::Table, InventoryStates::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_audit_logs_view_id")
                            .from(InventoryAuditLogs::Table, InventoryAuditLogs::ViewId)
                            .to(InventoryViews::Table, InventoryViews::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_audit_logs_parent1_id")
                            .from(InventoryAuditLogs::Table, InventoryAuditLogs::Parent1Id)
                            .to(InventoryAuditLogs::Table, InventoryAuditLogs::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_audit_logs_parent2_id")
                            .from(InventoryAuditLogs::Table, InventoryAuditLogs::Parent2Id)
                            .to(InventoryAuditLogs::Table, InventoryAuditLogs::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_audit_logs_state_id")
                    .table(InventoryAuditLogs::Table)
                    .col(InventoryAuditLogs::StateId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_audit_logs_view_id")
                    .table(InventoryAuditLogs::Table)
                    .col(InventoryAuditLogs::ViewId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryAuditLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryViews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryStates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Inventory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Inventory {
    Table,
    Id,
    OrganizationId,
    Kind,
    IsGroup,
    ParentId,
    CreatedAt,
}

#[derive(Iden)]
enum InventoryStates {
    Table,
    Id,
    OrganizationId,
    Kind,
    ImportFileId,
    SourceType,
    DataState,
    MergeState,
    Confidence,
    JurisdictionPropertyId,
    JurisdictionTaxLotId,
    #[iden = "custom_id_1"]
    CustomId1,
    PmParentPropertyId,
    PmPropertyId,
    LotNumber,
    BlockNumber,
    District,
    PropertyName,
    #[iden = "address_line_1"]
    AddressLine1,
    #[iden = "address_line_2"]
    AddressLine2,
    City,
    StateProvince,
    PostalCode,
    BuildingCount,
    NumberProperties,
    UseDescription,
    YearBuilt,
    GrossFloorArea,
    ConditionedFloorArea,
    OccupiedFloorArea,
    RecentSaleDate,
    Owner,
    OwnerEmail,
    OwnerTelephone,
    PropertyNotes,
    YearEnding,
    EnergyScore,
    SiteEui,
    SourceEui,
    SiteEuiWeatherNormalized,
    SourceEuiWeatherNormalized,
    GenerationDate,
    ReleaseDate,
    EnergyAlerts,
    SpaceAlerts,
    BuildingCertification,
    ExtraData,
    CreatedAt,
}

#[derive(Iden)]
enum InventoryViews {
    Table,
    Id,
    InventoryId,
    CycleId,
    StateId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum InventoryAuditLogs {
    Table,
    Id,
    OrganizationId,
    StateId,
    ViewId,
    #[iden = "parent1_id"]
    Parent1Id,
    #[iden = "parent2_id"]
    Parent2Id,
    Name,
    Description,
    ImportFilename,
    RecordType,
    CreatedAt,
}

#[derive(Iden)]
enum Organizations {
    Table,
    Id,
}

#[derive(Iden)]
enum Cycles {
    Table,
    Id,
}

#[derive(Iden)]
enum ImportFiles {
    Table,
    Id,
}
