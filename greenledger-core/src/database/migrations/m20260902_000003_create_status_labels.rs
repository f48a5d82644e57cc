use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StatusLabels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StatusLabels::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StatusLabels::OrganizationId).integer().not_null())
                    .col(ColumnDef::new(StatusLabels::Name).string().not_null())
                    .col(
                        ColumnDef::new(StatusLabels::Color)
                            .string()
                            .not_null()
                            .default("green"),
                    )
                    .col(ColumnDef::new(StatusLabels::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_status_labels_organization_id")
                            .from(StatusLabels::Table, StatusLabels::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_status_labels_name_organization")
                    .table(StatusLabels::Table)
                    .col(StatusLabels::Name)
                    .col(StatusLabels::OrganizationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ViewLabels::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ViewLabels::ViewId).integer().not_null())
                    .col(ColumnDef::new(ViewLabels::LabelId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(ViewLabels::ViewId)
                            .col(ViewLabels::LabelId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_view_labels_view_id")
                            .from(ViewLabels::Table, ViewLabels::ViewId)
                            .to(InventoryViews::Table, InventoryViews::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_view_labels_label_id")
                            .from(ViewLabels::Table, ViewLabels::LabelId)
                            .to(StatusLabels::Table, StatusLabels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ViewLabels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StatusLabels::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum StatusLabels {
    Table,
    Id,
    OrganizationId,
    Name,
    Color,
    CreatedAt,
}

#[derive(Iden)]
enum ViewLabels {
    Table,
    ViewId,
    LabelId,
}

#[derive(Iden)]
enum Organizations {
    Table,
    Id,
}

#[derive(Iden)]
enum InventoryViews {
    Table,
    Id,
}
