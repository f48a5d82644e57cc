use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organizations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organizations::Name).string().not_null())
                    .col(
                        ColumnDef::new(Organizations::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrganizationUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrganizationUsers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OrganizationUsers::OrganizationId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrganizationUsers::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(OrganizationUsers::Role)
                            .string()
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        ColumnDef::new(OrganizationUsers::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_organization_users_organization_id")
                            .from(OrganizationUsers::Table, OrganizationUsers::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_organization_users_user_id")
                            .from(OrganizationUsers::Table, OrganizationUsers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_organization_users_unique")
                    .table(OrganizationUsers::Table)
                    .col(OrganizationUsers::OrganizationId)
                    .col(OrganizationUsers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Cycles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cycles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Cycles::OrganizationId).integer().not_null())
                    .col(ColumnDef::new(Cycles::Name).string().not_null())
                    .col(ColumnDef::new(Cycles::StartDate).date().not_null())
                    .col(ColumnDef::new(Cycles::EndDate).date().not_null())
                    .col(ColumnDef::new(Cycles::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cycles_organization_id")
                            .from(Cycles::Table, Cycles::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ImportFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ImportFiles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ImportFiles::OrganizationId).integer().not_null())
                    .col(ColumnDef::new(ImportFiles::Filename).string().not_null())
                    .col(ColumnDef::new(ImportFiles::SourceType).string().not_null())
                    .col(ColumnDef::new(ImportFiles::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_import_files_organization_id")
                            .from(ImportFiles::Table, ImportFiles::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ImportFiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cycles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrganizationUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Organizations {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    CreatedAt,
}

#[derive(Iden)]
enum OrganizationUsers {
    Table,
    Id,
    OrganizationId,
    UserId,
    Role,
    CreatedAt,
}

#[derive(Iden)]
enum Cycles {
    Table,
    Id,
    OrganizationId,
    Name,
    StartDate,
    EndDate,
    CreatedAt,
}

#[derive(Iden)]
enum ImportFiles {
    Table,
    Id,
    OrganizationId,
    Filename,
    SourceType,
    CreatedAt,
}
