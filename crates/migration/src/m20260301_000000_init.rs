//! Initial schema migration - creates all tables from scratch.
//!
//! - `users`: accounts with their balance
//! - `groups`, `permissions`, `user_groups`, `group_permissions`: capability model
//! - `shops`, `products`, `sale_modules`: catalog
//! - `sales`, `sale_products`, `transferts`, `exceptionnal_movements`: audit records
//! - `ledger_entries`: one row per balance adjustment
//! - `shared_events`, `shared_event_participants`: expenses split later

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    Password,
    FirstName,
    LastName,
    Surname,
    Family,
    Email,
    Phone,
    Campus,
    Year,
    Theme,
    Balance,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum Groups {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
enum Permissions {
    Table,
    Id,
    Codename,
    Name,
    HumanUsable,
}

#[derive(Iden)]
enum UserGroups {
    Table,
    UserId,
    GroupId,
}

#[derive(Iden)]
enum GroupPermissions {
    Table,
    GroupId,
    PermissionId,
}

#[derive(Iden)]
enum Shops {
    Table,
    Id,
    Name,
    Description,
    Color,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
    ShopId,
    Name,
    Unit,
    IsManual,
    ManualPrice,
    BasePrice,
    CorrectingFactor,
    Stock,
    IsActive,
    IsRemoved,
}

#[derive(Iden)]
enum SaleModules {
    Table,
    ShopId,
    Kind,
    Enabled,
    LimitPurchase,
    LogoutPostPurchase,
    DelayPostPurchase,
}

#[derive(Iden)]
enum Sales {
    Table,
    Id,
    ShopId,
    Module,
    OperatorId,
    SenderId,
    Amount,
    CreatedAt,
}

#[derive(Iden)]
enum SaleProducts {
    Table,
    Id,
    SaleId,
    ProductId,
    Quantity,
    UnitPrice,
    Price,
}

#[derive(Iden)]
enum Transferts {
    Table,
    Id,
    OperatorId,
    SenderId,
    RecipientId,
    Amount,
    Justification,
    CreatedAt,
}

#[derive(Iden)]
enum ExceptionnalMovements {
    Table,
    Id,
    OperatorId,
    RecipientId,
    Amount,
    Justification,
    CreatedAt,
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    Id,
    UserId,
    Delta,
    BalanceAfter,
    Reason,
    ReferenceId,
    CreatedAt,
}

#[derive(Iden)]
enum SharedEvents {
    Table,
    Id,
    Description,
    ManagerId,
    Date,
    Price,
    Done,
}

#[derive(Iden)]
enum SharedEventParticipants {
    Table,
    EventId,
    UserId,
    Weight,
}

fn id_column<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(id_column(Users::Id))
                    .col(ColumnDef::new(Users::Username).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::FirstName).string().not_null())
                    .col(ColumnDef::new(Users::LastName).string().not_null())
                    .col(ColumnDef::new(Users::Surname).string())
                    .col(ColumnDef::new(Users::Family).string())
                    .col(ColumnDef::new(Users::Email).string())
                    .col(ColumnDef::new(Users::Phone).string())
                    .col(ColumnDef::new(Users::Campus).string())
                    .col(ColumnDef::new(Users::Year).integer())
                    .col(ColumnDef::new(Users::Theme).string())
                    .col(
                        ColumnDef::new(Users::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Groups and permissions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(id_column(Groups::Id))
                    .col(ColumnDef::new(Groups::Name).string().not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Permissions::Table)
                    .if_not_exists()
                    .col(id_column(Permissions::Id))
                    .col(
                        ColumnDef::new(Permissions::Codename)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Permissions::Name).string().not_null())
                    .col(
                        ColumnDef::new(Permissions::HumanUsable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserGroups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserGroups::UserId).integer().not_null())
                    .col(ColumnDef::new(UserGroups::GroupId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(UserGroups::UserId)
                            .col(UserGroups::GroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_groups-user_id")
                            .from(UserGroups::Table, UserGroups::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_groups-group_id")
                            .from(UserGroups::Table, UserGroups::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-user_groups-group_id")
                    .table(UserGroups::Table)
                    .col(UserGroups::GroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupPermissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupPermissions::GroupId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupPermissions::PermissionId)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(GroupPermissions::GroupId)
                            .col(GroupPermissions::PermissionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_permissions-group_id")
                            .from(GroupPermissions::Table, GroupPermissions::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_permissions-permission_id")
                            .from(GroupPermissions::Table, GroupPermissions::PermissionId)
                            .to(Permissions::Table, Permissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Catalog
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Shops::Table)
                    .if_not_exists()
                    .col(id_column(Shops::Id))
                    .col(ColumnDef::new(Shops::Name).string().not_null().unique_key())
                    .col(
                        ColumnDef::new(Shops::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Shops::Color)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(id_column(Products::Id))
                    .col(ColumnDef::new(Products::ShopId).integer().not_null())
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(
                        ColumnDef::new(Products::Unit)
                            .string()
                            .not_null()
                            .default("unit"),
                    )
                    .col(
                        ColumnDef::new(Products::IsManual)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Products::ManualPrice).big_integer())
                    .col(
                        ColumnDef::new(Products::BasePrice)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::CorrectingFactor)
                            .big_integer()
                            .not_null()
                            .default(1000),
                    )
                    .col(
                        ColumnDef::new(Products::Stock)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Products::IsRemoved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-products-shop_id")
                            .from(Products::Table, Products::ShopId)
                            .to(Shops::Table, Shops::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-products-shop_id")
                    .table(Products::Table)
                    .col(Products::ShopId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleModules::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SaleModules::ShopId).integer().not_null())
                    .col(ColumnDef::new(SaleModules::Kind).string().not_null())
                    .col(
                        ColumnDef::new(SaleModules::Enabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SaleModules::LimitPurchase).big_integer())
                    .col(
                        ColumnDef::new(SaleModules::LogoutPostPurchase)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SaleModules::DelayPostPurchase).big_integer())
                    .primary_key(
                        Index::create()
                            .col(SaleModules::ShopId)
                            .col(SaleModules::Kind),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_modules-shop_id")
                            .from(SaleModules::Table, SaleModules::ShopId)
                            .to(Shops::Table, Shops::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Audit records
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(id_column(Sales::Id))
                    .col(ColumnDef::new(Sales::ShopId).integer().not_null())
                    .col(ColumnDef::new(Sales::Module).string().not_null())
                    .col(ColumnDef::new(Sales::OperatorId).integer().not_null())
                    .col(ColumnDef::new(Sales::SenderId).integer().not_null())
                    .col(ColumnDef::new(Sales::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Sales::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sales-shop_id")
                            .from(Sales::Table, Sales::ShopId)
                            .to(Shops::Table, Shops::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sales-sender_id")
                            .from(Sales::Table, Sales::SenderId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleProducts::Table)
                    .if_not_exists()
                    .col(id_column(SaleProducts::Id))
                    .col(ColumnDef::new(SaleProducts::SaleId).integer().not_null())
                    .col(ColumnDef::new(SaleProducts::ProductId).integer().not_null())
                    .col(
                        ColumnDef::new(SaleProducts::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SaleProducts::UnitPrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SaleProducts::Price).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_products-sale_id")
                            .from(SaleProducts::Table, SaleProducts::SaleId)
                            .to(Sales::Table, Sales::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_products-product_id")
                            .from(SaleProducts::Table, SaleProducts::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sale_products-sale_id")
                    .table(SaleProducts::Table)
                    .col(SaleProducts::SaleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transferts::Table)
                    .if_not_exists()
                    .col(id_column(Transferts::Id))
                    .col(ColumnDef::new(Transferts::OperatorId).integer().not_null())
                    .col(ColumnDef::new(Transferts::SenderId).integer().not_null())
                    .col(ColumnDef::new(Transferts::RecipientId).integer().not_null())
                    .col(ColumnDef::new(Transferts::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Transferts::Justification).string())
                    .col(
                        ColumnDef::new(Transferts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transferts-sender_id")
                            .from(Transferts::Table, Transferts::SenderId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transferts-recipient_id")
                            .from(Transferts::Table, Transferts::RecipientId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExceptionnalMovements::Table)
                    .if_not_exists()
                    .col(id_column(ExceptionnalMovements::Id))
                    .col(
                        ColumnDef::new(ExceptionnalMovements::OperatorId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExceptionnalMovements::RecipientId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExceptionnalMovements::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExceptionnalMovements::Justification)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExceptionnalMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-exceptionnal_movements-recipient_id")
                            .from(
                                ExceptionnalMovements::Table,
                                ExceptionnalMovements::RecipientId,
                            )
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(id_column(LedgerEntries::Id))
                    .col(ColumnDef::new(LedgerEntries::UserId).integer().not_null())
                    .col(ColumnDef::new(LedgerEntries::Delta).big_integer().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::Reason).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::ReferenceId).integer())
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-user_id")
                            .from(LedgerEntries::Table, LedgerEntries::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-user_id")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Shared events
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SharedEvents::Table)
                    .if_not_exists()
                    .col(id_column(SharedEvents::Id))
                    .col(ColumnDef::new(SharedEvents::Description).string().not_null())
                    .col(ColumnDef::new(SharedEvents::ManagerId).integer().not_null())
                    .col(
                        ColumnDef::new(SharedEvents::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SharedEvents::Price).big_integer())
                    .col(
                        ColumnDef::new(SharedEvents::Done)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-shared_events-manager_id")
                            .from(SharedEvents::Table, SharedEvents::ManagerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SharedEventParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SharedEventParticipants::EventId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SharedEventParticipants::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SharedEventParticipants::Weight)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .primary_key(
                        Index::create()
                            .col(SharedEventParticipants::EventId)
                            .col(SharedEventParticipants::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-shared_event_participants-event_id")
                            .from(
                                SharedEventParticipants::Table,
                                SharedEventParticipants::EventId,
                            )
                            .to(SharedEvents::Table, SharedEvents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-shared_event_participants-user_id")
                            .from(
                                SharedEventParticipants::Table,
                                SharedEventParticipants::UserId,
                            )
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        for table in [
            SharedEventParticipants::Table.into_iden(),
            SharedEvents::Table.into_iden(),
            LedgerEntries::Table.into_iden(),
            ExceptionnalMovements::Table.into_iden(),
            Transferts::Table.into_iden(),
            SaleProducts::Table.into_iden(),
            Sales::Table.into_iden(),
            SaleModules::Table.into_iden(),
            Products::Table.into_iden(),
            Shops::Table.into_iden(),
            GroupPermissions::Table.into_iden(),
            UserGroups::Table.into_iden(),
            Permissions::Table.into_iden(),
            Groups::Table.into_iden(),
            Users::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}
