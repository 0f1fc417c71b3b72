//! Seeds the reserved groups and the permission catalog.
//!
//! Presidents hold every human-usable permission. Members and specials can
//! buy through the self sale module, transfer and organize shared events.
//! Externals can only buy through the self sale module.

use sea_orm::{ConnectionTrait, DbBackend, Statement, Value};
use sea_orm_migration::{SchemaManagerConnection, prelude::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

const RESERVED_GROUPS: [&str; 4] = ["externals", "members", "specials", "presidents"];

/// `(codename, name, human_usable)`
const PERMISSIONS: [(&str, &str, bool); 21] = [
    ("add_user", "Add a user", true),
    ("view_user", "View users", true),
    ("change_user", "Change a user", true),
    ("delete_user", "Deactivate a user", true),
    ("use_selfsalemodule", "Use the self sale module", true),
    ("use_operatorsalemodule", "Use the operator sale module", true),
    ("add_transfert", "Add a transfert", true),
    ("add_exceptionnalmovement", "Add an exceptionnal movement", true),
    ("add_shop", "Add a shop", true),
    ("change_shop", "Change a shop", true),
    ("add_product", "Add a product", true),
    ("change_product", "Change a product", true),
    ("add_sharedevent", "Add a shared event", true),
    ("manage_sharedevent", "Manage shared events", true),
    ("view_sale", "View sales", true),
    ("change_sale", "Change a sale", false),
    ("delete_sale", "Delete a sale", false),
    ("change_transfert", "Change a transfert", false),
    ("delete_transfert", "Delete a transfert", false),
    ("change_exceptionnalmovement", "Change an exceptionnal movement", false),
    ("delete_exceptionnalmovement", "Delete an exceptionnal movement", false),
];

const EVERYDAY_GRANTS: [(&str, &str); 7] = [
    ("members", "use_selfsalemodule"),
    ("members", "add_transfert"),
    ("members", "add_sharedevent"),
    ("specials", "use_selfsalemodule"),
    ("specials", "add_transfert"),
    ("specials", "add_sharedevent"),
    ("externals", "use_selfsalemodule"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = db.get_database_backend();

        for group in RESERVED_GROUPS {
            insert_group(db, backend, group).await?;
        }

        for (codename, name, human_usable) in PERMISSIONS {
            insert_permission(db, backend, codename, name, human_usable).await?;
        }

        for group in RESERVED_GROUPS {
            insert_permission(
                db,
                backend,
                &format!("manage_{group}_group"),
                &format!("Manage the {group} group"),
                true,
            )
            .await?;
        }

        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO group_permissions (group_id, permission_id) \
             SELECT g.id, p.id FROM \"groups\" g, permissions p \
             WHERE g.name = ? AND p.human_usable = ?;",
            ["presidents".into(), Value::Bool(Some(true))],
        ))
        .await?;

        for (group, codename) in EVERYDAY_GRANTS {
            grant(db, backend, group, codename).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = db.get_database_backend();

        for sql in [
            "DELETE FROM group_permissions;",
            "DELETE FROM user_groups;",
            "DELETE FROM permissions;",
            "DELETE FROM \"groups\";",
        ] {
            db.execute(Statement::from_string(backend, sql)).await?;
        }
        Ok(())
    }
}

async fn insert_group(
    db: &SchemaManagerConnection<'_>,
    backend: DbBackend,
    name: &str,
) -> Result<(), DbErr> {
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO \"groups\" (name) VALUES (?);",
        [name.into()],
    ))
    .await?;
    Ok(())
}

async fn insert_permission(
    db: &SchemaManagerConnection<'_>,
    backend: DbBackend,
    codename: &str,
    name: &str,
    human_usable: bool,
) -> Result<(), DbErr> {
    let values = vec![
        codename.to_string().into(),
        name.to_string().into(),
        Value::Bool(Some(human_usable)),
    ];
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO permissions (codename, name, human_usable) VALUES (?, ?, ?);",
        values,
    ))
    .await?;
    Ok(())
}

async fn grant(
    db: &SchemaManagerConnection<'_>,
    backend: DbBackend,
    group: &str,
    codename: &str,
) -> Result<(), DbErr> {
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO group_permissions (group_id, permission_id) \
         SELECT g.id, p.id FROM \"groups\" g, permissions p \
         WHERE g.name = ? AND p.codename = ?;",
        [group.into(), codename.into()],
    ))
    .await?;
    Ok(())
}
