#![allow(dead_code)]

use sea_orm::{Database, DatabaseConnection};

use engine::{
    Engine, ModuleConfig, ModuleKind, MoneyCents, MovementCmd, NewProduct, NewUser, Product,
    Shop, User,
};
use migration::MigratorTrait;

pub async fn database() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = database().await;
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// An engine with a president, who holds every human-usable permission.
pub async fn engine_with_president() -> (Engine, User) {
    let (engine, _db) = engine_with_db().await;
    let president = engine
        .bootstrap_president(NewUser::new("pres", "secret", "Ada", "Lovelace"))
        .await
        .unwrap();
    (engine, president)
}

pub async fn member(engine: &Engine, operator: &User, username: &str) -> User {
    engine
        .create_user(
            operator.id,
            NewUser::new(username, "secret", username, "Member"),
        )
        .await
        .unwrap()
}

pub async fn external(engine: &Engine, operator: &User, username: &str) -> User {
    engine
        .create_user(
            operator.id,
            NewUser::new(username, "secret", username, "External").external(true),
        )
        .await
        .unwrap()
}

pub async fn fund(engine: &Engine, operator: &User, user: &User, cents: i64) {
    engine
        .record_exceptional_movement(MovementCmd::new(
            operator.id,
            user.id,
            MoneyCents::new(cents),
            "top up",
        ))
        .await
        .unwrap();
}

/// A shop with both modules enabled and a stocked product at `price` cents.
pub async fn shop_with_product(engine: &Engine, operator: &User, price: i64) -> (Shop, Product) {
    let shop = engine
        .create_shop(operator.id, "bar", "The bar", "#ff0000")
        .await
        .unwrap();
    for kind in ModuleKind::ALL {
        engine
            .configure_module(
                operator.id,
                shop.id,
                kind,
                ModuleConfig {
                    enabled: true,
                    ..ModuleConfig::default()
                },
            )
            .await
            .unwrap();
    }
    let product = engine
        .create_product(
            operator.id,
            NewProduct::new(shop.id, "Beer", MoneyCents::new(price)).stock(1_000),
        )
        .await
        .unwrap();
    (shop, product)
}
