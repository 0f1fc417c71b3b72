use engine::{
    EngineError, ModuleConfig, ModuleKind, MoneyCents, NewProduct, ProductUpdate, SaleCmd, Unit,
};

mod common;

use common::{engine_with_president, fund, member, shop_with_product};

#[tokio::test]
async fn shop_starts_with_disabled_modules() {
    let (engine, president) = engine_with_president().await;
    let shop = engine
        .create_shop(president.id, "kfet", "Coffee corner", "#00ff00")
        .await
        .unwrap();

    for kind in ModuleKind::ALL {
        let config = engine.module_config(shop.id, kind).await.unwrap();
        assert!(!config.enabled);
    }
    assert_eq!(engine.shops().await.unwrap(), vec![shop.clone()]);
    assert_eq!(engine.shop(shop.id).await.unwrap().description, "Coffee corner");

    let err = engine
        .configure_module(
            president.id,
            shop.id,
            ModuleKind::SelfSale,
            ModuleConfig {
                limit_purchase: Some(MoneyCents::new(-1)),
                ..ModuleConfig::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn product_prices_follow_their_mode() {
    let (engine, president) = engine_with_president().await;
    let alice = member(&engine, &president, "alice").await;
    let (shop, _beer) = shop_with_product(&engine, &president, 100).await;
    fund(&engine, &president, &alice, 10_000).await;

    let wine = engine
        .create_product(
            president.id,
            NewProduct::new(shop.id, "Wine", MoneyCents::new(1_000))
                .unit(Unit::Centiliter)
                .correcting_factor(1_100)
                .stock(500),
        )
        .await
        .unwrap();
    assert_eq!(wine.unit_price().unwrap(), MoneyCents::new(1_100));

    let cake = engine
        .create_product(
            president.id,
            NewProduct::new(shop.id, "Cake", MoneyCents::new(500))
                .manual_price(MoneyCents::new(350))
                .stock(5),
        )
        .await
        .unwrap();
    assert_eq!(cake.unit_price().unwrap(), MoneyCents::new(350));

    let sale = engine
        .record_sale(
            SaleCmd::self_sale(alice.id, shop.id)
                .line(wine.id, 2)
                .line(cake.id, 1),
        )
        .await
        .unwrap();
    assert_eq!(sale.amount, MoneyCents::new(2_550));

    let err = engine
        .create_product(
            president.id,
            NewProduct::new(shop.id, "Free", MoneyCents::new(-5)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .create_product(alice.id, NewProduct::new(shop.id, "Tea", MoneyCents::new(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
}

#[tokio::test]
async fn removed_or_inactive_products_cannot_be_sold() {
    let (engine, president) = engine_with_president().await;
    let alice = member(&engine, &president, "alice").await;
    let (shop, beer) = shop_with_product(&engine, &president, 100).await;
    fund(&engine, &president, &alice, 1_000).await;

    engine
        .update_product(
            president.id,
            beer.id,
            ProductUpdate {
                is_active: Some(false),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap();
    let err = engine
        .record_sale(SaleCmd::self_sale(alice.id, shop.id).line(beer.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidProduct(_)));

    engine.remove_product(president.id, beer.id).await.unwrap();
    assert!(engine.products(shop.id).await.unwrap().is_empty());
    let err = engine
        .update_product(president.id, beer.id, ProductUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidProduct(_)));
    assert_eq!(engine.get_balance(alice.id).await.unwrap(), MoneyCents::new(1_000));
}
