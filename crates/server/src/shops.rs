use api_types::shop::{
    ModuleConfig, ProductNew, ProductUpdate, ProductView, ShopNew, ShopView, Unit,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{ModuleKind, MoneyCents, NewProduct, Product, Shop, User};

use crate::{ServerError, server::ServerState};

fn shop_view(shop: Shop) -> ShopView {
    ShopView {
        id: shop.id,
        name: shop.name,
        description: shop.description,
        color: shop.color,
    }
}

fn unit(unit: Unit) -> engine::Unit {
    match unit {
        Unit::Unit => engine::Unit::Unit,
        Unit::Centiliter => engine::Unit::Centiliter,
        Unit::Gram => engine::Unit::Gram,
    }
}

fn product_view(product: Product) -> Result<ProductView, ServerError> {
    let price = product.unit_price()?;

    Ok(ProductView {
        id: product.id,
        shop_id: product.shop_id,
        name: product.name,
        unit: match product.unit {
            engine::Unit::Unit => Unit::Unit,
            engine::Unit::Centiliter => Unit::Centiliter,
            engine::Unit::Gram => Unit::Gram,
        },
        is_manual: product.is_manual,
        manual_price_minor: product.manual_price.map(MoneyCents::cents),
        base_price_minor: product.base_price.cents(),
        correcting_factor: product.correcting_factor,
        price_minor: price.cents(),
        stock: product.stock,
        is_active: product.is_active,
    })
}

pub async fn list(State(state): State<ServerState>) -> Result<Json<Vec<ShopView>>, ServerError> {
    let shops = state.engine.shops().await?;

    Ok(Json(shops.into_iter().map(shop_view).collect()))
}

/// Creates the shop, its two sale modules and its chiefs/associates groups.
pub async fn shop_new(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ShopNew>,
) -> Result<(StatusCode, Json<ShopView>), ServerError> {
    let shop = state
        .engine
        .create_shop(
            operator.id,
            &payload.name,
            &payload.description,
            &payload.color,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(shop_view(shop))))
}

pub async fn products(
    State(state): State<ServerState>,
    Path(shop_id): Path<i64>,
) -> Result<Json<Vec<ProductView>>, ServerError> {
    state.engine.shop(shop_id).await?;
    let products = state
        .engine
        .products(shop_id)
        .await?
        .into_iter()
        .map(product_view)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(products))
}

pub async fn product_new(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Path(shop_id): Path<i64>,
    Json(payload): Json<ProductNew>,
) -> Result<(StatusCode, Json<ProductView>), ServerError> {
    let mut new_product = NewProduct::new(
        shop_id,
        payload.name,
        MoneyCents::new(payload.base_price_minor),
    )
    .unit(unit(payload.unit))
    .stock(payload.stock);
    if let Some(price) = payload.manual_price_minor {
        new_product = new_product.manual_price(MoneyCents::new(price));
    }
    if let Some(factor) = payload.correcting_factor {
        new_product = new_product.correcting_factor(factor);
    }
    let product = state
        .engine
        .create_product(operator.id, new_product)
        .await?;

    Ok((StatusCode::CREATED, Json(product_view(product)?)))
}

pub async fn product_update(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductUpdate>,
) -> Result<Json<ProductView>, ServerError> {
    let update = engine::ProductUpdate {
        name: payload.name,
        is_manual: payload.is_manual,
        manual_price: payload.manual_price_minor.map(MoneyCents::new),
        base_price: payload.base_price_minor.map(MoneyCents::new),
        correcting_factor: payload.correcting_factor,
        stock: payload.stock,
        is_active: payload.is_active,
    };
    let product = state.engine.update_product(operator.id, id, update).await?;

    Ok(Json(product_view(product)?))
}

pub async fn product_remove(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    state.engine.remove_product(operator.id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn module_view(config: engine::ModuleConfig) -> ModuleConfig {
    ModuleConfig {
        enabled: config.enabled,
        limit_purchase_minor: config.limit_purchase.map(MoneyCents::cents),
        logout_post_purchase: config.logout_post_purchase,
        delay_post_purchase: config.delay_post_purchase,
    }
}

pub async fn module(
    State(state): State<ServerState>,
    Path((shop_id, kind)): Path<(i64, String)>,
) -> Result<Json<ModuleConfig>, ServerError> {
    let kind = ModuleKind::try_from(kind.as_str())?;
    let config = state.engine.module_config(shop_id, kind).await?;

    Ok(Json(module_view(config)))
}

pub async fn configure_module(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Path((shop_id, kind)): Path<(i64, String)>,
    Json(payload): Json<ModuleConfig>,
) -> Result<Json<ModuleConfig>, ServerError> {
    let kind = ModuleKind::try_from(kind.as_str())?;
    let config = engine::ModuleConfig {
        enabled: payload.enabled,
        limit_purchase: payload.limit_purchase_minor.map(MoneyCents::new),
        logout_post_purchase: payload.logout_post_purchase,
        delay_post_purchase: payload.delay_post_purchase,
    };
    let config = state
        .engine
        .configure_module(operator.id, shop_id, kind, config)
        .await?;

    Ok(Json(module_view(config)))
}
