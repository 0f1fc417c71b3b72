use sea_orm::{
    ActiveValue, DatabaseTransaction, IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};

use crate::{
    Capability, EngineError, ModuleConfig, ModuleKind, NewProduct, Product, ProductUpdate,
    ReservedGroup, ResultEngine, Shop, group_permissions, groups, manage_group_codename,
    permissions, products, sale_modules, shops,
};

use super::{Engine, normalize_required_text, with_tx};

impl Engine {
    /// Creates a shop with its chiefs and associates groups and its two
    /// sale modules, both disabled.
    ///
    /// The chiefs group receives the default chiefs permissions and the
    /// right to manage the associates. Presidents receive the right to
    /// manage the chiefs.
    pub async fn create_shop(
        &self,
        operator_id: i64,
        name: &str,
        description: &str,
        color: &str,
    ) -> ResultEngine<Shop> {
        let name = normalize_required_text(name, "shop name")?;
        if !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return Err(EngineError::InvalidInput(format!(
                "shop name must be lowercase letters and digits: {name}"
            )));
        }
        let shop: Shop = with_tx!(self, |db_tx| {
            self.require(&db_tx, operator_id, Capability::AddShop).await?;
            self.insert_shop(&db_tx, &name, description.trim(), color.trim())
                .await
        })?;
        tracing::info!(shop_id = shop.id, name = %shop.name, operator_id, "shop created");
        Ok(shop)
    }

    pub async fn shop(&self, shop_id: i64) -> ResultEngine<Shop> {
        shops::Entity::find_by_id(shop_id)
            .one(&self.database)
            .await?
            .map(Shop::from)
            .ok_or_else(|| EngineError::KeyNotFound("shop not exists".to_string()))
    }

    pub async fn shops(&self) -> ResultEngine<Vec<Shop>> {
        Ok(shops::Entity::find()
            .order_by_asc(shops::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Shop::from)
            .collect())
    }

    pub async fn create_product(&self, operator_id: i64, new_product: NewProduct) -> ResultEngine<Product> {
        let name = normalize_required_text(&new_product.name, "product name")?;
        check_pricing(
            new_product.is_manual,
            new_product.manual_price.map(|price| price.cents()),
            new_product.base_price.cents(),
            new_product.correcting_factor,
        )?;
        let product: Product = with_tx!(self, |db_tx| {
            self.require_in_shop(&db_tx, operator_id, new_product.shop_id, Capability::AddProduct)
                .await?;
            let model = products::ActiveModel {
                id: ActiveValue::NotSet,
                shop_id: ActiveValue::Set(new_product.shop_id),
                name: ActiveValue::Set(name),
                unit: ActiveValue::Set(new_product.unit.as_str().to_string()),
                is_manual: ActiveValue::Set(new_product.is_manual),
                manual_price: ActiveValue::Set(new_product.manual_price.map(|price| price.cents())),
                base_price: ActiveValue::Set(new_product.base_price.cents()),
                correcting_factor: ActiveValue::Set(new_product.correcting_factor),
                stock: ActiveValue::Set(new_product.stock),
                is_active: ActiveValue::Set(true),
                is_removed: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;
            Product::try_from(model)
        })?;
        tracing::info!(product_id = product.id, shop_id = product.shop_id, "product created");
        Ok(product)
    }

    /// Changes price mode, prices, stock or state of a product.
    pub async fn update_product(
        &self,
        operator_id: i64,
        product_id: i64,
        update: ProductUpdate,
    ) -> ResultEngine<Product> {
        with_tx!(self, |db_tx| {
            let model = require_product(&db_tx, product_id).await?;
            self.require_in_shop(&db_tx, operator_id, model.shop_id, Capability::ChangeProduct)
                .await?;
            if model.is_removed {
                return Err(EngineError::InvalidProduct(format!(
                    "{} was removed",
                    model.name
                )));
            }

            let is_manual = update.is_manual.unwrap_or(model.is_manual);
            let manual_price = update
                .manual_price
                .map(|price| price.cents())
                .or(model.manual_price);
            let base_price = update.base_price.map_or(model.base_price, |price| price.cents());
            let correcting_factor = update.correcting_factor.unwrap_or(model.correcting_factor);
            check_pricing(is_manual, manual_price, base_price, correcting_factor)?;

            let mut active = model.clone().into_active_model();
            if let Some(name) = update.name.as_deref() {
                active.name = ActiveValue::Set(normalize_required_text(name, "product name")?);
            }
            active.is_manual = ActiveValue::Set(is_manual);
            active.manual_price = ActiveValue::Set(manual_price);
            active.base_price = ActiveValue::Set(base_price);
            active.correcting_factor = ActiveValue::Set(correcting_factor);
            if let Some(stock) = update.stock {
                active.stock = ActiveValue::Set(stock);
            }
            if let Some(is_active) = update.is_active {
                active.is_active = ActiveValue::Set(is_active);
            }
            Product::try_from(active.update(&db_tx).await?)
        })
    }

    /// Soft removal: the product stays referenced by past sales.
    pub async fn remove_product(&self, operator_id: i64, product_id: i64) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = require_product(&db_tx, product_id).await?;
            self.require_in_shop(&db_tx, operator_id, model.shop_id, Capability::ChangeProduct)
                .await?;
            let mut active = model.into_active_model();
            active.is_active = ActiveValue::Set(false);
            active.is_removed = ActiveValue::Set(true);
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Products of a shop that were not removed.
    pub async fn products(&self, shop_id: i64) -> ResultEngine<Vec<Product>> {
        products::Entity::find()
            .filter(products::Column::ShopId.eq(shop_id))
            .filter(products::Column::IsRemoved.eq(false))
            .order_by_asc(products::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    pub async fn module_config(&self, shop_id: i64, kind: ModuleKind) -> ResultEngine<ModuleConfig> {
        sale_modules::Entity::find_by_id((shop_id, kind.as_str().to_string()))
            .one(&self.database)
            .await?
            .map(|model| ModuleConfig::from(&model))
            .ok_or_else(|| EngineError::KeyNotFound("sale module not exists".to_string()))
    }

    /// Enables or disables a sale module and sets its limits. A zero
    /// purchase limit means no limit.
    pub async fn configure_module(
        &self,
        operator_id: i64,
        shop_id: i64,
        kind: ModuleKind,
        config: ModuleConfig,
    ) -> ResultEngine<ModuleConfig> {
        if config.limit_purchase.is_some_and(|limit| limit.is_negative()) {
            return Err(EngineError::InvalidAmount(
                "purchase limit must be >= 0".to_string(),
            ));
        }
        if config.delay_post_purchase.is_some_and(|delay| delay < 0) {
            return Err(EngineError::InvalidInput(
                "post purchase delay must be >= 0".to_string(),
            ));
        }
        let config: ModuleConfig = with_tx!(self, |db_tx| {
            self.require_in_shop(&db_tx, operator_id, shop_id, Capability::ChangeShop)
                .await?;
            let mut active = sale_modules::Entity::find_by_id((shop_id, kind.as_str().to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("sale module not exists".to_string()))?
                .into_active_model();
            active.enabled = ActiveValue::Set(config.enabled);
            active.limit_purchase = ActiveValue::Set(config.limit_purchase.map(|limit| limit.cents()));
            active.logout_post_purchase = ActiveValue::Set(config.logout_post_purchase);
            active.delay_post_purchase = ActiveValue::Set(config.delay_post_purchase);
            let model = active.update(&db_tx).await?;
            Ok::<_, EngineError>(ModuleConfig::from(&model))
        })?;
        tracing::info!(shop_id, module = kind.as_str(), enabled = config.enabled, "sale module configured");
        Ok(config)
    }

    async fn insert_shop(
        &self,
        db_tx: &DatabaseTransaction,
        name: &str,
        description: &str,
        color: &str,
    ) -> ResultEngine<Shop> {
        let exists = shops::Entity::find()
            .filter(shops::Column::Name.eq(name))
            .one(db_tx)
            .await?
            .is_some();
        if exists {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        let shop = shops::ActiveModel {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(name.to_string()),
            description: ActiveValue::Set(description.to_string()),
            color: ActiveValue::Set(color.to_string()),
        }
        .insert(db_tx)
        .await?;

        let chiefs = insert_group(db_tx, &groups::chiefs_group_name(name)).await?;
        let associates = insert_group(db_tx, &groups::associates_group_name(name)).await?;
        let manage_chiefs = insert_manage_permission(db_tx, &chiefs.name).await?;
        let manage_associates = insert_manage_permission(db_tx, &associates.name).await?;

        let defaults: Vec<&str> = Capability::DEFAULT_CHIEFS
            .iter()
            .map(|capability| capability.codename())
            .collect();
        let default_ids: Vec<i64> = permissions::Entity::find()
            .filter(permissions::Column::Codename.is_in(defaults.clone()))
            .all(db_tx)
            .await?
            .into_iter()
            .map(|permission| permission.id)
            .collect();
        if default_ids.len() != defaults.len() {
            return Err(EngineError::KeyNotFound(
                "default chiefs permissions are not all seeded".to_string(),
            ));
        }
        for permission_id in default_ids.into_iter().chain([manage_associates]) {
            grant(db_tx, chiefs.id, permission_id).await?;
        }
        grant(db_tx, self.registry.id(ReservedGroup::Presidents), manage_chiefs).await?;

        for kind in ModuleKind::ALL {
            sale_modules::Entity::insert(sale_modules::ActiveModel {
                shop_id: ActiveValue::Set(shop.id),
                kind: ActiveValue::Set(kind.as_str().to_string()),
                enabled: ActiveValue::Set(false),
                limit_purchase: ActiveValue::Set(None),
                logout_post_purchase: ActiveValue::Set(false),
                delay_post_purchase: ActiveValue::Set(None),
            })
            .exec_without_returning(db_tx)
            .await?;
        }

        Ok(Shop::from(shop))
    }
}

/// Prices must not be negative, a manual product needs a manual price.
fn check_pricing(
    is_manual: bool,
    manual_price: Option<i64>,
    base_price: i64,
    correcting_factor: i64,
) -> ResultEngine<()> {
    if base_price < 0 || manual_price.is_some_and(|price| price < 0) {
        return Err(EngineError::InvalidAmount(
            "prices must be >= 0".to_string(),
        ));
    }
    if correcting_factor < 0 {
        return Err(EngineError::InvalidAmount(
            "correcting factor must be >= 0".to_string(),
        ));
    }
    if is_manual && manual_price.is_none() {
        return Err(EngineError::InvalidAmount(
            "a manual price is required".to_string(),
        ));
    }
    Ok(())
}

async fn require_product(db_tx: &DatabaseTransaction, product_id: i64) -> ResultEngine<products::Model> {
    products::Entity::find_by_id(product_id)
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("product not exists".to_string()))
}

async fn insert_group(db_tx: &DatabaseTransaction, name: &str) -> ResultEngine<groups::Model> {
    let exists = groups::Entity::find()
        .filter(groups::Column::Name.eq(name))
        .one(db_tx)
        .await?
        .is_some();
    if exists {
        return Err(EngineError::ExistingKey(name.to_string()));
    }
    groups::ActiveModel {
        id: ActiveValue::NotSet,
        name: ActiveValue::Set(name.to_string()),
    }
    .insert(db_tx)
    .await
    .map_err(Into::into)
}

async fn insert_manage_permission(db_tx: &DatabaseTransaction, group_name: &str) -> ResultEngine<i64> {
    let model = permissions::ActiveModel {
        id: ActiveValue::NotSet,
        codename: ActiveValue::Set(manage_group_codename(group_name)),
        name: ActiveValue::Set(format!("Manage the {group_name} group")),
        human_usable: ActiveValue::Set(true),
    }
    .insert(db_tx)
    .await?;
    Ok(model.id)
}

async fn grant(db_tx: &DatabaseTransaction, group_id: i64, permission_id: i64) -> ResultEngine<()> {
    group_permissions::Entity::insert(group_permissions::ActiveModel {
        group_id: ActiveValue::Set(group_id),
        permission_id: ActiveValue::Set(permission_id),
    })
    .exec_without_returning(db_tx)
    .await?;
    Ok(())
}
