use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    AdjustmentReason, Capability, EngineError, LedgerEvent, LineItem, MoneyCents, ModuleKind,
    Product, ResultEngine, Sale, SaleCmd, SaleLine, locks::LockKey, products, sale_modules,
    sale_products, sales, users,
};

use super::{Engine, with_tx};

impl Engine {
    /// Records a sale and debits the client.
    ///
    /// Everything is validated before the first write: an unknown client,
    /// an unsellable product or an insufficient balance leaves no trace.
    pub async fn record_sale(&self, cmd: SaleCmd) -> ResultEngine<Sale> {
        let lines = merge_lines(&cmd.lines)?;
        let client_id = self.resolve_client(&cmd).await?;

        let _locks = self.locks.acquire([LockKey::User(client_id)]).await?;
        let sale = self
            .commit_sale(&cmd, client_id, &lines)
            .await
            .inspect_err(|err| tracing::debug!(%err, shop_id = cmd.shop_id, "sale rejected"))?;

        tracing::info!(
            sale_id = sale.id,
            shop_id = sale.shop_id,
            client_id,
            amount = %sale.amount,
            module = sale.module.as_str(),
            "sale recorded"
        );
        self.publish(LedgerEvent::SaleCompleted {
            correlation_id: Uuid::new_v4(),
            sale_id: sale.id,
            shop_id: sale.shop_id,
            operator_id: sale.operator_id,
            client_id,
            amount: sale.amount,
        });
        Ok(sale)
    }

    /// A sale with its lines. Visible to its client, its operator and
    /// holders of `view_sale`.
    pub async fn sale(&self, requester_id: i64, sale_id: i64) -> ResultEngine<Sale> {
        let model = sales::Entity::find_by_id(sale_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("sale not exists".to_string()))?;
        if requester_id != model.sender_id && requester_id != model.operator_id {
            self.check(requester_id, Capability::ViewSale)
                .await?
                .into_result()?;
        }
        let lines = sale_products::Entity::find()
            .filter(sale_products::Column::SaleId.eq(sale_id))
            .order_by_asc(sale_products::Column::Id)
            .all(&self.database)
            .await?;
        Sale::try_from((model, lines))
    }

    async fn resolve_client(&self, cmd: &SaleCmd) -> ResultEngine<i64> {
        match cmd.module {
            ModuleKind::SelfSale => Ok(cmd.operator_id),
            ModuleKind::OperatorSale => {
                let username = cmd
                    .client
                    .as_deref()
                    .map(str::trim)
                    .filter(|username| !username.is_empty())
                    .ok_or(EngineError::NoClientSelected)?;
                users::Entity::find()
                    .filter(users::Column::Username.eq(username))
                    .one(&self.database)
                    .await?
                    .map(|user| user.id)
                    .ok_or_else(|| EngineError::UserNotFound(username.to_string()))
            }
        }
    }

    async fn commit_sale(
        &self,
        cmd: &SaleCmd,
        client_id: i64,
        lines: &[LineItem],
    ) -> ResultEngine<Sale> {
        with_tx!(self, |db_tx| {
            let module = sale_modules::Entity::find_by_id((cmd.shop_id, cmd.module.as_str().to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("sale module not exists".to_string()))?;
            if !module.enabled {
                return Err(EngineError::ModuleDisabled(format!(
                    "{} of shop {}",
                    cmd.module.as_str(),
                    cmd.shop_id
                )));
            }
            self.require_in_shop(&db_tx, cmd.operator_id, cmd.shop_id, cmd.module.capability())
                .await?;
            let client = self.require_active_user(&db_tx, client_id).await?;

            let mut priced = Vec::with_capacity(lines.len());
            let mut total = MoneyCents::ZERO;
            for line in lines {
                let model = products::Entity::find_by_id(line.product_id)
                    .filter(products::Column::ShopId.eq(cmd.shop_id))
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| {
                        EngineError::InvalidProduct(format!(
                            "product {} is not sold by shop {}",
                            line.product_id, cmd.shop_id
                        ))
                    })?;
                let unit_price = Product::try_from(model)?.ensure_sellable()?;
                let price = unit_price
                    .checked_mul(line.quantity)
                    .ok_or_else(super::overflow)?;
                total = total.checked_add(price).ok_or_else(super::overflow)?;
                priced.push(SaleLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price,
                    price,
                });
            }

            check_order(
                total,
                MoneyCents::new(client.balance),
                module.limit_purchase.map(MoneyCents::new),
            )?;

            let created_at = Utc::now();
            let sale = sales::ActiveModel {
                id: ActiveValue::NotSet,
                shop_id: ActiveValue::Set(cmd.shop_id),
                module: ActiveValue::Set(cmd.module.as_str().to_string()),
                operator_id: ActiveValue::Set(cmd.operator_id),
                sender_id: ActiveValue::Set(client.id),
                amount: ActiveValue::Set(total.cents()),
                created_at: ActiveValue::Set(created_at),
            }
            .insert(&db_tx)
            .await?;

            for line in &priced {
                sale_products::ActiveModel {
                    id: ActiveValue::NotSet,
                    sale_id: ActiveValue::Set(sale.id),
                    product_id: ActiveValue::Set(line.product_id),
                    quantity: ActiveValue::Set(line.quantity),
                    unit_price: ActiveValue::Set(line.unit_price.cents()),
                    price: ActiveValue::Set(line.price.cents()),
                }
                .insert(&db_tx)
                .await?;

                products::Entity::update_many()
                    .col_expr(
                        products::Column::Stock,
                        Expr::col(products::Column::Stock).sub(line.quantity),
                    )
                    .filter(products::Column::Id.eq(line.product_id))
                    .exec(&db_tx)
                    .await?;
            }

            self.apply_adjustment(
                &db_tx,
                client.id,
                -total,
                AdjustmentReason::Sale,
                Some(sale.id),
                Some(MoneyCents::ZERO),
            )
            .await
            .map_err(funds_to_credit)?;

            Ok(Sale {
                id: sale.id,
                shop_id: sale.shop_id,
                module: cmd.module,
                operator_id: sale.operator_id,
                sender_id: sale.sender_id,
                amount: total,
                created_at,
                lines: priced,
            })
        })
    }
}

/// Rejects quantities below zero, drops zero quantities and merges lines
/// referencing the same product.
fn merge_lines(lines: &[LineItem]) -> ResultEngine<Vec<LineItem>> {
    let mut merged: BTreeMap<i64, i64> = BTreeMap::new();
    for line in lines {
        if line.quantity < 0 {
            return Err(EngineError::InvalidQuantity(format!(
                "quantity of product {} must not be negative, got {}",
                line.product_id, line.quantity
            )));
        }
        if line.quantity == 0 {
            continue;
        }
        let quantity = merged.entry(line.product_id).or_insert(0);
        *quantity = quantity
            .checked_add(line.quantity)
            .ok_or_else(|| EngineError::InvalidQuantity("quantity overflow".to_string()))?;
    }
    Ok(merged
        .into_iter()
        .map(|(product_id, quantity)| LineItem {
            product_id,
            quantity,
        })
        .collect())
}

/// Order-level rules, checked in this order: the client must afford the
/// order, the module limit must not be exceeded, something must be
/// ordered. A zero limit means the module has no limit.
fn check_order(
    total: MoneyCents,
    balance: MoneyCents,
    limit: Option<MoneyCents>,
) -> ResultEngine<()> {
    if total > balance {
        return Err(EngineError::InsufficientCredit(format!(
            "total {total} exceeds balance {balance}"
        )));
    }
    if let Some(limit) = limit.filter(|limit| limit.is_positive())
        && total > limit
    {
        return Err(EngineError::PurchaseLimitExceeded(format!(
            "total {total} exceeds limit {limit}"
        )));
    }
    if !total.is_positive() {
        return Err(EngineError::EmptyOrder(
            "the order must be positive".to_string(),
        ));
    }
    Ok(())
}

/// A ledger floor breach during a purchase is reported as missing credit.
pub(super) fn funds_to_credit(err: EngineError) -> EngineError {
    match err {
        EngineError::InsufficientFunds(message) => EngineError::InsufficientCredit(message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, quantity: i64) -> LineItem {
        LineItem {
            product_id,
            quantity,
        }
    }

    #[test]
    fn merge_skips_zero_and_merges_duplicates() {
        let merged = merge_lines(&[line(2, 1), line(1, 0), line(2, 3), line(3, 1)]).unwrap();
        assert_eq!(merged, vec![line(2, 4), line(3, 1)]);
    }

    #[test]
    fn merge_rejects_negative_quantity() {
        let err = merge_lines(&[line(1, 2), line(2, -1)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuantity(_)));
    }

    #[test]
    fn order_rules_name_the_broken_rule() {
        let cents = MoneyCents::new;
        assert!(matches!(
            check_order(cents(0), cents(100), None),
            Err(EngineError::EmptyOrder(_))
        ));
        assert!(matches!(
            check_order(cents(101), cents(100), None),
            Err(EngineError::InsufficientCredit(_))
        ));
        assert!(matches!(
            check_order(cents(60), cents(100), Some(cents(50))),
            Err(EngineError::PurchaseLimitExceeded(_))
        ));
        assert!(check_order(cents(100), cents(100), Some(cents(100))).is_ok());
        assert!(check_order(cents(100), cents(100), None).is_ok());
        assert!(check_order(cents(100), cents(100), Some(cents(0))).is_ok());
    }

    #[test]
    fn credit_is_checked_before_emptiness() {
        let cents = MoneyCents::new;
        assert!(matches!(
            check_order(cents(0), cents(-50), None),
            Err(EngineError::InsufficientCredit(_))
        ));
        assert!(matches!(
            check_order(cents(0), cents(0), Some(cents(10))),
            Err(EngineError::EmptyOrder(_))
        ));
    }

    #[test]
    fn floor_breach_becomes_insufficient_credit() {
        let err = funds_to_credit(EngineError::InsufficientFunds("x".to_string()));
        assert_eq!(err, EngineError::InsufficientCredit("x".to_string()));
        let err = funds_to_credit(EngineError::NoClientSelected);
        assert_eq!(err, EngineError::NoClientSelected);
    }
}
