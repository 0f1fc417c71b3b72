use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    AdjustmentReason, EngineError, LedgerEntry, MoneyCents, ResultEngine, ledger_entries,
    locks::LockKey, shared_event_participants, shared_events, split_price, users,
};

use super::{Engine, with_tx};

impl Engine {
    /// Current authoritative balance of a user.
    pub async fn get_balance(&self, user_id: i64) -> ResultEngine<MoneyCents> {
        let user = self.require_user(&self.database, user_id).await?;
        Ok(MoneyCents::new(user.balance))
    }

    /// Balance minus the user's share of every priced shared event not
    /// finished yet. Display only, never used to authorize anything.
    pub async fn forecast_balance(&self, user_id: i64) -> ResultEngine<MoneyCents> {
        let user = self.require_user(&self.database, user_id).await?;
        let pending = self.pending_shares(user_id).await?;
        MoneyCents::new(user.balance)
            .checked_sub(pending)
            .ok_or_else(super::overflow)
    }

    /// Audit trail of a user, newest first.
    pub async fn ledger_entries(&self, user_id: i64) -> ResultEngine<Vec<LedgerEntry>> {
        self.require_user(&self.database, user_id).await?;
        ledger_entries::Entity::find()
            .filter(ledger_entries::Column::UserId.eq(user_id))
            .order_by_desc(ledger_entries::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect()
    }

    /// Adds `delta` to the balance of an active user and records it.
    ///
    /// This is the trusted ledger primitive: it performs no capability
    /// check. With `floor`, the adjustment fails with `InsufficientFunds`
    /// when the resulting balance would fall below it.
    pub async fn adjust(
        &self,
        user_id: i64,
        delta: MoneyCents,
        reason: AdjustmentReason,
        floor: Option<MoneyCents>,
    ) -> ResultEngine<LedgerEntry> {
        let _locks = self.locks.acquire([LockKey::User(user_id)]).await?;
        let entry: LedgerEntry = self.adjust_in_tx(user_id, delta, reason, floor).await?;
        tracing::info!(user_id, %delta, reason = reason.as_str(), "balance adjusted");
        Ok(entry)
    }

    async fn adjust_in_tx(
        &self,
        user_id: i64,
        delta: MoneyCents,
        reason: AdjustmentReason,
        floor: Option<MoneyCents>,
    ) -> ResultEngine<LedgerEntry> {
        with_tx!(self, |db_tx| {
            self.apply_adjustment(&db_tx, user_id, delta, reason, None, floor)
                .await
        })
    }

    /// Conditional balance update plus its audit row, inside `db_tx`.
    ///
    /// The floor is checked by the `UPDATE` itself so the check and the
    /// write cannot be separated.
    pub(super) async fn apply_adjustment(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: i64,
        delta: MoneyCents,
        reason: AdjustmentReason,
        reference_id: Option<i64>,
        floor: Option<MoneyCents>,
    ) -> ResultEngine<LedgerEntry> {
        let mut update = users::Entity::update_many()
            .col_expr(
                users::Column::Balance,
                Expr::col(users::Column::Balance).add(delta.cents()),
            )
            .filter(users::Column::Id.eq(user_id))
            .filter(users::Column::IsActive.eq(true));
        if let Some(floor) = floor {
            update = update.filter(
                Expr::expr(Expr::col(users::Column::Balance).add(delta.cents())).gte(floor.cents()),
            );
        }
        let result = update.exec(db_tx).await?;

        if result.rows_affected != 1 {
            let user = users::Entity::find_by_id(user_id).one(db_tx).await?;
            return Err(match user {
                Some(user) if user.is_active => EngineError::InsufficientFunds(format!(
                    "balance of {} is {}, {delta} would go below {}",
                    user.username,
                    MoneyCents::new(user.balance),
                    floor.unwrap_or(MoneyCents::ZERO)
                )),
                Some(user) => EngineError::UserNotFound(format!("{} is inactive", user.username)),
                None => EngineError::UserNotFound(user_id.to_string()),
            });
        }

        let user = self.require_user(db_tx, user_id).await?;
        let model = ledger_entries::ActiveModel {
            id: ActiveValue::NotSet,
            user_id: ActiveValue::Set(user_id),
            delta: ActiveValue::Set(delta.cents()),
            balance_after: ActiveValue::Set(user.balance),
            reason: ActiveValue::Set(reason.as_str().to_string()),
            reference_id: ActiveValue::Set(reference_id),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db_tx)
        .await?;

        LedgerEntry::try_from(model)
    }

    async fn pending_shares(&self, user_id: i64) -> ResultEngine<MoneyCents> {
        let event_ids: Vec<i64> = shared_event_participants::Entity::find()
            .filter(shared_event_participants::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|participation| participation.event_id)
            .collect();
        if event_ids.is_empty() {
            return Ok(MoneyCents::ZERO);
        }

        let events = shared_events::Entity::find()
            .filter(shared_events::Column::Id.is_in(event_ids))
            .filter(shared_events::Column::Done.eq(false))
            .filter(shared_events::Column::Price.is_not_null())
            .all(&self.database)
            .await?;

        let mut pending = MoneyCents::ZERO;
        for event in events {
            let Some(price) = event.price else {
                continue;
            };
            let weights = self.event_weights(&self.database, event.id).await?;
            let share = split_price(MoneyCents::new(price), &weights)?
                .into_iter()
                .find(|(participant, _)| *participant == user_id)
                .map_or(MoneyCents::ZERO, |(_, share)| share);
            pending = pending.checked_add(share).ok_or_else(super::overflow)?;
        }
        Ok(pending)
    }
}
