use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, IntoActiveModel, QueryFilter, QueryOrder,
    TransactionTrait, prelude::*, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::{
    AdjustmentReason, Capability, EngineError, LedgerEvent, MoneyCents, ResultEngine, SharedEvent,
    locks::LockKey, shared_event_participants, shared_events, split_price,
};

use super::{Engine, normalize_required_text, with_tx};

/// Largest share weight a participant may carry.
const MAX_WEIGHT: i64 = 1_000;

impl Engine {
    /// Creates a shared event managed by the operator.
    pub async fn create_shared_event(
        &self,
        operator_id: i64,
        description: &str,
        date: DateTime<Utc>,
    ) -> ResultEngine<SharedEvent> {
        let description = normalize_required_text(description, "description")?;
        with_tx!(self, |db_tx| {
            self.require(&db_tx, operator_id, Capability::AddSharedEvent)
                .await?;
            let model = shared_events::ActiveModel {
                id: ActiveValue::NotSet,
                description: ActiveValue::Set(description),
                manager_id: ActiveValue::Set(operator_id),
                date: ActiveValue::Set(date),
                price: ActiveValue::Set(None),
                done: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;
            Ok(SharedEvent::from(model))
        })
    }

    pub async fn shared_event(&self, event_id: i64) -> ResultEngine<SharedEvent> {
        shared_events::Entity::find_by_id(event_id)
            .one(&self.database)
            .await?
            .map(SharedEvent::from)
            .ok_or_else(|| EngineError::KeyNotFound("shared event not exists".to_string()))
    }

    /// Adds a participant or changes their weight.
    pub async fn register_participant(
        &self,
        operator_id: i64,
        event_id: i64,
        user_id: i64,
        weight: i64,
    ) -> ResultEngine<()> {
        if !(1..=MAX_WEIGHT).contains(&weight) {
            return Err(EngineError::InvalidQuantity(format!(
                "weight must be between 1 and {MAX_WEIGHT}, got {weight}"
            )));
        }
        let _locks = self.locks.acquire([LockKey::Event(event_id)]).await?;
        with_tx!(self, |db_tx| {
            self.require_open_event(&db_tx, operator_id, event_id)
                .await?;
            self.require_active_user(&db_tx, user_id).await?;
            shared_event_participants::Entity::insert(shared_event_participants::ActiveModel {
                event_id: ActiveValue::Set(event_id),
                user_id: ActiveValue::Set(user_id),
                weight: ActiveValue::Set(weight),
            })
            .on_conflict(
                OnConflict::columns([
                    shared_event_participants::Column::EventId,
                    shared_event_participants::Column::UserId,
                ])
                .update_column(shared_event_participants::Column::Weight)
                .to_owned(),
            )
            .exec_without_returning(&db_tx)
            .await?;
            Ok(())
        })
    }

    /// Removes a participant, e.g. one whose account was deactivated.
    pub async fn remove_participant(
        &self,
        operator_id: i64,
        event_id: i64,
        user_id: i64,
    ) -> ResultEngine<()> {
        let _locks = self.locks.acquire([LockKey::Event(event_id)]).await?;
        with_tx!(self, |db_tx| {
            self.require_open_event(&db_tx, operator_id, event_id)
                .await?;
            let deleted = shared_event_participants::Entity::delete_many()
                .filter(shared_event_participants::Column::EventId.eq(event_id))
                .filter(shared_event_participants::Column::UserId.eq(user_id))
                .exec(&db_tx)
                .await?;
            if deleted.rows_affected == 0 {
                return Err(EngineError::UserNotFound(format!(
                    "{user_id} does not participate in event {event_id}"
                )));
            }
            Ok(())
        })
    }

    pub async fn set_event_price(
        &self,
        operator_id: i64,
        event_id: i64,
        price: MoneyCents,
    ) -> ResultEngine<SharedEvent> {
        if price.is_negative() {
            return Err(EngineError::InvalidAmount(
                "event price must be >= 0".to_string(),
            ));
        }
        let _locks = self.locks.acquire([LockKey::Event(event_id)]).await?;
        with_tx!(self, |db_tx| {
            let event = self
                .require_open_event(&db_tx, operator_id, event_id)
                .await?;
            let mut active = event.into_active_model();
            active.price = ActiveValue::Set(Some(price.cents()));
            Ok(SharedEvent::from(active.update(&db_tx).await?))
        })
    }

    /// Debits every participant their share of the price and closes the
    /// event. All debits commit together or not at all, without floor.
    pub async fn finish_shared_event(
        &self,
        operator_id: i64,
        event_id: i64,
    ) -> ResultEngine<SharedEvent> {
        let _event_lock = self.locks.acquire([LockKey::Event(event_id)]).await?;
        let weights = self.event_weights(&self.database, event_id).await?;
        let _user_locks = self
            .locks
            .acquire(weights.iter().map(|(user_id, _)| LockKey::User(*user_id)))
            .await?;

        let (event, shares) = self
            .commit_finish(operator_id, event_id, &weights)
            .await
            .inspect_err(|err| tracing::debug!(%err, event_id, "shared event not finished"))?;

        tracing::info!(event_id, participants = shares.len(), "shared event finished");
        self.publish(LedgerEvent::SharedEventFinished {
            correlation_id: Uuid::new_v4(),
            event_id,
            participants: shares,
        });
        Ok(event)
    }

    async fn commit_finish(
        &self,
        operator_id: i64,
        event_id: i64,
        weights: &[(i64, i64)],
    ) -> ResultEngine<(SharedEvent, Vec<(i64, MoneyCents)>)> {
        with_tx!(self, |db_tx| {
            let event = self
                .require_open_event(&db_tx, operator_id, event_id)
                .await?;
            let price = event.price.map(MoneyCents::new).ok_or_else(|| {
                EngineError::InvalidAmount(format!("{} has no price", event.description))
            })?;

            let shares = split_price(price, weights)?;
            for (user_id, share) in &shares {
                if share.is_zero() {
                    continue;
                }
                self.apply_adjustment(
                    &db_tx,
                    *user_id,
                    -*share,
                    AdjustmentReason::SharedEvent,
                    Some(event_id),
                    None,
                )
                .await?;
            }

            let mut active = event.into_active_model();
            active.done = ActiveValue::Set(true);
            let event = SharedEvent::from(active.update(&db_tx).await?);
            Ok((event, shares))
        })
    }

    /// `(user, weight)` of every participant, ordered by user id.
    pub(super) async fn event_weights<C: ConnectionTrait>(
        &self,
        db: &C,
        event_id: i64,
    ) -> ResultEngine<Vec<(i64, i64)>> {
        Ok(shared_event_participants::Entity::find()
            .filter(shared_event_participants::Column::EventId.eq(event_id))
            .order_by_asc(shared_event_participants::Column::UserId)
            .all(db)
            .await?
            .into_iter()
            .map(|participant| (participant.user_id, participant.weight))
            .collect())
    }

    /// An unfinished event the operator may edit: they manage it or hold
    /// `manage_sharedevent`.
    async fn require_open_event(
        &self,
        db_tx: &DatabaseTransaction,
        operator_id: i64,
        event_id: i64,
    ) -> ResultEngine<shared_events::Model> {
        let event = shared_events::Entity::find_by_id(event_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("shared event not exists".to_string()))?;
        if event.manager_id != operator_id {
            self.require(db_tx, operator_id, Capability::ManageSharedEvent)
                .await?;
        }
        if event.done {
            return Err(EngineError::InvalidInput(format!(
                "{} is already finished",
                event.description
            )));
        }
        Ok(event)
    }
}
