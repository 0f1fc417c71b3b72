use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    AdjustmentReason, Capability, EngineError, ExceptionnalMovement, LedgerEvent, MovementCmd,
    ResultEngine, exceptionnal_movements, locks::LockKey,
};

use super::{Engine, normalize_required_text, with_tx};

impl Engine {
    /// Unconditional correction of a balance. No floor is applied, the
    /// balance may become negative.
    pub async fn record_exceptional_movement(
        &self,
        cmd: MovementCmd,
    ) -> ResultEngine<ExceptionnalMovement> {
        if cmd.amount.is_zero() {
            return Err(EngineError::InvalidAmount(
                "movement amount must not be 0".to_string(),
            ));
        }
        let justification = normalize_required_text(&cmd.justification, "justification")?;

        let _locks = self.locks.acquire([LockKey::User(cmd.recipient_id)]).await?;
        let movement = self
            .commit_movement(&cmd, justification)
            .await
            .inspect_err(|err| tracing::debug!(%err, "movement rejected"))?;

        tracing::info!(
            movement_id = movement.id,
            recipient_id = movement.recipient_id,
            amount = %movement.amount,
            "exceptional movement recorded"
        );
        self.publish(LedgerEvent::MovementRecorded {
            correlation_id: Uuid::new_v4(),
            movement_id: movement.id,
            recipient_id: movement.recipient_id,
            amount: movement.amount,
        });
        Ok(movement)
    }

    /// A movement, visible to its recipient, its operator and holders of
    /// `view_user`.
    pub async fn exceptional_movement(
        &self,
        requester_id: i64,
        movement_id: i64,
    ) -> ResultEngine<ExceptionnalMovement> {
        let model = exceptionnal_movements::Entity::find_by_id(movement_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("movement not exists".to_string()))?;
        if requester_id != model.recipient_id && requester_id != model.operator_id {
            self.check(requester_id, Capability::ViewUser)
                .await?
                .into_result()?;
        }
        Ok(ExceptionnalMovement::from(model))
    }

    async fn commit_movement(
        &self,
        cmd: &MovementCmd,
        justification: String,
    ) -> ResultEngine<ExceptionnalMovement> {
        with_tx!(self, |db_tx| {
            self.require(&db_tx, cmd.operator_id, Capability::AddExceptionnalMovement)
                .await?;

            let model = exceptionnal_movements::ActiveModel {
                id: ActiveValue::NotSet,
                operator_id: ActiveValue::Set(cmd.operator_id),
                recipient_id: ActiveValue::Set(cmd.recipient_id),
                amount: ActiveValue::Set(cmd.amount.cents()),
                justification: ActiveValue::Set(justification),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            self.apply_adjustment(
                &db_tx,
                cmd.recipient_id,
                cmd.amount,
                AdjustmentReason::ExceptionalMovement,
                Some(model.id),
                None,
            )
            .await?;

            Ok(ExceptionnalMovement::from(model))
        })
    }
}
