use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    AdjustmentReason, Capability, EngineError, LedgerEvent, MoneyCents, ResultEngine,
    TransferCmd, Transfert, locks::LockKey, transferts,
};

use super::{Engine, normalize_optional_text, sales::funds_to_credit, with_tx};

impl Engine {
    /// Moves `amount` from the source to the destination. Both ledger
    /// adjustments commit together or not at all.
    pub async fn record_transfer(&self, cmd: TransferCmd) -> ResultEngine<Transfert> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "transfer amount must be > 0".to_string(),
            ));
        }
        if cmd.source_id == cmd.destination_id {
            return Err(EngineError::InvalidAmount(
                "source and destination must differ".to_string(),
            ));
        }
        if cmd.operator_id != cmd.source_id {
            return Err(EngineError::PermissionDenied(
                "transfers can only be made from one's own account".to_string(),
            ));
        }

        let _locks = self
            .locks
            .acquire([LockKey::User(cmd.source_id), LockKey::User(cmd.destination_id)])
            .await?;
        let transfert = self
            .commit_transfer(&cmd)
            .await
            .inspect_err(|err| tracing::debug!(%err, "transfer rejected"))?;

        tracing::info!(
            transfert_id = transfert.id,
            sender_id = transfert.sender_id,
            recipient_id = transfert.recipient_id,
            amount = %transfert.amount,
            "transfer recorded"
        );
        self.publish(LedgerEvent::TransferCompleted {
            correlation_id: Uuid::new_v4(),
            transfert_id: transfert.id,
            sender_id: transfert.sender_id,
            recipient_id: transfert.recipient_id,
            amount: transfert.amount,
        });
        Ok(transfert)
    }

    /// A transfer, visible to both parties and holders of `view_user`.
    pub async fn transfert(&self, requester_id: i64, transfert_id: i64) -> ResultEngine<Transfert> {
        let model = transferts::Entity::find_by_id(transfert_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transfert not exists".to_string()))?;
        if ![model.sender_id, model.recipient_id, model.operator_id].contains(&requester_id) {
            self.check(requester_id, Capability::ViewUser)
                .await?
                .into_result()?;
        }
        Ok(Transfert::from(model))
    }

    async fn commit_transfer(&self, cmd: &TransferCmd) -> ResultEngine<Transfert> {
        with_tx!(self, |db_tx| {
            self.require(&db_tx, cmd.operator_id, Capability::AddTransfert)
                .await?;
            self.require_active_user(&db_tx, cmd.destination_id).await?;

            let model = transferts::ActiveModel {
                id: ActiveValue::NotSet,
                operator_id: ActiveValue::Set(cmd.operator_id),
                sender_id: ActiveValue::Set(cmd.source_id),
                recipient_id: ActiveValue::Set(cmd.destination_id),
                amount: ActiveValue::Set(cmd.amount.cents()),
                justification: ActiveValue::Set(normalize_optional_text(
                    cmd.justification.as_deref(),
                )),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            self.apply_adjustment(
                &db_tx,
                cmd.source_id,
                -cmd.amount,
                AdjustmentReason::TransferDebit,
                Some(model.id),
                Some(MoneyCents::ZERO),
            )
            .await
            .map_err(funds_to_credit)?;
            self.apply_adjustment(
                &db_tx,
                cmd.destination_id,
                cmd.amount,
                AdjustmentReason::TransferCredit,
                Some(model.id),
                None,
            )
            .await?;

            Ok(Transfert::from(model))
        })
    }
}
