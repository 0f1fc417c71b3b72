//! Events published once a ledger mutation is committed.
//!
//! Consumers (notifications, audit exporters) subscribe with
//! [`Engine::subscribe`](crate::Engine::subscribe). A slow consumer may lag
//! and miss events; the database remains the record.

use uuid::Uuid;

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    SaleCompleted {
        correlation_id: Uuid,
        sale_id: i64,
        shop_id: i64,
        operator_id: i64,
        client_id: i64,
        amount: MoneyCents,
    },
    TransferCompleted {
        correlation_id: Uuid,
        transfert_id: i64,
        sender_id: i64,
        recipient_id: i64,
        amount: MoneyCents,
    },
    MovementRecorded {
        correlation_id: Uuid,
        movement_id: i64,
        recipient_id: i64,
        amount: MoneyCents,
    },
    SharedEventFinished {
        correlation_id: Uuid,
        event_id: i64,
        participants: Vec<(i64, MoneyCents)>,
    },
}

impl LedgerEvent {
    pub fn correlation_id(&self) -> Uuid {
        match self {
            Self::SaleCompleted { correlation_id, .. }
            | Self::TransferCompleted { correlation_id, .. }
            | Self::MovementRecorded { correlation_id, .. }
            | Self::SharedEventFinished { correlation_id, .. } => *correlation_id,
        }
    }

    /// Users the event concerns, e.g. the recipients of a notification.
    pub fn recipients(&self) -> Vec<i64> {
        match self {
            Self::SaleCompleted { client_id, .. } => vec![*client_id],
            Self::TransferCompleted {
                sender_id,
                recipient_id,
                ..
            } => vec![*sender_id, *recipient_id],
            Self::MovementRecorded { recipient_id, .. } => vec![*recipient_id],
            Self::SharedEventFinished { participants, .. } => {
                participants.iter().map(|(user_id, _)| *user_id).collect()
            }
        }
    }
}
