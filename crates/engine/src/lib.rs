//! Account ledger and authorization core of the cooperative.
//!
//! [`Engine`] owns user balances and every rule that mutates them: sales,
//! transfers, exceptional movements and shared events. It also decides
//! which group may manage which other group, and answers directory
//! lookups used when entering a sale.
//!
//! Every mutation takes the in-process locks it needs, then runs in a
//! single database transaction that re-checks the acting user's
//! capability before writing.

pub use capabilities::{Capability, manage_group_codename};
pub use commands::{
    GroupUpdateCmd, LineItem, MovementCmd, NewProduct, NewUser, ProductUpdate, SaleCmd,
    SelfUpdate, TransferCmd, UserFilter, UserState, UserUpdate,
};
pub use error::EngineError;
pub use events::LedgerEvent;
pub use exceptionnal_movements::ExceptionnalMovement;
pub use groups::{Group, associates_group_name, chiefs_group_name};
pub use ledger_entries::{AdjustmentReason, LedgerEntry};
pub use money::MoneyCents;
pub use notifications::{AUTHORIZED_TAGS, NotificationTemplate};
pub use ops::{Access, Engine, EngineBuilder, GroupState, GroupUpdateSummary};
pub use permissions::Permission;
pub use products::{Product, Unit};
pub use registry::{Registry, ReservedGroup};
pub use sale_modules::{ModuleConfig, ModuleKind};
pub use sales::{Sale, SaleLine};
pub use shared_events::{SharedEvent, split_price};
pub use shops::Shop;
pub use transferts::Transfert;
pub use users::User;

mod capabilities;
mod commands;
mod error;
mod events;
mod exceptionnal_movements;
mod group_permissions;
mod groups;
mod ledger_entries;
mod locks;
mod money;
mod notifications;
mod ops;
mod password;
mod permissions;
mod products;
mod registry;
mod sale_modules;
mod sale_products;
mod sales;
mod shared_event_participants;
mod shared_events;
mod shops;
mod transferts;
mod user_groups;
mod users;

type ResultEngine<T> = Result<T, EngineError>;
