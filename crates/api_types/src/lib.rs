use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JSON error body returned by every failing route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserNew {
        pub username: String,
        pub password: String,
        pub first_name: String,
        pub last_name: String,
        pub email: Option<String>,
        pub surname: Option<String>,
        pub family: Option<String>,
        pub campus: Option<String>,
        pub year: Option<i32>,
        #[serde(default)]
        pub is_external_member: bool,
    }

    /// Profile fields changed by an operator. Absent fields are left
    /// untouched, an empty string clears an optional field.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UserUpdate {
        pub first_name: Option<String>,
        pub last_name: Option<String>,
        pub surname: Option<String>,
        pub family: Option<String>,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub campus: Option<String>,
        pub year: Option<i32>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SelfUpdate {
        pub email: Option<String>,
        pub phone: Option<String>,
        pub theme: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Activation {
        pub active: bool,
    }

    /// Query string of the public `GET /users`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UserList {
        pub search: Option<String>,
        pub year: Option<i32>,
    }

    /// What anyone may see of an active user.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserSummary {
        pub id: i64,
        pub username: String,
        pub first_name: String,
        pub last_name: String,
        pub surname: Option<String>,
        pub family: Option<String>,
        pub year: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: i64,
        pub username: String,
        pub first_name: String,
        pub last_name: String,
        pub surname: Option<String>,
        pub family: Option<String>,
        pub email: Option<String>,
        pub phone: Option<String>,
        pub campus: Option<String>,
        pub year: Option<i32>,
        pub theme: Option<String>,
        pub balance_minor: i64,
        pub is_active: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Balance {
        pub balance_minor: i64,
        /// Balance minus pending shared event shares.
        pub forecast_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerEntryView {
        pub id: i64,
        pub delta_minor: i64,
        pub balance_after_minor: i64,
        pub reason: String,
        pub reference_id: Option<i64>,
        pub created_at: DateTime<Utc>,
    }
}

pub mod directory {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Search {
        pub keywords: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceQuery {
        pub username: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub username: String,
        pub balance_minor: i64,
    }
}

pub mod sale {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Module {
        SelfSale,
        OperatorSale,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LineItem {
        pub product_id: i64,
        pub quantity: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SaleNew {
        pub shop_id: i64,
        pub module: Module,
        /// Username of the client, operator sales only.
        pub client: Option<String>,
        pub lines: Vec<LineItem>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SaleLineView {
        pub product_id: i64,
        pub quantity: i64,
        pub unit_price_minor: i64,
        pub price_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SaleView {
        pub id: i64,
        pub shop_id: i64,
        pub module: Module,
        pub operator_id: i64,
        pub sender_id: i64,
        pub amount_minor: i64,
        pub created_at: DateTime<Utc>,
        pub lines: Vec<SaleLineView>,
    }
}

pub mod transfert {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransfertNew {
        pub recipient_id: i64,
        pub amount_minor: i64,
        pub justification: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransfertView {
        pub id: i64,
        pub operator_id: i64,
        pub sender_id: i64,
        pub recipient_id: i64,
        pub amount_minor: i64,
        pub justification: Option<String>,
        pub created_at: DateTime<Utc>,
    }
}

pub mod movement {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementNew {
        pub recipient_id: i64,
        /// Signed, negative debits the recipient.
        pub amount_minor: i64,
        pub justification: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementView {
        pub id: i64,
        pub operator_id: i64,
        pub recipient_id: i64,
        pub amount_minor: i64,
        pub justification: String,
        pub created_at: DateTime<Utc>,
    }
}

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PermissionView {
        pub id: i64,
        pub codename: String,
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub id: i64,
        pub username: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupStateView {
        pub id: i64,
        pub name: String,
        pub members: Vec<i64>,
        pub permissions: Vec<i64>,
        pub offered_permissions: Vec<PermissionView>,
        pub possible_members: Vec<MemberView>,
    }

    /// Desired members and permissions of the managed group.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupUpdate {
        pub members: Vec<i64>,
        pub permissions: Vec<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupUpdateSummary {
        pub added_members: Vec<i64>,
        pub removed_members: Vec<i64>,
        pub added_permissions: Vec<i64>,
        pub removed_permissions: Vec<i64>,
    }
}

pub mod shop {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShopNew {
        pub name: String,
        #[serde(default)]
        pub description: String,
        #[serde(default)]
        pub color: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShopView {
        pub id: i64,
        pub name: String,
        pub description: String,
        pub color: String,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Unit {
        #[default]
        Unit,
        Centiliter,
        Gram,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductNew {
        pub name: String,
        #[serde(default)]
        pub unit: Unit,
        pub manual_price_minor: Option<i64>,
        pub base_price_minor: i64,
        /// Thousandths, defaults to 1000.
        pub correcting_factor: Option<i64>,
        #[serde(default)]
        pub stock: i64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProductUpdate {
        pub name: Option<String>,
        pub is_manual: Option<bool>,
        pub manual_price_minor: Option<i64>,
        pub base_price_minor: Option<i64>,
        pub correcting_factor: Option<i64>,
        pub stock: Option<i64>,
        pub is_active: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductView {
        pub id: i64,
        pub shop_id: i64,
        pub name: String,
        pub unit: Unit,
        pub is_manual: bool,
        pub manual_price_minor: Option<i64>,
        pub base_price_minor: i64,
        pub correcting_factor: i64,
        /// Price charged for one unit right now.
        pub price_minor: i64,
        pub stock: i64,
        pub is_active: bool,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ModuleConfig {
        pub enabled: bool,
        pub limit_purchase_minor: Option<i64>,
        #[serde(default)]
        pub logout_post_purchase: bool,
        pub delay_post_purchase: Option<i64>,
    }
}

pub mod event {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventNew {
        pub description: String,
        pub date: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Participant {
        pub user_id: i64,
        pub weight: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Price {
        pub price_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventView {
        pub id: i64,
        pub description: String,
        pub manager_id: i64,
        pub date: DateTime<Utc>,
        pub price_minor: Option<i64>,
        pub done: bool,
    }
}

pub mod notification {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Template {
        pub text: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TemplateValidation {
        pub valid: bool,
        pub error: Option<String>,
    }
}
