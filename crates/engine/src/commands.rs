//! Command structs for engine operations.
//!
//! These types group parameters for write operations (sales, transfers,
//! movements, user and catalog edits), keeping call sites readable and
//! avoiding long argument lists.

use crate::{MoneyCents, ModuleKind, Unit};

/// One `(product, quantity)` pair of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: i64,
    pub quantity: i64,
}

/// Record a sale through a shop module.
#[derive(Clone, Debug)]
pub struct SaleCmd {
    pub operator_id: i64,
    pub shop_id: i64,
    pub module: ModuleKind,
    /// Username of the client. Ignored by the self-sale module.
    pub client: Option<String>,
    pub lines: Vec<LineItem>,
}

impl SaleCmd {
    /// The operator buys for themselves.
    #[must_use]
    pub fn self_sale(operator_id: i64, shop_id: i64) -> Self {
        Self {
            operator_id,
            shop_id,
            module: ModuleKind::SelfSale,
            client: None,
            lines: Vec::new(),
        }
    }

    /// The operator sells to a client chosen with [`SaleCmd::client`].
    #[must_use]
    pub fn operator_sale(operator_id: i64, shop_id: i64) -> Self {
        Self {
            module: ModuleKind::OperatorSale,
            ..Self::self_sale(operator_id, shop_id)
        }
    }

    #[must_use]
    pub fn client(mut self, username: impl Into<String>) -> Self {
        self.client = Some(username.into());
        self
    }

    #[must_use]
    pub fn line(mut self, product_id: i64, quantity: i64) -> Self {
        self.lines.push(LineItem {
            product_id,
            quantity,
        });
        self
    }
}

/// Move money from one user to another.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub operator_id: i64,
    pub source_id: i64,
    pub destination_id: i64,
    pub amount: MoneyCents,
    pub justification: Option<String>,
}

impl TransferCmd {
    #[must_use]
    pub fn new(operator_id: i64, source_id: i64, destination_id: i64, amount: MoneyCents) -> Self {
        Self {
            operator_id,
            source_id,
            destination_id,
            amount,
            justification: None,
        }
    }

    #[must_use]
    pub fn justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = Some(justification.into());
        self
    }
}

/// Manual correction of a balance.
#[derive(Clone, Debug)]
pub struct MovementCmd {
    pub operator_id: i64,
    pub recipient_id: i64,
    /// Signed amount, negative debits the recipient.
    pub amount: MoneyCents,
    pub justification: String,
}

impl MovementCmd {
    #[must_use]
    pub fn new(
        operator_id: i64,
        recipient_id: i64,
        amount: MoneyCents,
        justification: impl Into<String>,
    ) -> Self {
        Self {
            operator_id,
            recipient_id,
            amount,
            justification: justification.into(),
        }
    }
}

/// Desired members and permissions of a managed group.
#[derive(Clone, Debug)]
pub struct GroupUpdateCmd {
    pub acting_user_id: i64,
    pub actor_group_id: i64,
    pub target_group_id: i64,
    pub members: Vec<i64>,
    pub permissions: Vec<i64>,
}

/// Create a user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub surname: Option<String>,
    pub family: Option<String>,
    pub campus: Option<String>,
    pub year: Option<i32>,
    /// Joins `externals` instead of `members`.
    pub is_external_member: bool,
}

impl NewUser {
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            surname: None,
            family: None,
            campus: None,
            year: None,
            is_external_member: false,
        }
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn surname(mut self, surname: impl Into<String>) -> Self {
        self.surname = Some(surname.into());
        self
    }

    #[must_use]
    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    #[must_use]
    pub fn campus(mut self, campus: impl Into<String>) -> Self {
        self.campus = Some(campus.into());
        self
    }

    #[must_use]
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    #[must_use]
    pub fn external(mut self, is_external_member: bool) -> Self {
        self.is_external_member = is_external_member;
        self
    }
}

/// Profile fields an operator may change. `None` leaves a field untouched;
/// for optional text fields an empty string clears the value.
#[derive(Clone, Debug, Default)]
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

/// Fields a user may change on their own profile.
#[derive(Clone, Debug, Default)]
pub struct SelfUpdate {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub theme: Option<String>,
}

/// Create a product in a shop.
#[derive(Clone, Debug)]
pub struct NewProduct {
    pub shop_id: i64,
    pub name: String,
    pub unit: Unit,
    pub is_manual: bool,
    pub manual_price: Option<MoneyCents>,
    pub base_price: MoneyCents,
    /// Thousandths, `1000` leaves the base price unchanged.
    pub correcting_factor: i64,
    pub stock: i64,
}

impl NewProduct {
    /// A product sold at its base price.
    #[must_use]
    pub fn new(shop_id: i64, name: impl Into<String>, base_price: MoneyCents) -> Self {
        Self {
            shop_id,
            name: name.into(),
            unit: Unit::Unit,
            is_manual: false,
            manual_price: None,
            base_price,
            correcting_factor: 1000,
            stock: 0,
        }
    }

    #[must_use]
    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    #[must_use]
    pub fn manual_price(mut self, price: MoneyCents) -> Self {
        self.is_manual = true;
        self.manual_price = Some(price);
        self
    }

    #[must_use]
    pub fn correcting_factor(mut self, factor_permille: i64) -> Self {
        self.correcting_factor = factor_permille;
        self
    }

    #[must_use]
    pub fn stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }
}

/// Product fields to change, `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub is_manual: Option<bool>,
    pub manual_price: Option<MoneyCents>,
    pub base_price: Option<MoneyCents>,
    pub correcting_factor: Option<i64>,
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
}

/// Account state used to filter user listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserState {
    Active,
    Inactive,
    NegativeBalance,
    /// Active users whose balance is strictly below the threshold.
    BelowThreshold(MoneyCents),
}

#[derive(Clone, Debug, Default)]
pub struct UserFilter {
    /// Matched against username, names and surname.
    pub search: Option<String>,
    pub year: Option<i32>,
    pub state: Option<UserState>,
}
