//! Named capabilities checked by the engine.
//!
//! Permissions are rows keyed by codename. The engine never refers to a
//! permission by its database id: it asks for a [`Capability`] and the
//! codename is resolved at query time.

/// A permission the core checks before a mutation or a protected read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    AddUser,
    ViewUser,
    ChangeUser,
    DeleteUser,
    UseSelfSaleModule,
    UseOperatorSaleModule,
    AddTransfert,
    AddExceptionnalMovement,
    AddShop,
    ChangeShop,
    AddProduct,
    ChangeProduct,
    AddSharedEvent,
    ManageSharedEvent,
    ViewSale,
}

impl Capability {
    pub const ALL: [Capability; 15] = [
        Self::AddUser,
        Self::ViewUser,
        Self::ChangeUser,
        Self::DeleteUser,
        Self::UseSelfSaleModule,
        Self::UseOperatorSaleModule,
        Self::AddTransfert,
        Self::AddExceptionnalMovement,
        Self::AddShop,
        Self::ChangeShop,
        Self::AddProduct,
        Self::ChangeProduct,
        Self::AddSharedEvent,
        Self::ManageSharedEvent,
        Self::ViewSale,
    ];

    /// Permissions granted to the chiefs group of a new shop.
    pub const DEFAULT_CHIEFS: [Capability; 6] = [
        Self::UseOperatorSaleModule,
        Self::AddProduct,
        Self::ChangeProduct,
        Self::ChangeShop,
        Self::ViewSale,
        Self::ViewUser,
    ];

    pub fn codename(self) -> &'static str {
        match self {
            Self::AddUser => "add_user",
            Self::ViewUser => "view_user",
            Self::ChangeUser => "change_user",
            Self::DeleteUser => "delete_user",
            Self::UseSelfSaleModule => "use_selfsalemodule",
            Self::UseOperatorSaleModule => "use_operatorsalemodule",
            Self::AddTransfert => "add_transfert",
            Self::AddExceptionnalMovement => "add_exceptionnalmovement",
            Self::AddShop => "add_shop",
            Self::ChangeShop => "change_shop",
            Self::AddProduct => "add_product",
            Self::ChangeProduct => "change_product",
            Self::AddSharedEvent => "add_sharedevent",
            Self::ManageSharedEvent => "manage_sharedevent",
            Self::ViewSale => "view_sale",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.codename())
    }
}

/// Codename of the permission allowing to manage the group `group_name`.
pub fn manage_group_codename(group_name: &str) -> String {
    format!("manage_{group_name}_group")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn codenames_are_unique() {
        let codenames: HashSet<_> = Capability::ALL.iter().map(|c| c.codename()).collect();
        assert_eq!(codenames.len(), Capability::ALL.len());
    }

    #[test]
    fn manage_codename_wraps_group_name() {
        assert_eq!(
            manage_group_codename("associates-pi"),
            "manage_associates-pi_group"
        );
    }
}
