/*!
 * # Capability Policy
 *
 * Declarative mapping from capability (resource group) to the roles allowed
 * to use it. Routers are gated once with `with_capability`; the only checks
 * left to handlers are row-level ones (ownership, the self-or-admin split on
 * user profiles), and those consult the same table via `role_allows`.
 */

use crate::entities::user::Role;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Capability names, one per gated router group
pub struct Capabilities;

impl Capabilities {
    pub const MEDICINES: &'static str = "medicines";
    pub const INVENTORY: &'static str = "inventory";
    pub const SALES: &'static str = "sales";
    pub const REPORTS: &'static str = "reports";
    pub const ACTIVITY: &'static str = "activity";
    pub const SUPPLIERS: &'static str = "suppliers";
    pub const PURCHASE_ORDERS: &'static str = "purchase-orders";
    /// Reach the /users router at all; per-row access is self-or-admin
    pub const USERS: &'static str = "users";
    /// List, delete, and role/status changes on any account
    pub const USERS_MANAGEMENT: &'static str = "users-management";
    pub const NOTIFICATIONS: &'static str = "notifications";
}

const STAFF: &[Role] = &[Role::Admin, Role::Pharmacist];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

lazy_static! {
    /// The capability table. Absent capabilities deny everyone.
    pub static ref CAPABILITY_ROLES: HashMap<&'static str, &'static [Role]> = {
        let mut table: HashMap<&'static str, &'static [Role]> = HashMap::new();
        table.insert(Capabilities::MEDICINES, STAFF);
        table.insert(Capabilities::INVENTORY, STAFF);
        table.insert(Capabilities::SALES, STAFF);
        table.insert(Capabilities::REPORTS, STAFF);
        table.insert(Capabilities::ACTIVITY, STAFF);
        table.insert(Capabilities::SUPPLIERS, ADMIN_ONLY);
        table.insert(Capabilities::PURCHASE_ORDERS, ADMIN_ONLY);
        table.insert(Capabilities::USERS, STAFF);
        table.insert(Capabilities::USERS_MANAGEMENT, ADMIN_ONLY);
        table.insert(Capabilities::NOTIFICATIONS, STAFF);
        table
    };
}

/// Whether `role` may use `capability`.
pub fn role_allows(capability: &str, role: Role) -> bool {
    CAPABILITY_ROLES
        .get(capability)
        .map(|roles| roles.contains(&role))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pharmacists_can_sell_but_not_manage_suppliers() {
        assert!(role_allows(Capabilities::SALES, Role::Pharmacist));
        assert!(role_allows(Capabilities::MEDICINES, Role::Pharmacist));
        assert!(!role_allows(Capabilities::SUPPLIERS, Role::Pharmacist));
        assert!(!role_allows(Capabilities::USERS_MANAGEMENT, Role::Pharmacist));
    }

    #[test]
    fn pharmacists_can_reach_their_own_profile_router() {
        assert!(role_allows(Capabilities::USERS, Role::Pharmacist));
    }

    #[test]
    fn admins_are_allowed_everywhere() {
        for capability in CAPABILITY_ROLES.keys() {
            assert!(role_allows(capability, Role::Admin), "{}", capability);
        }
    }

    #[test]
    fn unknown_capability_denies() {
        assert!(!role_allows("nonexistent", Role::Admin));
    }
}
