//! Authorization engine.
//!
//! A single pure decision function, [`can_access`], answers whether an actor
//! may perform an action on a resource. Every role check in the service goes
//! through [`Actor::is_admin`], so the administrator bypass lives in exactly
//! one place.
//!
//! Decisions are never cached: the caller builds a fresh [`Actor`] and a
//! fresh [`Resource`] (including the current link set) on every request.
//!
//! # Example
//!
//! ```
//! use bilemo_core::{Action, Actor, ClientId, Resource, RoleSet, can_access};
//!
//! let alice = Actor::new(ClientId::new(1), RoleSet::user());
//! let bob = ClientId::new(2);
//!
//! assert!(can_access(Some(&alice), &Resource::Client(ClientId::new(1)), Action::Manage));
//! assert!(!can_access(Some(&alice), &Resource::Client(bob), Action::Manage));
//! assert!(!can_access(None, &Resource::Client(bob), Action::Manage));
//! ```

use crate::types::{ClientId, Role, RoleSet};

/// The authenticated party making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// The acting client.
    pub id: ClientId,
    /// Roles held at the time of the request.
    pub roles: RoleSet,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub const fn new(id: ClientId, roles: RoleSet) -> Self {
        Self { id, roles }
    }

    /// Whether the actor holds the administrator role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.contains(Role::Admin)
    }
}

/// Action being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read an item, update it or delete it.
    Manage,
    /// Enumerate a collection without ownership scoping.
    List,
}

/// Resource being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource<'a> {
    /// A client record.
    Client(ClientId),
    /// A customer record with the clients it is currently linked to.
    Customer {
        /// Current link set.
        linked_clients: &'a [ClientId],
    },
    /// A catalog product.
    Product,
    /// The client collection.
    Clients,
}

/// Decide whether `actor` may perform `action` on `resource`.
///
/// Rules, first match wins:
/// 1. no actor: denied
/// 2. administrator: permitted
/// 3. `Manage` on a client: permitted iff it is the actor
/// 4. `Manage` on a customer: permitted iff the actor is linked to it
/// 5. anything else: denied
#[must_use]
pub fn can_access(actor: Option<&Actor>, resource: &Resource<'_>, action: Action) -> bool {
    let Some(actor) = actor else {
        return false;
    };

    if actor.is_admin() {
        return true;
    }

    match (action, resource) {
        (Action::Manage, Resource::Client(id)) => *id == actor.id,
        (Action::Manage, Resource::Customer { linked_clients }) => {
            linked_clients.contains(&actor.id)
        }
        _ => false,
    }
}

/// Which customers a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Every customer.
    All,
    /// Only customers linked to this client.
    LinkedTo(ClientId),
}

/// Scope for a customer listing made by `actor`.
///
/// Administrators see the whole collection; everyone else sees only the
/// customers they are linked to.
#[must_use]
pub fn customer_list_scope(actor: &Actor) -> ListScope {
    if can_access(Some(actor), &Resource::Customer { linked_clients: &[] }, Action::List) {
        ListScope::All
    } else {
        ListScope::LinkedTo(actor.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i32) -> Actor {
        Actor::new(ClientId::new(id), RoleSet::user())
    }

    fn admin(id: i32) -> Actor {
        Actor::new(ClientId::new(id), RoleSet::admin())
    }

    #[test]
    fn test_anonymous_is_always_denied() {
        let resources = [
            Resource::Client(ClientId::new(1)),
            Resource::Customer {
                linked_clients: &[],
            },
            Resource::Product,
            Resource::Clients,
        ];
        for resource in &resources {
            assert!(!can_access(None, resource, Action::Manage));
            assert!(!can_access(None, resource, Action::List));
        }
    }

    #[test]
    fn test_client_manages_only_itself() {
        let actor = user(1);
        assert!(can_access(
            Some(&actor),
            &Resource::Client(ClientId::new(1)),
            Action::Manage
        ));
        for other in [2, 3, 100] {
            assert!(!can_access(
                Some(&actor),
                &Resource::Client(ClientId::new(other)),
                Action::Manage
            ));
        }
    }

    #[test]
    fn test_customer_requires_link() {
        let actor = user(1);
        let linked = [ClientId::new(3), ClientId::new(1)];
        let unlinked = [ClientId::new(2)];

        assert!(can_access(
            Some(&actor),
            &Resource::Customer {
                linked_clients: &linked
            },
            Action::Manage
        ));
        assert!(!can_access(
            Some(&actor),
            &Resource::Customer {
                linked_clients: &unlinked
            },
            Action::Manage
        ));
        assert!(!can_access(
            Some(&actor),
            &Resource::Customer {
                linked_clients: &[]
            },
            Action::Manage
        ));
    }

    #[test]
    fn test_admin_manages_everything() {
        let actor = admin(9);
        assert!(can_access(
            Some(&actor),
            &Resource::Client(ClientId::new(1)),
            Action::Manage
        ));
        assert!(can_access(
            Some(&actor),
            &Resource::Customer {
                linked_clients: &[ClientId::new(1)]
            },
            Action::Manage
        ));
        assert!(can_access(Some(&actor), &Resource::Product, Action::Manage));
        assert!(can_access(Some(&actor), &Resource::Clients, Action::List));
    }

    #[test]
    fn test_non_admin_cannot_manage_catalog_or_list_clients() {
        let actor = user(1);
        assert!(!can_access(Some(&actor), &Resource::Product, Action::Manage));
        assert!(!can_access(Some(&actor), &Resource::Clients, Action::List));
    }

    #[test]
    fn test_list_scope() {
        assert_eq!(customer_list_scope(&admin(1)), ListScope::All);
        assert_eq!(
            customer_list_scope(&user(4)),
            ListScope::LinkedTo(ClientId::new(4))
        );
    }
}
