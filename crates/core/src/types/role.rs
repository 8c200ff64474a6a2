//! Client roles.
//!
//! Roles are stored and serialized with their `ROLE_` prefix, matching the
//! values operators already use in seeds and tokens.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a role name is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0}")]
pub struct RoleError(String);

/// A role granted to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Every authenticated client.
    #[serde(rename = "ROLE_USER")]
    User,
    /// Platform operator; bypasses ownership checks.
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    /// The stored/serialized name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "ROLE_USER",
            Self::Admin => "ROLE_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROLE_USER" => Ok(Self::User),
            "ROLE_ADMIN" => Ok(Self::Admin),
            _ => Err(RoleError(s.to_owned())),
        }
    }
}

/// The set of roles held by a client.
///
/// Always contains [`Role::User`], whatever was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Build a role set; `Role::User` is added implicitly.
    #[must_use]
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut set: BTreeSet<Role> = roles.into_iter().collect();
        set.insert(Role::User);
        Self(set)
    }

    /// The role set of a freshly registered client.
    #[must_use]
    pub fn user() -> Self {
        Self::new([])
    }

    /// The role set of an administrator.
    #[must_use]
    pub fn admin() -> Self {
        Self::new([Role::Admin])
    }

    /// Parse stored role names.
    ///
    /// # Errors
    ///
    /// Returns [`RoleError`] on the first unknown name.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, RoleError> {
        let roles = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<Role>, _>>()?;
        Ok(Self::new(roles))
    }

    /// Whether the set contains `role`.
    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Role names in storage form.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|r| r.as_str().to_owned()).collect()
    }

    /// Iterate over the roles in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl Default for RoleSet {
    fn default() -> Self {
        Self::user()
    }
}

impl From<Vec<Role>> for RoleSet {
    fn from(roles: Vec<Role>) -> Self {
        Self::new(roles)
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(set: RoleSet) -> Self {
        set.0.into_iter().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_is_implicit() {
        assert!(RoleSet::new([]).contains(Role::User));
        assert!(RoleSet::admin().contains(Role::User));
        assert!(!RoleSet::user().contains(Role::Admin));
    }

    #[test]
    fn test_parse_stored_names() {
        let roles = RoleSet::parse(&["ROLE_ADMIN"]).unwrap();
        assert!(roles.contains(Role::Admin));
        assert_eq!(roles.names(), vec!["ROLE_USER", "ROLE_ADMIN"]);
    }

    #[test]
    fn test_parse_unknown_role() {
        assert!(RoleSet::parse(&["ROLE_ROOT"]).is_err());
    }

    #[test]
    fn test_duplicate_roles_collapse() {
        let roles = RoleSet::new([Role::User, Role::User, Role::Admin]);
        assert_eq!(roles.iter().count(), 2);
    }

    #[test]
    fn test_serde_uses_prefixed_names() {
        let json = serde_json::to_string(&RoleSet::admin()).unwrap();
        assert_eq!(json, r#"["ROLE_USER","ROLE_ADMIN"]"#);

        let parsed: RoleSet = serde_json::from_str(r#"["ROLE_ADMIN"]"#).unwrap();
        assert_eq!(parsed, RoleSet::admin());
    }
}
