//! Client (reseller) models.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use bilemo_core::{Actor, ClientId, Email, RoleSet};

use super::customer::Customer;
use crate::services::validation::Violations;

/// A client as exposed by the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub email: Email,
    pub roles: RoleSet,
    pub company: String,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// The authorization identity of this client.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.roles.clone())
    }
}

/// A client with the customers it manages.
#[derive(Debug, Clone, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub customers: Vec<Customer>,
}

/// Registration payload.
#[derive(Deserialize)]
pub struct ClientInput {
    #[serde(default)]
    pub email: String,
    #[serde(default = "empty_secret", deserialize_with = "secret")]
    pub password: SecretString,
    #[serde(default)]
    pub company: String,
}

/// A validated client ready to be stored.
pub struct NewClient {
    pub email: Email,
    pub password: SecretString,
    pub company: String,
    pub roles: RoleSet,
}

impl ClientInput {
    /// Validate a registration. The role set is always `{USER}`.
    ///
    /// # Errors
    ///
    /// Returns every violated constraint.
    pub fn validate(self) -> Result<NewClient, Violations> {
        let mut violations = Violations::new();
        let email = violations.check_email("email", &self.email);
        check_password(&mut violations, &self.password);
        violations.check_length("company", &self.company, 2, 50);

        match email {
            Some(email) => violations.finish(NewClient {
                email,
                password: self.password,
                company: self.company.trim().to_owned(),
                roles: RoleSet::user(),
            }),
            None => Err(violations),
        }
    }
}

/// Login payload. Not validated beyond deserialization: a malformed email
/// simply fails to authenticate.
#[derive(Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default = "empty_secret", deserialize_with = "secret")]
    pub password: SecretString,
}

/// Partial update payload. Absent fields are left unchanged.
#[derive(Default, Deserialize)]
pub struct ClientUpdate {
    pub email: Option<String>,
    #[serde(default, deserialize_with = "optional_secret")]
    pub password: Option<SecretString>,
    pub company: Option<String>,
}

/// Validated changes to a client.
#[derive(Default)]
pub struct ClientChanges {
    pub email: Option<Email>,
    pub password: Option<SecretString>,
    pub company: Option<String>,
}

impl ClientUpdate {
    /// Validate the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns every violated constraint.
    pub fn validate(self) -> Result<ClientChanges, Violations> {
        let mut violations = Violations::new();
        let email = self
            .email
            .as_deref()
            .and_then(|e| violations.check_email("email", e));
        if let Some(password) = &self.password {
            check_password(&mut violations, password);
        }
        if let Some(company) = &self.company {
            violations.check_length("company", company, 2, 50);
        }

        violations.finish(ClientChanges {
            email,
            password: self.password,
            company: self.company.map(|c| c.trim().to_owned()),
        })
    }
}

fn check_password(violations: &mut Violations, password: &SecretString) {
    let len = password.expose_secret().chars().count();
    if len == 0 {
        violations.add("password", "This value should not be blank.");
    } else if len < 6 {
        violations.add("password", "Password must contain at least 6 characters");
    } else if len > 30 {
        violations.add("password", "Password should not contain more than 30 characters");
    }
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error> {
    Option::<String>::deserialize(deserializer).map(|s| s.map(SecretString::from))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bilemo_core::Role;

    use super::*;

    fn input(json: &str) -> ClientInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_registration_is_always_user() {
        let new = input(
            r#"{"email":"a@x.com","password":"secret1","company":"Acme","roles":["ROLE_ADMIN"]}"#,
        )
        .validate()
        .unwrap();
        assert!(!new.roles.contains(Role::Admin));
        assert!(new.roles.contains(Role::User));
    }

    #[test]
    fn test_registration_collects_all_violations() {
        let violations = input(r#"{"email":"nope","password":"123","company":"A"}"#)
            .validate()
            .err()
            .unwrap();
        let paths: Vec<_> = violations
            .as_slice()
            .iter()
            .map(|v| v.property_path.as_str())
            .collect();
        assert_eq!(paths, ["email", "password", "company"]);
    }

    #[test]
    fn test_missing_fields_are_violations() {
        let violations = input("{}").validate().err().unwrap();
        assert_eq!(violations.as_slice().len(), 3);
    }

    #[test]
    fn test_update_validates_present_fields_only() {
        let update: ClientUpdate = serde_json::from_str(r#"{"company":"New Co"}"#).unwrap();
        let changes = update.validate().unwrap();
        assert!(changes.email.is_none());
        assert!(changes.password.is_none());
        assert_eq!(changes.company.as_deref(), Some("New Co"));

        let update: ClientUpdate = serde_json::from_str(r#"{"password":"abc"}"#).unwrap();
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_client_serialization_has_no_password() {
        let client = Client {
            id: ClientId::new(1),
            email: Email::parse("a@x.com").unwrap(),
            roles: RoleSet::user(),
            company: "Acme".to_owned(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&client).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["roles"][0], "ROLE_USER");
        assert!(json.get("createdAt").is_some());
    }
}
