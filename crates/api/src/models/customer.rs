//! Customer (end user) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bilemo_core::{ClientId, CustomerId, Email};

use crate::services::validation::Violations;

/// A customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub firstname: String,
    pub lastname: String,
    pub created_at: DateTime<Utc>,
}

/// A customer together with the clients currently linked to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedCustomer {
    pub customer: Customer,
    pub clients: Vec<ClientId>,
}

/// A linked client as shown on a customer's detail view.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LinkedClient {
    pub id: ClientId,
    pub company: String,
}

/// Customer detail view.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub clients: Vec<LinkedClient>,
}

/// Customer creation payload.
#[derive(Debug, Default, Deserialize)]
pub struct CustomerInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

/// A validated customer ready to be attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: Email,
    pub firstname: String,
    pub lastname: String,
}

impl CustomerInput {
    /// # Errors
    ///
    /// Returns every violated constraint.
    pub fn validate(self) -> Result<NewCustomer, Violations> {
        let mut violations = Violations::new();
        let email = violations.check_email("email", &self.email);
        violations.check_length("firstname", &self.firstname, 2, 30);
        violations.check_length("lastname", &self.lastname, 2, 30);

        match email {
            Some(email) => violations.finish(NewCustomer {
                email,
                firstname: self.firstname.trim().to_owned(),
                lastname: self.lastname.trim().to_owned(),
            }),
            None => Err(violations),
        }
    }
}

/// Partial update payload. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct CustomerUpdate {
    pub email: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

/// Validated changes to a customer.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CustomerChanges {
    pub email: Option<Email>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

impl CustomerUpdate {
    /// # Errors
    ///
    /// Returns every violated constraint.
    pub fn validate(self) -> Result<CustomerChanges, Violations> {
        let mut violations = Violations::new();
        let email = self
            .email
            .as_deref()
            .and_then(|e| violations.check_email("email", e));
        if let Some(firstname) = &self.firstname {
            violations.check_length("firstname", firstname, 2, 30);
        }
        if let Some(lastname) = &self.lastname {
            violations.check_length("lastname", lastname, 2, 30);
        }

        violations.finish(CustomerChanges {
            email,
            firstname: self.firstname.map(|s| s.trim().to_owned()),
            lastname: self.lastname.map(|s| s.trim().to_owned()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_input() {
        let input: CustomerInput =
            serde_json::from_str(r#"{"email":"c@x.com","firstname":" Jane ","lastname":"Doe"}"#)
                .unwrap();
        let new = input.validate().unwrap();
        assert_eq!(new.email.as_str(), "c@x.com");
        assert_eq!(new.firstname, "Jane");
    }

    #[test]
    fn test_invalid_input() {
        let input = CustomerInput {
            email: "c@x".to_owned(),
            firstname: "J".to_owned(),
            lastname: String::new(),
        };
        assert_eq!(input.validate().unwrap_err().as_slice().len(), 3);
    }

    #[test]
    fn test_update_ignores_absent_fields() {
        let update = CustomerUpdate {
            lastname: Some("Smith".to_owned()),
            ..CustomerUpdate::default()
        };
        assert_eq!(
            update.validate().unwrap(),
            CustomerChanges {
                lastname: Some("Smith".to_owned()),
                ..CustomerChanges::default()
            }
        );
    }
}
