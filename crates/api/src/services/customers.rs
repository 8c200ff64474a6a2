//! Customer reconciliation.
//!
//! A customer email identifies one person across the whole platform, so when
//! a client submits a customer the service either creates the record or
//! links the client to the one that already exists. A client can never be
//! linked twice to the same customer.
//!
//! [`attach_customer`] only talks to a [`CustomerStore`]; the production
//! store wraps a `PostgreSQL` transaction and the tests use an in-memory one.

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use bilemo_core::{ClientId, CustomerId, Email};

use crate::db::RepositoryError;
use crate::models::{Customer, LinkedCustomer, NewCustomer};

/// How many times a lost insert race is retried as a link.
const MAX_ATTEMPTS: usize = 3;

/// Storage needed by [`attach_customer`].
///
/// All calls on one store value belong to one atomic unit of work.
pub trait CustomerStore {
    /// Find a customer by exact email, with its current link set.
    ///
    /// A found customer must stay in place until the unit of work ends.
    fn find_by_email(
        &mut self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<LinkedCustomer>, RepositoryError>> + Send;

    /// Insert a new customer.
    ///
    /// Returns `RepositoryError::Conflict` when another writer already
    /// inserted the same email.
    fn insert(
        &mut self,
        customer: &NewCustomer,
    ) -> impl Future<Output = Result<Customer, RepositoryError>> + Send;

    /// Link a client to a customer. Returns `false` if the link already existed.
    fn link(
        &mut self,
        client_id: ClientId,
        customer_id: CustomerId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// Errors from [`attach_customer`].
#[derive(Debug, Error)]
pub enum CustomerError {
    /// The acting client already manages this customer.
    #[error("This customer is already associated to this client")]
    DuplicateAssociation,

    /// The email kept colliding with concurrent writers.
    #[error("customer email is already taken")]
    UniquenessConflict,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of a successful attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// A new customer was created and linked to the acting client.
    Created(LinkedCustomer),
    /// The existing customer was linked to the acting client. Its personal
    /// fields are left as they were.
    Linked(LinkedCustomer),
}

impl Attachment {
    #[must_use]
    pub fn into_inner(self) -> LinkedCustomer {
        match self {
            Self::Created(c) | Self::Linked(c) => c,
        }
    }
}

/// Create `submitted` for `client_id`, or link `client_id` to the customer
/// that already has its email.
///
/// # Errors
///
/// - [`CustomerError::DuplicateAssociation`] if the client is already linked
///   to the customer with that email. Nothing is written.
/// - [`CustomerError::UniquenessConflict`] if every attempt lost an insert
///   race.
/// - [`CustomerError::Repository`] for storage failures.
#[instrument(skip(store, client_id, submitted), fields(client_id = %client_id, email = %submitted.email))]
pub async fn attach_customer<S: CustomerStore>(
    store: &mut S,
    client_id: ClientId,
    submitted: &NewCustomer,
) -> Result<Attachment, CustomerError> {
    for attempt in 1..=MAX_ATTEMPTS {
        let Some(mut existing) = store.find_by_email(&submitted.email).await? else {
            match store.insert(submitted).await {
                Ok(customer) => {
                    store.link(client_id, customer.id).await?;
                    info!(customer_id = %customer.id, "customer created");
                    return Ok(Attachment::Created(LinkedCustomer {
                        customer,
                        clients: vec![client_id],
                    }));
                }
                Err(RepositoryError::Conflict(_)) => {
                    debug!(attempt, "customer inserted concurrently, retrying as link");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        };

        if existing.clients.contains(&client_id) {
            return Err(CustomerError::DuplicateAssociation);
        }

        // A concurrent request may have linked the same pair since the read
        if !store.link(client_id, existing.customer.id).await? {
            return Err(CustomerError::DuplicateAssociation);
        }
        existing.clients.push(client_id);
        existing.clients.sort_unstable();
        info!(customer_id = %existing.customer.id, "client linked to existing customer");
        return Ok(Attachment::Linked(existing));
    }

    warn!("giving up after repeated insert conflicts");
    Err(CustomerError::UniquenessConflict)
}
