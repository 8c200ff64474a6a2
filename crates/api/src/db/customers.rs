//! Customer repository and the transactional store used by the reconciler.

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::instrument;

use bilemo_core::{ClientId, CustomerId, Email, ListScope};

use super::RepositoryError;
use super::scope::{CustomerFilter, push_customer_conditions};
use crate::models::{Customer, CustomerChanges, LinkedClient, LinkedCustomer, NewCustomer};
use crate::services::customers::CustomerStore;

const CUSTOMER_COLUMNS: &str = "id, email, firstname, lastname, created_at";

/// Customer columns plus the ordered ids of every linked client.
const LINKED_CUSTOMER_SELECT: &str = "SELECT c.id, c.email, c.firstname, c.lastname, c.created_at,
        ARRAY(
            SELECT cc.client_id FROM bilemo.client_customer cc
            WHERE cc.customer_id = c.id ORDER BY cc.client_id
        ) AS clients
     FROM bilemo.customer c";

#[derive(sqlx::FromRow)]
struct LinkedCustomerRow {
    #[sqlx(flatten)]
    customer: Customer,
    clients: Vec<ClientId>,
}

impl From<LinkedCustomerRow> for LinkedCustomer {
    fn from(row: LinkedCustomerRow) -> Self {
        Self {
            customer: row.customer,
            clients: row.clients,
        }
    }
}

/// Outcome of removing a client's link to a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detached {
    /// Other clients still manage the customer.
    Unlinked,
    /// That was the last link; the customer record is gone too.
    Removed,
}

/// Repository for customer reads and single-row writes.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List customers visible in `scope`, narrowed by `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        scope: ListScope,
        filter: &CustomerFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Customer>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bilemo.customer c");
        push_customer_conditions(&mut count, scope, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT c.id, c.email, c.firstname, c.lastname, c.created_at FROM bilemo.customer c",
        );
        push_customer_conditions(&mut query, scope, filter);
        query.push(" ORDER BY c.id LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let customers = query
            .build_query_as::<Customer>()
            .fetch_all(self.pool)
            .await?;

        Ok((customers, total))
    }

    /// Get a customer with its current link set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: CustomerId) -> Result<Option<LinkedCustomer>, RepositoryError> {
        let row = sqlx::query_as::<_, LinkedCustomerRow>(&format!(
            "{LINKED_CUSTOMER_SELECT} WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(LinkedCustomer::from))
    }

    /// Id and company of every client linked to a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn linked_clients(&self, id: CustomerId) -> Result<Vec<LinkedClient>, RepositoryError> {
        let clients = sqlx::query_as::<_, LinkedClient>(
            "SELECT cl.id, cl.company
             FROM bilemo.client cl
             JOIN bilemo.client_customer cc ON cc.client_id = cl.id
             WHERE cc.customer_id = $1
             ORDER BY cl.id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(clients)
    }

    /// Lock a customer row and read its link set.
    ///
    /// The row stays locked until the returned value is updated or dropped,
    /// so the link set cannot change under the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn lock(&self, id: CustomerId) -> Result<Option<LockedCustomer>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM bilemo.customer WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(customer) = customer else {
            return Ok(None);
        };
        let clients = link_set(&mut *tx, id).await?;

        Ok(Some(LockedCustomer {
            tx,
            linked: LinkedCustomer { customer, clients },
        }))
    }

    /// Remove a client's link to a customer, deleting the customer when no
    /// other client remains linked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the link does not exist.
    #[instrument(skip(self))]
    pub async fn detach(
        &self,
        client_id: ClientId,
        customer_id: CustomerId,
    ) -> Result<Detached, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Concurrent detaches and attaches of this customer queue here
        let locked: Option<CustomerId> =
            sqlx::query_scalar("SELECT id FROM bilemo.customer WHERE id = $1 FOR UPDATE")
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let unlinked = sqlx::query(
            "DELETE FROM bilemo.client_customer WHERE client_id = $1 AND customer_id = $2",
        )
        .bind(client_id)
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;
        if unlinked.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let detached = if link_set(&mut *tx, customer_id).await?.is_empty() {
            sqlx::query("DELETE FROM bilemo.customer WHERE id = $1")
                .bind(customer_id)
                .execute(&mut *tx)
                .await?;
            Detached::Removed
        } else {
            Detached::Unlinked
        };

        tx.commit().await?;
        Ok(detached)
    }

    /// Delete a customer record and all its links.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bilemo.customer WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// A customer row held under `FOR UPDATE` together with its link set.
pub struct LockedCustomer {
    tx: Transaction<'static, Postgres>,
    linked: LinkedCustomer,
}

impl LockedCustomer {
    /// Ids of the clients linked to the locked customer.
    #[must_use]
    pub fn clients(&self) -> &[ClientId] {
        &self.linked.clients
    }

    /// Apply a partial update and release the lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new email is taken.
    #[instrument(skip(self, changes), fields(customer_id = %self.linked.customer.id))]
    pub async fn update(mut self, changes: CustomerChanges) -> Result<Customer, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "UPDATE bilemo.customer
             SET email = COALESCE($2, email),
                 firstname = COALESCE($3, firstname),
                 lastname = COALESCE($4, lastname)
             WHERE id = $1
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(self.linked.customer.id)
        .bind(changes.email)
        .bind(changes.firstname)
        .bind(changes.lastname)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "customer email"))?;

        self.tx.commit().await?;
        Ok(customer)
    }
}

/// Client ids linked to a customer, read with a fresh snapshot.
async fn link_set(
    conn: &mut PgConnection,
    customer_id: CustomerId,
) -> Result<Vec<ClientId>, RepositoryError> {
    let clients = sqlx::query_scalar::<_, ClientId>(
        "SELECT client_id FROM bilemo.client_customer
         WHERE customer_id = $1
         ORDER BY client_id",
    )
    .bind(customer_id)
    .fetch_all(conn)
    .await?;

    Ok(clients)
}

/// [`CustomerStore`] over a single `PostgreSQL` transaction.
///
/// Nothing is visible to other requests until [`PgCustomerStore::commit`].
pub struct PgCustomerStore {
    tx: Transaction<'static, Postgres>,
}

impl PgCustomerStore {
    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if no connection is available.
    pub async fn begin(pool: &PgPool) -> Result<Self, RepositoryError> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }

    /// Commit every write made through this store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the commit fails.
    pub async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

impl CustomerStore for PgCustomerStore {
    async fn find_by_email(
        &mut self,
        email: &Email,
    ) -> Result<Option<LinkedCustomer>, RepositoryError> {
        // Shares the lock a detach takes, so the row cannot vanish before link
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM bilemo.customer WHERE email = $1 FOR SHARE"
        ))
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;
        let Some(customer) = customer else {
            return Ok(None);
        };
        let clients = link_set(&mut *self.tx, customer.id).await?;

        Ok(Some(LinkedCustomer { customer, clients }))
    }

    async fn insert(&mut self, customer: &NewCustomer) -> Result<Customer, RepositoryError> {
        // DO NOTHING keeps the transaction usable when a concurrent insert wins
        sqlx::query_as::<_, Customer>(&format!(
            "INSERT INTO bilemo.customer (email, firstname, lastname)
             VALUES ($1, $2, $3)
             ON CONFLICT (email) DO NOTHING
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(&customer.email)
        .bind(&customer.firstname)
        .bind(&customer.lastname)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("customer email already exists".to_owned()))
    }

    async fn link(
        &mut self,
        client_id: ClientId,
        customer_id: CustomerId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO bilemo.client_customer (client_id, customer_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(client_id)
        .bind(customer_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
