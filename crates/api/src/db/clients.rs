//! Client repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use bilemo_core::{ClientId, CustomerId, Email, RoleSet};

use super::{RepositoryError, like_pattern};
use crate::models::{Client, Customer};

const CLIENT_COLUMNS: &str = "id, email, roles, company, created_at";

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: ClientId,
    email: Email,
    roles: Vec<String>,
    company: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ClientRow> for Client {
    type Error = RepositoryError;

    fn try_from(row: ClientRow) -> Result<Self, Self::Error> {
        let roles = RoleSet::parse(&row.roles).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            email: row.email,
            roles,
            company: row.company,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    client: ClientRow,
    password_hash: String,
}

/// Hashed client ready for insertion.
pub struct ClientRecord<'a> {
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub company: &'a str,
    pub roles: &'a RoleSet,
}

/// Column changes for an update. `None` leaves a column unchanged.
#[derive(Default)]
pub struct ClientPatch {
    pub email: Option<Email>,
    pub password_hash: Option<String>,
    pub company: Option<String>,
}

/// Repository for client database operations.
pub struct ClientRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ClientRepository<'a> {
    /// Create a new client repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a client by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored role is unknown.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM bilemo.client WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Client::try_from).transpose()
    }

    /// Get a client and its password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, email), fields(email = %email))]
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Client, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {CLIENT_COLUMNS}, password_hash FROM bilemo.client WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((Client::try_from(r.client)?, r.password_hash)))
            .transpose()
    }

    /// Insert a new client.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    #[instrument(skip(self, record), fields(email = %record.email))]
    pub async fn create(&self, record: &ClientRecord<'_>) -> Result<Client, RepositoryError> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "INSERT INTO bilemo.client (email, password_hash, company, roles)
             VALUES ($1, $2, $3, $4)
             RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(record.email)
        .bind(record.password_hash)
        .bind(record.company)
        .bind(record.roles.names())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "client email"))?;

        Client::try_from(row)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the client does not exist.
    /// Returns `RepositoryError::Conflict` if the new email is taken.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: ClientId, patch: ClientPatch) -> Result<Client, RepositoryError> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "UPDATE bilemo.client
             SET email = COALESCE($2, email),
                 password_hash = COALESCE($3, password_hash),
                 company = COALESCE($4, company)
             WHERE id = $1
             RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.email)
        .bind(patch.password_hash)
        .bind(patch.company)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "client email"))?
        .ok_or(RepositoryError::NotFound)?;

        Client::try_from(row)
    }

    /// Delete a client and every customer left without a link.
    ///
    /// Returns the number of customers removed along with the client.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the client does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ClientId) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lock linked customers in id order before unlinking
        let linked: Vec<CustomerId> = sqlx::query_scalar(
            "SELECT c.id FROM bilemo.customer c
             JOIN bilemo.client_customer cc ON cc.customer_id = c.id
             WHERE cc.client_id = $1
             ORDER BY c.id
             FOR UPDATE OF c",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM bilemo.client WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let orphans = sqlx::query(
            "DELETE FROM bilemo.customer c
             WHERE c.id = ANY($1)
               AND NOT EXISTS (
                   SELECT 1 FROM bilemo.client_customer cc WHERE cc.customer_id = c.id
               )",
        )
        .bind(linked)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(orphans.rows_affected())
    }

    /// List clients, optionally filtered by partial company name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        company: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Client>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bilemo.client");
        push_company_filter(&mut count, company);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CLIENT_COLUMNS} FROM bilemo.client"
        ));
        push_company_filter(&mut query, company);
        query.push(" ORDER BY id LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let clients = query
            .build_query_as::<ClientRow>()
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(Client::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((clients, total))
    }

    /// Customers currently linked to a client.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn customers_of(&self, id: ClientId) -> Result<Vec<Customer>, RepositoryError> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT c.id, c.email, c.firstname, c.lastname, c.created_at
             FROM bilemo.customer c
             JOIN bilemo.client_customer cc ON cc.customer_id = c.id
             WHERE cc.client_id = $1
             ORDER BY c.id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(customers)
    }
}

fn push_company_filter(query: &mut QueryBuilder<'_, Postgres>, company: Option<&str>) {
    if let Some(term) = company.filter(|t| !t.is_empty()) {
        query.push(" WHERE company ILIKE ");
        query.push_bind(like_pattern(term));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_company_filter_is_bound() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bilemo.client");
        push_company_filter(&mut query, Some("acme"));
        assert_eq!(
            query.sql(),
            "SELECT COUNT(*) FROM bilemo.client WHERE company ILIKE $1"
        );
    }

    #[test]
    fn test_empty_company_filter_is_ignored() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bilemo.client");
        push_company_filter(&mut query, Some(""));
        push_company_filter(&mut query, None);
        assert_eq!(query.sql(), "SELECT COUNT(*) FROM bilemo.client");
    }

    #[test]
    fn test_unknown_role_is_corruption() {
        let row = ClientRow {
            id: ClientId::new(1),
            email: Email::parse("a@x.com").unwrap(),
            roles: vec!["ROLE_ROOT".to_owned()],
            company: "Acme".to_owned(),
            created_at: Utc::now(),
        };
        assert!(matches!(
            Client::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
