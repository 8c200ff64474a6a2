//! Client account management.
//!
//! This is the only way to create an administrator: registration through the
//! API always yields a plain user.
//!
//! # Environment Variables
//!
//! - `BILEMO_DATABASE_URL` - `PostgreSQL` connection string
//! - `BILEMO_CLIENT_PASSWORD` - Password for the new client

use secrecy::SecretString;
use thiserror::Error;

use bilemo_api::models::ClientInput;
use bilemo_api::services::auth::{AuthError, AuthService};
use bilemo_api::services::validation::Violations;
use bilemo_core::{ClientId, RoleSet};

use super::{MissingEnvVar, database_url};

/// Environment variable holding the new client's password.
const PASSWORD_VAR: &str = "BILEMO_CLIENT_PASSWORD";

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientCommandError {
    #[error(transparent)]
    Env(#[from] MissingEnvVar),

    #[error("Invalid client: {0}")]
    Invalid(Violations),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Client already exists with email: {0}")]
    ClientExists(String),

    #[error(transparent)]
    Auth(AuthError),
}

/// Create a client, optionally with the administrator role.
///
/// # Errors
///
/// Returns an error if the input is invalid, the email is taken or the
/// database is unreachable.
pub async fn create(email: &str, company: &str, admin: bool) -> Result<ClientId, ClientCommandError> {
    let database_url = database_url()?;
    let password = std::env::var(PASSWORD_VAR)
        .map(SecretString::from)
        .map_err(|_| MissingEnvVar(PASSWORD_VAR))?;

    let mut client = ClientInput {
        email: email.to_owned(),
        password,
        company: company.to_owned(),
    }
    .validate()
    .map_err(ClientCommandError::Invalid)?;
    if admin {
        client.roles = RoleSet::admin();
    }

    tracing::info!("Connecting to database...");
    let pool = bilemo_api::db::create_pool(&database_url).await?;

    let created = AuthService::new(&pool)
        .register(client)
        .await
        .map_err(|e| match e {
            AuthError::ClientAlreadyExists => ClientCommandError::ClientExists(email.to_owned()),
            other => ClientCommandError::Auth(other),
        })?;

    tracing::info!(
        "Client created successfully! ID: {}, Email: {}, Roles: {}",
        created.id,
        created.email,
        created.roles.names().join(", ")
    );

    Ok(created.id)
}
