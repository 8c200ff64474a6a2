//! Authentication service.
//!
//! Password login for clients plus the credential handling shared by
//! registration, client updates and the CLI. Plaintext passwords only ever
//! live in a [`SecretString`] and are dropped as soon as they are hashed.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing::instrument;

use bilemo_core::{ClientId, Email};

use crate::db::RepositoryError;
use crate::db::clients::{ClientPatch, ClientRecord, ClientRepository};
use crate::models::{Client, ClientChanges, NewClient};

/// Authentication service.
///
/// Handles client registration, login and credential updates.
pub struct AuthService<'a> {
    clients: ClientRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            clients: ClientRepository::new(pool),
        }
    }

    /// Register a validated client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClientAlreadyExists` if the email is already registered.
    #[instrument(skip(self, client), fields(email = %client.email))]
    pub async fn register(&self, client: NewClient) -> Result<Client, AuthError> {
        let password_hash = hash_password(&client.password)?;
        drop(client.password);

        self.clients
            .create(&ClientRecord {
                email: &client.email,
                password_hash: &password_hash,
                company: &client.company,
                roles: &client.roles,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::ClientAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password does not match.
    #[instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Client, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (client, password_hash) = self
            .clients
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(client)
    }

    /// Apply validated changes to a client, hashing a new password if one
    /// was submitted.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClientAlreadyExists` if the new email is taken.
    /// Returns `AuthError::Repository` with `NotFound` if the client is gone.
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: ClientId, changes: ClientChanges) -> Result<Client, AuthError> {
        let password_hash = changes
            .password
            .as_ref()
            .map(hash_password)
            .transpose()?;
        drop(changes.password);

        self.clients
            .update(
                id,
                ClientPatch {
                    email: changes.email,
                    password_hash,
                    company: changes.company,
                },
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::ClientAlreadyExists,
                other => AuthError::Repository(other),
            })
    }
}

/// Hash a password with argon2 and a random salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &SecretString) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &SecretString, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
