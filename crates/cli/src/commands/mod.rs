//! Command implementations.

pub mod client;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use thiserror::Error;

/// Environment error shared by every command.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);

/// Database URL from `BILEMO_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// Loads `.env` first.
pub fn database_url() -> Result<SecretString, MissingEnvVar> {
    dotenvy::dotenv().ok();

    std::env::var("BILEMO_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MissingEnvVar("BILEMO_DATABASE_URL"))
}
