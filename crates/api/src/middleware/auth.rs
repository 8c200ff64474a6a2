//! Authentication extractor.
//!
//! The session only stores the client identity. [`RequireClient`] reloads the
//! client on every request so authorization always sees current roles and a
//! deleted client loses access immediately.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use bilemo_core::Actor;

use crate::db::ClientRepository;
use crate::error::AppError;
use crate::models::{CurrentClient, session_keys};
use crate::state::AppState;

/// Extractor that requires an authenticated client.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireClient(actor): RequireClient) -> impl IntoResponse {
///     format!("client {}", actor.id)
/// }
/// ```
pub struct RequireClient(pub Actor);

impl FromRequestParts<AppState> for RequireClient {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;

        let current: CurrentClient = session
            .get(session_keys::CURRENT_CLIENT)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))?;

        let Some(client) = ClientRepository::new(state.pool())
            .get_by_id(current.id)
            .await?
        else {
            // Deleted since login
            let _ = session.flush().await;
            return Err(AppError::Unauthorized("Authentication required".to_owned()));
        };

        tracing::Span::current().record("client_id", client.id.as_i32());

        Ok(Self(client.actor()))
    }
}

/// Store the logged-in client in the session.
///
/// The session ID is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_client(
    session: &Session,
    client: &CurrentClient,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_CLIENT, client).await
}

/// Clear the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_client(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
