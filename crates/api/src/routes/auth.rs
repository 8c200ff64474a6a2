//! Session login and logout.

use axum::{Json, extract::State, http::StatusCode};
use tower_sessions::Session;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_client, set_current_client};
use crate::models::{Client, CurrentClient, LoginInput};
use crate::routes::ApiJson;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// `POST /api/login`
#[tracing::instrument(skip(state, session, input))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<Json<Client>> {
    let client = AuthService::new(state.pool())
        .login(&input.email, &input.password)
        .await?;

    set_current_client(
        &session,
        &CurrentClient {
            id: client.id,
            email: client.email.clone(),
        },
    )
    .await
    .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    set_sentry_user(&client.id, Some(client.email.as_str()));
    tracing::info!(client_id = %client.id, "client logged in");

    Ok(Json(client))
}

/// `POST /api/logout`
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_client(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();

    Ok(StatusCode::NO_CONTENT)
}
