//! Client route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;

use bilemo_core::{Action, ClientId, Resource};

use crate::db::ClientRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireClient, clear_current_client};
use crate::models::{Client, ClientDetail, ClientInput, ClientUpdate, Page, PageQuery};
use crate::routes::{ApiJson, ApiPath, ApiQuery, authorize};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// `?company=&page=`
#[derive(Debug, Default, Deserialize)]
pub struct ClientSearch {
    pub company: Option<String>,
    pub page: Option<u32>,
}

/// `POST /api/clients`
///
/// Open registration. Whatever the payload says, the new client only holds
/// the user role.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ClientInput>,
) -> Result<(StatusCode, Json<Client>)> {
    let new_client = input.validate()?;
    let client = AuthService::new(state.pool()).register(new_client).await?;

    tracing::info!(client_id = %client.id, "client registered");
    Ok((StatusCode::CREATED, Json(client)))
}

/// `GET /api/clients`
pub async fn index(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiQuery(search): ApiQuery<ClientSearch>,
) -> Result<Json<Page<Client>>> {
    authorize(&actor, &Resource::Clients, Action::List)?;

    let page = PageQuery { page: search.page };
    let per_page = state.page_size();
    let (clients, total) = ClientRepository::new(state.pool())
        .list(
            search.company.as_deref(),
            page.offset(per_page),
            i64::from(per_page),
        )
        .await?;

    Ok(Json(Page::new(clients, page, per_page, total)))
}

/// `GET /api/clients/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiPath(id): ApiPath<ClientId>,
) -> Result<Json<ClientDetail>> {
    authorize(&actor, &Resource::Client(id), Action::Manage)?;

    let clients = ClientRepository::new(state.pool());
    let client = clients
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("client {id}")))?;
    let customers = clients.customers_of(id).await?;

    Ok(Json(ClientDetail { client, customers }))
}

/// `PUT /api/clients/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiPath(id): ApiPath<ClientId>,
    ApiJson(input): ApiJson<ClientUpdate>,
) -> Result<Json<Client>> {
    authorize(&actor, &Resource::Client(id), Action::Manage)?;

    let changes = input.validate()?;
    let client = AuthService::new(state.pool()).update(id, changes).await?;

    Ok(Json(client))
}

/// `DELETE /api/clients/{id}`
///
/// Customers that were only linked to this client go with it.
pub async fn delete(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiPath(id): ApiPath<ClientId>,
    session: Session,
) -> Result<StatusCode> {
    authorize(&actor, &Resource::Client(id), Action::Manage)?;

    let orphans = ClientRepository::new(state.pool()).delete(id).await?;
    tracing::info!(client_id = %id, orphans, "client deleted");

    if actor.id == id {
        clear_current_client(&session)
            .await
            .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    }

    Ok(StatusCode::NO_CONTENT)
}
