//! Customer route handlers.
//!
//! Listings are scoped to the acting client unless it is an administrator.
//! Item routes load the current link set first and authorize against it.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use bilemo_core::{Action, Actor, CustomerId, Resource, customer_list_scope};

use crate::db::customers::Detached;
use crate::db::scope::CustomerFilter;
use crate::db::{CustomerRepository, PgCustomerStore};
use crate::error::{AppError, Result};
use crate::middleware::RequireClient;
use crate::models::{
    Customer, CustomerDetail, CustomerInput, CustomerUpdate, LinkedCustomer, Page, PageQuery,
};
use crate::routes::{ApiJson, ApiPath, ApiQuery, authorize};
use crate::services::customers::{Attachment, attach_customer};
use crate::state::AppState;

/// `?email=&page=`
#[derive(Debug, Default, Deserialize)]
pub struct CustomerSearch {
    pub email: Option<String>,
    pub page: Option<u32>,
}

/// `GET /api/customers`
pub async fn index(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiQuery(search): ApiQuery<CustomerSearch>,
) -> Result<Json<Page<Customer>>> {
    let page = PageQuery { page: search.page };
    let per_page = state.page_size();
    let filter = CustomerFilter {
        email: search.email,
    };

    let (customers, total) = CustomerRepository::new(state.pool())
        .list(
            customer_list_scope(&actor),
            &filter,
            page.offset(per_page),
            i64::from(per_page),
        )
        .await?;

    Ok(Json(Page::new(customers, page, per_page, total)))
}

/// `POST /api/customers`
///
/// Responds `201 Created` for a new customer and `200 OK` when the client was
/// linked to a customer that already had this email.
pub async fn create(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiJson(input): ApiJson<CustomerInput>,
) -> Result<(StatusCode, Json<CustomerDetail>)> {
    let submitted = input.validate()?;

    let mut store = PgCustomerStore::begin(state.pool()).await?;
    let attachment = attach_customer(&mut store, actor.id, &submitted).await?;
    store.commit().await?;

    let status = match attachment {
        Attachment::Created(_) => StatusCode::CREATED,
        Attachment::Linked(_) => StatusCode::OK,
    };
    let detail = detail(&state, attachment.into_inner().customer).await?;

    Ok((status, Json(detail)))
}

/// `GET /api/customers/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiPath(id): ApiPath<CustomerId>,
) -> Result<Json<CustomerDetail>> {
    let linked = load_managed(&state, &actor, id).await?;
    Ok(Json(detail(&state, linked.customer).await?))
}

/// `PUT /api/customers/{id}`
///
/// The customer row stays locked from the permission check to the write.
pub async fn update(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiPath(id): ApiPath<CustomerId>,
    ApiJson(input): ApiJson<CustomerUpdate>,
) -> Result<Json<CustomerDetail>> {
    let locked = CustomerRepository::new(state.pool())
        .lock(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {id}")))?;
    authorize(
        &actor,
        &Resource::Customer {
            linked_clients: locked.clients(),
        },
        Action::Manage,
    )?;

    let changes = input.validate()?;
    let customer = locked.update(changes).await?;

    Ok(Json(detail(&state, customer).await?))
}

/// `DELETE /api/customers/{id}`
///
/// An administrator deletes the record. Any other client only removes its own
/// link; the record goes away with the last link.
pub async fn delete(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiPath(id): ApiPath<CustomerId>,
) -> Result<StatusCode> {
    load_managed(&state, &actor, id).await?;
    let customers = CustomerRepository::new(state.pool());

    if actor.is_admin() {
        customers.delete(id).await?;
        tracing::info!(customer_id = %id, "customer deleted");
    } else {
        match customers.detach(actor.id, id).await? {
            Detached::Unlinked => tracing::info!(customer_id = %id, "customer unlinked"),
            Detached::Removed => tracing::info!(customer_id = %id, "customer removed with last link"),
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Load a customer and check that `actor` may manage it.
async fn load_managed(
    state: &AppState,
    actor: &Actor,
    id: CustomerId,
) -> Result<LinkedCustomer> {
    let linked = CustomerRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {id}")))?;

    authorize(
        actor,
        &Resource::Customer {
            linked_clients: &linked.clients,
        },
        Action::Manage,
    )?;

    Ok(linked)
}

async fn detail(state: &AppState, customer: Customer) -> Result<CustomerDetail> {
    let clients = CustomerRepository::new(state.pool())
        .linked_clients(customer.id)
        .await?;
    Ok(CustomerDetail { customer, clients })
}
