//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/login             - Open a session (rate limited)
//! POST   /api/logout            - Close the session
//!
//! # Clients
//! POST   /api/clients           - Register (public)
//! GET    /api/clients           - List clients (admin)
//! GET    /api/clients/{id}      - Client with its customers
//! PUT    /api/clients/{id}      - Partial update
//! DELETE /api/clients/{id}      - Delete, with orphaned customers
//!
//! # Customers
//! GET    /api/customers         - List visible customers
//! POST   /api/customers         - Create, or link to the existing customer
//! GET    /api/customers/{id}    - Customer with its linked clients
//! PUT    /api/customers/{id}    - Partial update
//! DELETE /api/customers/{id}    - Detach (client) or delete (admin)
//!
//! # Products
//! GET    /api/products          - Catalog listing
//! GET    /api/products/{id}     - Product with configurations and images
//! POST   /api/products          - Create (admin)
//! PUT    /api/products/{id}     - Replace (admin)
//! DELETE /api/products/{id}     - Delete (admin)
//! ```

pub mod auth;
pub mod clients;
pub mod customers;
pub mod products;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    routing::{get, post},
};

use bilemo_core::{Action, Actor, Resource, can_access};

use crate::error::AppError;
use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// JSON body extractor that rejects with [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor that rejects with [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path extractor that rejects with [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Fail with [`AppError::Forbidden`] unless `actor` may perform `action`.
pub(crate) fn authorize(
    actor: &Actor,
    resource: &Resource<'_>,
    action: Action,
) -> Result<(), AppError> {
    if can_access(Some(actor), resource, action) {
        Ok(())
    } else {
        tracing::debug!(client_id = %actor.id, ?resource, ?action, "access denied");
        Err(AppError::Forbidden)
    }
}

/// Build the `/api` router.
pub fn routes(login_limiter: RateLimiterLayer) -> Router<AppState> {
    Router::new()
        .merge(
            Router::new()
                .route("/api/login", post(auth::login))
                .layer(login_limiter),
        )
        .route("/api/logout", post(auth::logout))
        .merge(client_routes())
        .merge(customer_routes())
        .merge(product_routes())
}

fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(clients::index).post(clients::register))
        .route(
            "/api/clients/{id}",
            get(clients::show)
                .put(clients::update)
                .delete(clients::delete),
        )
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(customers::index).post(customers::create))
        .route(
            "/api/customers/{id}",
            get(customers::show)
                .put(customers::update)
                .delete(customers::delete),
        )
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products::index).post(products::create))
        .route(
            "/api/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bilemo_core::{ClientId, RoleSet};

    use super::*;

    #[test]
    fn test_authorize_maps_denial_to_forbidden() {
        let actor = Actor::new(ClientId::new(1), RoleSet::user());
        assert!(authorize(&actor, &Resource::Client(ClientId::new(1)), Action::Manage).is_ok());
        assert!(matches!(
            authorize(&actor, &Resource::Client(ClientId::new(2)), Action::Manage),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            authorize(&actor, &Resource::Product, Action::Manage),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_admin_manages_products() {
        let admin = Actor::new(ClientId::new(9), RoleSet::admin());
        assert!(authorize(&admin, &Resource::Product, Action::Manage).is_ok());
    }
}
