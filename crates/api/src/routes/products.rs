//! Product catalog route handlers.
//!
//! Every authenticated client can browse the catalog; only administrators
//! change it.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use bilemo_core::{Action, ProductId, Resource};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireClient;
use crate::models::{Page, PageQuery, Product, ProductInput, ProductSummary};
use crate::routes::{ApiJson, ApiPath, ApiQuery, authorize};
use crate::state::AppState;

/// `?name=&page=`
#[derive(Debug, Default, Deserialize)]
pub struct ProductSearch {
    pub name: Option<String>,
    pub page: Option<u32>,
}

/// `GET /api/products`
pub async fn index(
    State(state): State<AppState>,
    RequireClient(_): RequireClient,
    ApiQuery(search): ApiQuery<ProductSearch>,
) -> Result<Json<Page<ProductSummary>>> {
    let page = PageQuery { page: search.page };
    let per_page = state.page_size();
    let (products, total) = ProductRepository::new(state.pool())
        .list(
            search.name.as_deref(),
            page.offset(per_page),
            i64::from(per_page),
        )
        .await?;

    Ok(Json(Page::new(products, page, per_page, total)))
}

/// `GET /api/products/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireClient(_): RequireClient,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(load(&state, id).await?))
}

/// `POST /api/products`
pub async fn create(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    authorize(&actor, &Resource::Product, Action::Manage)?;

    let product = input.validate()?;
    let id = ProductRepository::new(state.pool()).create(&product).await?;
    tracing::info!(product_id = %id, "product created");

    Ok((StatusCode::CREATED, Json(load(&state, id).await?)))
}

/// `PUT /api/products/{id}`
///
/// Full replacement, including the configuration set.
pub async fn update(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<Json<Product>> {
    authorize(&actor, &Resource::Product, Action::Manage)?;

    let product = input.validate()?;
    ProductRepository::new(state.pool())
        .replace(id, &product)
        .await?;

    Ok(Json(load(&state, id).await?))
}

/// `DELETE /api/products/{id}`
pub async fn delete(
    State(state): State<AppState>,
    RequireClient(actor): RequireClient,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode> {
    authorize(&actor, &Resource::Product, Action::Manage)?;

    ProductRepository::new(state.pool()).delete(id).await?;
    tracing::info!(product_id = %id, "product deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn load(state: &AppState, id: ProductId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}
