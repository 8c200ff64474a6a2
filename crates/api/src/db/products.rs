//! Product catalog repository.
//!
//! Configurations are stored with a `position` so a product always returns
//! them in the order they were submitted. Writes that touch more than one
//! table run in a single transaction.

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::instrument;

use bilemo_core::{ConfigurationId, Price, ProductId};

use super::{RepositoryError, like_pattern};
use crate::models::{Configuration, Image, NewProduct, Product, ProductSummary};

const PRODUCT_COLUMNS: &str = "id, name, description, manufacturer, screen, das, weight, \
     length, width, height, wifi, video4k, bluetooth, camera, created_at";

#[derive(sqlx::FromRow)]
struct ConfigurationRow {
    id: ConfigurationId,
    memory: i32,
    color: String,
    price: Price,
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    configuration_id: ConfigurationId,
    #[sqlx(flatten)]
    image: Image,
}

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products, optionally filtered by partial name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        name: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<ProductSummary>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bilemo.product");
        push_name_filter(&mut count, name);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM bilemo.product"));
        push_name_filter(&mut query, name);
        query.push(" ORDER BY id LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let products = query
            .build_query_as::<ProductSummary>()
            .fetch_all(self.pool)
            .await?;

        Ok((products, total))
    }

    /// Get a product with its configurations and their images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let Some(summary) = sqlx::query_as::<_, ProductSummary>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM bilemo.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let configurations = sqlx::query_as::<_, ConfigurationRow>(
            "SELECT id, memory, color, price
             FROM bilemo.configuration
             WHERE product_id = $1
             ORDER BY position, id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<ConfigurationId> = configurations.iter().map(|c| c.id).collect();
        let images = sqlx::query_as::<_, ImageRow>(
            "SELECT configuration_id, id, url
             FROM bilemo.image
             WHERE configuration_id = ANY($1)
             ORDER BY id",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(assemble(summary, configurations, images)))
    }

    /// Insert a product with its configurations and images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create(&self, product: &NewProduct) -> Result<ProductId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: ProductId = sqlx::query_scalar(
            "INSERT INTO bilemo.product
                (name, description, manufacturer, screen, das, weight, length, width, height,
                 wifi, video4k, bluetooth, camera)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING id",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.manufacturer)
        .bind(product.screen)
        .bind(product.das)
        .bind(product.weight)
        .bind(product.length)
        .bind(product.width)
        .bind(product.height)
        .bind(product.wifi)
        .bind(product.video4k)
        .bind(product.bluetooth)
        .bind(product.camera)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product name"))?;

        insert_configurations(&mut tx, id, product).await?;
        tx.commit().await?;

        Ok(id)
    }

    /// Replace every field of a product and its whole configuration set.
    ///
    /// Configurations that are not resubmitted are removed along with their
    /// images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    #[instrument(skip(self, product))]
    pub async fn replace(&self, id: ProductId, product: &NewProduct) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE bilemo.product
             SET name = $2, description = $3, manufacturer = $4, screen = $5, das = $6,
                 weight = $7, length = $8, width = $9, height = $10,
                 wifi = $11, video4k = $12, bluetooth = $13, camera = $14
             WHERE id = $1",
        )
        .bind(id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.manufacturer)
        .bind(product.screen)
        .bind(product.das)
        .bind(product.weight)
        .bind(product.length)
        .bind(product.width)
        .bind(product.height)
        .bind(product.wifi)
        .bind(product.video4k)
        .bind(product.bluetooth)
        .bind(product.camera)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product name"))?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM bilemo.configuration WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_configurations(&mut tx, id, product).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a product. Configurations and images cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bilemo.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete every product. Used by the catalog seeder.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM bilemo.product")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

async fn insert_configurations(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    product: &NewProduct,
) -> Result<(), RepositoryError> {
    for (position, configuration) in product.configurations.iter().enumerate() {
        let position = i32::try_from(position)
            .map_err(|_| RepositoryError::DataCorruption("too many configurations".to_owned()))?;

        let configuration_id: ConfigurationId = sqlx::query_scalar(
            "INSERT INTO bilemo.configuration (product_id, position, memory, color, price)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(product_id)
        .bind(position)
        .bind(configuration.memory)
        .bind(&configuration.color)
        .bind(configuration.price)
        .fetch_one(&mut **tx)
        .await?;

        for url in &configuration.images {
            sqlx::query("INSERT INTO bilemo.image (configuration_id, url) VALUES ($1, $2)")
                .bind(configuration_id)
                .bind(url)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

fn assemble(
    summary: ProductSummary,
    configurations: Vec<ConfigurationRow>,
    images: Vec<ImageRow>,
) -> Product {
    let mut by_configuration: HashMap<ConfigurationId, Vec<Image>> = HashMap::new();
    for row in images {
        by_configuration
            .entry(row.configuration_id)
            .or_default()
            .push(row.image);
    }

    Product {
        summary,
        configurations: configurations
            .into_iter()
            .map(|c| Configuration {
                images: by_configuration.remove(&c.id).unwrap_or_default(),
                id: c.id,
                memory: c.memory,
                color: c.color,
                price: c.price,
            })
            .collect(),
    }
}

fn push_name_filter(query: &mut QueryBuilder<'_, Postgres>, name: Option<&str>) {
    if let Some(term) = name.filter(|t| !t.is_empty()) {
        query.push(" WHERE name ILIKE ");
        query.push_bind(like_pattern(term));
    }
}
