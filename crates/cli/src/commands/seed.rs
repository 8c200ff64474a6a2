//! Seed the product catalog from a YAML file.
//!
//! The whole file is validated before the database is touched. Products
//! whose name already exists are skipped, so a seed can be re-run safely.
//!
//! ```yaml
//! products:
//!   - name: Galaxy S21
//!     description: ...
//!     configurations:
//!       - memory: 128
//!         color: Phantom Gray
//!         price: "859.00"
//!         images:
//!           - url: https://cdn.bilemo.com/s21-gray.jpg
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use bilemo_api::db::{ProductRepository, RepositoryError, create_pool};
use bilemo_api::models::{NewProduct, ProductInput};

use super::database_url;

/// Catalog file layout.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<ProductInput>,
}

/// Parse and validate a catalog, collecting every error with the index of
/// the product it belongs to.
///
/// # Errors
///
/// Returns the list of error messages if any product is invalid.
pub fn validate_catalog(catalog: CatalogFile) -> Result<Vec<NewProduct>, Vec<String>> {
    let mut products = Vec::with_capacity(catalog.products.len());
    let mut errors = Vec::new();

    for (i, input) in catalog.products.into_iter().enumerate() {
        let name = input.name.clone();
        match input.validate() {
            Ok(product) => products.push(product),
            Err(violations) => errors.push(format!("products[{i}] ({name}): {violations}")),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

/// Seed products from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML catalog
/// * `clear_existing` - If true, delete every product first
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any product is
/// invalid, or database operations fail.
pub async fn catalog(file_path: &str, clear_existing: bool) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;
    info!(products = catalog.products.len(), "Parsed catalog");

    let products = match validate_catalog(catalog) {
        Ok(products) => products,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} invalid products", errors.len()).into());
        }
    };

    let pool = create_pool(&database_url).await?;
    info!("Connected to database");
    let repository = ProductRepository::new(&pool);

    if clear_existing {
        let removed = repository.clear().await?;
        info!(removed, "Cleared existing products");
    }

    let mut created = 0_usize;
    let mut skipped = 0_usize;
    for product in &products {
        match repository.create(product).await {
            Ok(id) => {
                info!(product_id = %id, name = %product.name, "Product created");
                created += 1;
            }
            Err(RepositoryError::Conflict(_)) => {
                warn!(name = %product.name, "Product already exists, skipping");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(created, skipped, "Catalog seeding complete");
    Ok(())
}
