//! Product catalog models.
//!
//! A product owns an ordered list of configurations and each configuration
//! owns its images. Neither child exists without its parent.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bilemo_core::{ConfigurationId, ImageId, Price, ProductId};

use crate::services::validation::Violations;

/// Product fields without children, as shown in listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub screen: f64,
    pub das: f64,
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub wifi: bool,
    pub video4k: bool,
    pub bluetooth: bool,
    pub camera: bool,
    pub created_at: DateTime<Utc>,
}

/// A product with its configurations.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    #[serde(flatten)]
    pub summary: ProductSummary,
    pub configurations: Vec<Configuration>,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, Serialize)]
pub struct Configuration {
    pub id: ConfigurationId,
    pub memory: i32,
    pub color: String,
    pub price: Price,
    pub images: Vec<Image>,
}

/// Image of a configuration.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Image {
    pub id: ImageId,
    pub url: String,
}

/// Product payload, used both for creation and full replacement.
#[derive(Debug, Default, Deserialize)]
pub struct ProductInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub manufacturer: String,
    pub screen: Option<f64>,
    pub das: Option<f64>,
    pub weight: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub wifi: Option<bool>,
    pub video4k: Option<bool>,
    pub bluetooth: Option<bool>,
    pub camera: Option<bool>,
    #[serde(default)]
    pub configurations: Vec<ConfigurationInput>,
}

/// Configuration payload.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigurationInput {
    pub memory: Option<i32>,
    #[serde(default)]
    pub color: String,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<ImageInput>,
}

/// Image payload.
#[derive(Debug, Deserialize)]
pub struct ImageInput {
    pub url: String,
}

/// A validated product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub screen: f64,
    pub das: f64,
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub wifi: bool,
    pub video4k: bool,
    pub bluetooth: bool,
    pub camera: bool,
    pub configurations: Vec<NewConfiguration>,
}

/// A validated configuration. Position is its index in the product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConfiguration {
    pub memory: i32,
    pub color: String,
    pub price: Price,
    pub images: Vec<String>,
}

impl ProductInput {
    /// # Errors
    ///
    /// Returns every violated constraint, including those of nested
    /// configurations and images.
    pub fn validate(self) -> Result<NewProduct, Violations> {
        let mut violations = Violations::new();
        violations.check_length("name", &self.name, 2, 50);
        violations.check_length("description", &self.description, 6, 3000);
        violations.check_length("manufacturer", &self.manufacturer, 2, 50);

        let mut measure = |field: &str, value: Option<f64>| match value {
            Some(v) => {
                violations.check_positive(field, v);
                v
            }
            None => {
                violations.add(field, "This value should not be blank.");
                0.0
            }
        };
        let screen = measure("screen", self.screen);
        let weight = measure("weight", self.weight);
        let length = measure("length", self.length);
        let width = measure("width", self.width);
        let height = measure("height", self.height);

        let das = match self.das {
            Some(v) if v.is_finite() => v,
            Some(_) => {
                violations.add("das", "This value should be a number.");
                0.0
            }
            None => {
                violations.add("das", "This value should not be blank.");
                0.0
            }
        };

        let mut flag = |field: &str, value: Option<bool>| {
            value.unwrap_or_else(|| {
                violations.add(field, "This value should not be null.");
                false
            })
        };
        let wifi = flag("wifi", self.wifi);
        let video4k = flag("video4k", self.video4k);
        let bluetooth = flag("bluetooth", self.bluetooth);
        let camera = flag("camera", self.camera);

        if self.configurations.is_empty() {
            violations.add("configurations", "You must specify at least one configuration");
        }
        let mut configurations = Vec::with_capacity(self.configurations.len());
        for (i, input) in self.configurations.into_iter().enumerate() {
            match input.validate() {
                Ok(configuration) => configurations.push(configuration),
                Err(nested) => violations.nest(&format!("configurations[{i}]"), nested),
            }
        }

        violations.finish(NewProduct {
            name: self.name.trim().to_owned(),
            description: self.description.trim().to_owned(),
            manufacturer: self.manufacturer.trim().to_owned(),
            screen,
            das,
            weight,
            length,
            width,
            height,
            wifi,
            video4k,
            bluetooth,
            camera,
            configurations,
        })
    }
}

impl ConfigurationInput {
    fn validate(self) -> Result<NewConfiguration, Violations> {
        let mut violations = Violations::new();

        let memory = match self.memory {
            Some(m) if m > 0 => m,
            Some(_) => {
                violations.add("memory", "This value should be positive.");
                0
            }
            None => {
                violations.add("memory", "This value should not be blank.");
                0
            }
        };
        violations.check_length("color", &self.color, 2, 50);

        let price = match self.price.map(Price::new) {
            Some(Ok(price)) => Some(price),
            Some(Err(e)) => {
                violations.add("price", e.to_string());
                None
            }
            None => {
                violations.add("price", "This value should not be blank.");
                None
            }
        };

        for (i, image) in self.images.iter().enumerate() {
            violations.check_url(&format!("images[{i}].url"), &image.url);
        }

        match price {
            Some(price) => violations.finish(NewConfiguration {
                memory,
                color: self.color.trim().to_owned(),
                price,
                images: self.images.into_iter().map(|i| i.url).collect(),
            }),
            None => Err(violations),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "name": "Galaxy S21",
        "description": "Flagship phone with a bright screen",
        "manufacturer": "Samsung",
        "screen": 6.2, "das": 1.2,
        "weight": 171, "length": 151.7, "width": 71.2, "height": 7.9,
        "wifi": true, "video4k": true, "bluetooth": true, "camera": true,
        "configurations": [
            {"memory": 128, "color": "Phantom Gray", "price": "859.00",
             "images": [{"url": "https://cdn.bilemo.com/s21-gray.jpg"}]},
            {"memory": 256, "color": "Phantom White", "price": 909.99, "images": []}
        ]
    }"#;

    #[test]
    fn test_valid_product() {
        let input: ProductInput = serde_json::from_str(VALID).unwrap();
        let product = input.validate().unwrap();
        assert_eq!(product.configurations.len(), 2);
        assert_eq!(product.configurations[0].images.len(), 1);
        assert_eq!(
            product.configurations[1].price.amount(),
            Decimal::new(90_999, 2)
        );
    }

    #[test]
    fn test_requires_a_configuration() {
        let mut input: ProductInput = serde_json::from_str(VALID).unwrap();
        input.configurations.clear();
        let violations = input.validate().unwrap_err();
        assert_eq!(violations.as_slice()[0].property_path, "configurations");
    }

    #[test]
    fn test_nested_violations_have_paths() {
        let mut input: ProductInput = serde_json::from_str(VALID).unwrap();
        input.configurations[1].price = Some(Decimal::ZERO);
        input.configurations[1].images.push(ImageInput {
            url: "not a url".to_owned(),
        });
        let violations = input.validate().unwrap_err();
        let paths: Vec<_> = violations
            .as_slice()
            .iter()
            .map(|v| v.property_path.as_str())
            .collect();
        assert_eq!(
            paths,
            ["configurations[1].price", "configurations[1].images[0].url"]
        );
    }

    #[test]
    fn test_missing_measurements_and_flags() {
        let input = ProductInput {
            name: "Phone".to_owned(),
            description: "A phone".to_owned(),
            manufacturer: "Acme".to_owned(),
            configurations: vec![ConfigurationInput {
                memory: Some(64),
                color: "Black".to_owned(),
                price: Some(Decimal::new(19_900, 2)),
                images: vec![],
            }],
            ..ProductInput::default()
        };
        // screen, weight, length, width, height, das, and four flags
        assert_eq!(input.validate().unwrap_err().as_slice().len(), 10);
    }
}
