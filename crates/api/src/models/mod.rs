//! Domain models for the catalog API.
//!
//! Response types serialize with camelCase keys. Request payloads and their
//! validation live next to the model they produce.

pub mod client;
pub mod customer;
pub mod page;
pub mod product;
pub mod session;

pub use client::{
    Client, ClientChanges, ClientDetail, ClientInput, ClientUpdate, LoginInput, NewClient,
};
pub use customer::{
    Customer, CustomerChanges, CustomerDetail, CustomerInput, CustomerUpdate, LinkedClient,
    LinkedCustomer, NewCustomer,
};
pub use page::{Page, PageQuery};
pub use product::{
    Configuration, ConfigurationInput, Image, ImageInput, NewConfiguration, NewProduct, Product,
    ProductInput, ProductSummary,
};
pub use session::{CurrentClient, keys as session_keys};
