//! Business logic services.

pub mod auth;
pub mod customers;
pub mod validation;
