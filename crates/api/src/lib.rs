//! BileMo catalog API library.
//!
//! The HTTP service for resellers (clients) managing their end customers and
//! browsing the device catalog, exposed as a library so the CLI can share its
//! repositories and credential handling.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
