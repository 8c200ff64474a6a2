//! BileMo Core - Shared types and access policy.
//!
//! This crate provides the pieces of the catalog API that do not touch I/O.
//! It is shared by:
//! - `api` - HTTP service (repositories, reconciler, routes)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure decision functions - no
//! database access, no HTTP. This keeps the authorization rules testable in
//! isolation and usable from both the server and the CLI.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, roles and prices
//! - [`access`] - The authorization engine (who may manage which record)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod types;

pub use access::{Action, Actor, ListScope, Resource, can_access, customer_list_scope};
pub use types::*;
