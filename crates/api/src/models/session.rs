//! Session-related types.

use serde::{Deserialize, Serialize};

use bilemo_core::{ClientId, Email};

/// Session-stored client identity.
///
/// Only the identity is stored; roles are reloaded from the database on
/// every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentClient {
    /// Client's database ID.
    pub id: ClientId,
    /// Client's email address.
    pub email: Email,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in client.
    pub const CURRENT_CLIENT: &str = "current_client";
}
