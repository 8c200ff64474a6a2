//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (recorded on the span, echoed on the response)
//! 4. Security headers
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! The login route additionally carries the governor rate limiter.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireClient, clear_current_client, set_current_client};
pub use rate_limit::{RateLimiterLayer, login_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
