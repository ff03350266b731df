//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `MySQL` store)
//! 4. [`CurrentStaff`](crate::models::CurrentStaff) extractor in each handler

pub mod auth;
pub mod session;

pub use auth::{clear_current_staff, demo_admin, set_current_staff};
pub use session::{SESSION_COOKIE_NAME, create_session_layer, session_store};
