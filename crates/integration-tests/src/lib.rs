//! Integration tests for the group-home admin API.
//!
//! # Running Tests
//!
//! ```bash
//! gh-cli migrate && gh-cli seed
//! cargo run -p grouphome-admin   # with DEMO_LOGIN=true
//! cargo test -p grouphome-integration-tests -- --ignored
//! ```
//!
//! The tests log in through demo login and create their own records with
//! unique names, deleting them afterwards.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;

/// Base URL for the admin API (configurable via environment).
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("GROUPHOME_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3001".to_string())
}

/// A client that keeps the session cookie between requests.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A suffix that keeps names unique across test runs.
#[must_use]
pub fn unique_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:x}")
}
