//! Group-home admin library.
//!
//! JSON API for staff, departments, roles, group homes, residents, usage
//! records, shift preferences and attendance. The binary in `main.rs` serves
//! [`routes::app`]; the CLI and integration tests use the repositories and
//! [`client::ApiClient`] from here.
//!
//! # Security
//!
//! Resident records are personal data. Deploy behind the facility network
//! and turn `DEMO_LOGIN` off outside demos.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
