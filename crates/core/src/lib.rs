//! Group-home admin core: shared types and validation rules.
//!
//! This crate provides the pieces used by every component of the system:
//! - `admin` - JSON API server
//! - `cli` - migrations, seeding and exports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Every rule that decides whether a form may be
//! saved lives here so it can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - IDs, emails, statuses, disability levels, months, permissions
//! - [`period`] - effective-dated periods and the history overlap validator
//! - [`case`] - snake_case / camelCase field-name mapping
//! - [`rooms`] - room rosters and expansion rules
//! - [`attendance`] - worked-time calculation and monthly totals
//! - [`validation`] - field-scoped validation error collection

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod attendance;
pub mod case;
pub mod period;
pub mod rooms;
pub mod types;
pub mod validation;

pub use types::*;
