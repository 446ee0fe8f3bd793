//! Order Portal Core - Shared types library.
//!
//! This crate provides common types used across all Order Portal components:
//! - `server` - Back-office API server (orders, queries, reports, scheduler)
//! - `integration-tests` - In-memory store implementations and property tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money math, statuses, and report ranges

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
