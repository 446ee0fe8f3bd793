//! Order Portal server library.
//!
//! This crate provides the back-office API as a library so the binary stays
//! a thin wiring layer and the pieces can be exercised from tests.
//!
//! # Architecture
//!
//! - Axum JSON API with bearer-token sessions
//! - `PostgreSQL` via sqlx for orders, queries, users and sessions
//! - Background scheduler emailing query-expiry notifications
//! - lettre over SMTP for outbound mail (disabled when unconfigured)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
