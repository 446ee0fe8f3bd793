//! HTTP route handlers for the portal API.
//!
//! All responses are JSON; errors carry `{ "message": ... }`. Authenticated
//! routes take a bearer token; admins may add `?user=<id>` to act on another
//! user's data and `?account=<ref>` narrows listings to one sub-account.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/auth/login            - Issue a session token
//! POST   /api/auth/register         - Create a user (admin only)
//! POST   /api/auth/logout           - Revoke the current session
//! POST   /api/auth/forgot           - Email a password-reset code
//! POST   /api/auth/verify-code      - Check a reset code
//! POST   /api/auth/reset            - Reset the password with a code
//!
//! # Orders
//! POST   /api/orders                - Create an order
//! GET    /api/orders                - List active orders
//! GET    /api/orders/deleted        - List trashed orders
//! PUT    /api/orders/{id}           - Update an order
//! DELETE /api/orders/{id}           - Move an order to the trash
//! PUT    /api/orders/{id}/restore   - Restore a trashed order
//! DELETE /api/orders/{id}/permanent - Permanently delete an order
//! POST   /api/orders/delete-multiple - Permanently delete a batch
//!
//! # Queries
//! POST   /api/queries               - Create a query
//! GET    /api/queries               - List queries
//! PUT    /api/queries/{id}          - Update a query
//! DELETE /api/queries/{id}          - Delete a query
//!
//! # Reports
//! GET    /api/reports               - Profit/ROI summary
//! GET    /api/reports/orders        - Orders export (attachment)
//! GET    /api/reports/queries       - Queries export (attachment)
//! GET    /api/charts/profit         - Net profit per day of month
//!
//! # Users (admin only)
//! GET    /api/users                 - List users
//! PUT    /api/users/{id}            - Update a user
//! DELETE /api/users/{id}            - Delete a user (cascades)
//! GET    /api/users/{id}/accounts   - List a user's sub-accounts
//! POST   /api/users/{id}/accounts   - Attach a sub-account
//! PUT    /api/users/{id}/accounts/{account_id}    - Update a sub-account
//! DELETE /api/users/{id}/accounts/{account_id}    - Detach a sub-account
//!
//! # Options
//! GET    /api/options/handlers      - List handler names
//! POST   /api/options/handlers      - Add a handler name (admin only)
//! DELETE /api/options/handlers/{id} - Remove a handler name (admin only)
//! ```

pub mod auth;
pub mod options;
pub mod orders;
pub mod queries;
pub mod reports;
pub mod users;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the complete API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/orders", orders::router())
        .nest("/api/queries", queries::router())
        .nest("/api/reports", reports::router())
        .route("/api/charts/profit", get(reports::profit_chart))
        .nest("/api/users", users::router())
        .nest("/api/options/handlers", options::router())
}
