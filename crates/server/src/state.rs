//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::db::{OrderStore, QueryStore, UserStore};
use crate::services::export::{CsvSink, ReportSink};
use crate::services::{AuthService, Mailer, OrderService, QueryService, ReportService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; carries the services and the seams they are
/// built on so handlers never touch the pool for domain logic (the pool
/// itself is exposed for session bookkeeping and health checks only).
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    users: Arc<dyn UserStore>,
    orders: OrderService,
    queries: QueryService,
    reports: ReportService,
    auth: AuthService,
    sink: Arc<dyn ReportSink>,
}

impl AppState {
    /// Assemble the application state from its seams.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        pool: PgPool,
        orders: Arc<dyn OrderStore>,
        queries: Arc<dyn QueryStore>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                users: users.clone(),
                orders: OrderService::new(orders.clone()),
                queries: QueryService::new(queries.clone(), orders.clone()),
                reports: ReportService::new(orders, queries),
                auth: AuthService::new(users, mailer),
                sink: Arc::new(CsvSink),
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the user store.
    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.inner.users
    }

    /// Get a reference to the order lifecycle service.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    /// Get a reference to the query service.
    #[must_use]
    pub fn queries(&self) -> &QueryService {
        &self.inner.queries
    }

    /// Get a reference to the reporting service.
    #[must_use]
    pub fn reports(&self) -> &ReportService {
        &self.inner.reports
    }

    /// Get a reference to the authentication service.
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get a reference to the report serialization sink.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn ReportSink> {
        &self.inner.sink
    }
}
