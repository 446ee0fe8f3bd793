//! Shared handler-name options shown in order and query forms.

use chrono::{DateTime, Utc};
use serde::Serialize;

use order_portal_core::HandlerOptionId;

/// A selectable handler name, global to the portal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerOption {
    pub id: HandlerOptionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
