//! Status enums and roles for portal entities.
//!
//! Statuses are persisted as lowercase text, so each enum carries `Display`
//! and `FromStr` implementations alongside its serde renames.

use serde::{Deserialize, Serialize};

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Processing,
    #[default]
    Pending,
    Completed,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Resolution status of a buyer query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    #[default]
    InProgress,
    NotResolved,
    Resolved,
    Follow,
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "inprogress"),
            Self::NotResolved => write!(f, "notresolved"),
            Self::Resolved => write!(f, "resolved"),
            Self::Follow => write!(f, "follow"),
        }
    }
}

impl std::str::FromStr for QueryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inprogress" => Ok(Self::InProgress),
            "notresolved" => Ok(Self::NotResolved),
            "resolved" => Ok(Self::Resolved),
            "follow" => Ok(Self::Follow),
            _ => Err(format!("invalid query status: {s}")),
        }
    }
}

/// Portal role. Admins may act on behalf of any user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl UserRole {
    /// Whether this role may operate on other users' data.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_defaults_to_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_query_status_defaults_to_in_progress() {
        assert_eq!(QueryStatus::default(), QueryStatus::InProgress);
    }

    #[test]
    fn test_status_text_roundtrip() {
        for status in [
            OrderStatus::Processing,
            OrderStatus::Pending,
            OrderStatus::Completed,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        for status in [
            QueryStatus::InProgress,
            QueryStatus::NotResolved,
            QueryStatus::Resolved,
            QueryStatus::Follow,
        ] {
            assert_eq!(status.to_string().parse::<QueryStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_query_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&QueryStatus::NotResolved).unwrap(),
            "\"notresolved\""
        );
        let parsed: QueryStatus = serde_json::from_str("\"inprogress\"").unwrap();
        assert_eq!(parsed, QueryStatus::InProgress);
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("refunded".parse::<OrderStatus>().is_err());
        assert!("closed".parse::<QueryStatus>().is_err());
    }
}
