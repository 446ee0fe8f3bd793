//! Core types for Order Portal.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod range;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{ProfitBreakdown, profit_and_roi};
pub use range::ReportRange;
pub use status::*;
