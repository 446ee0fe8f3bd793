//! Domain models for the Order Portal.
//!
//! These types represent validated domain objects separate from database row
//! types. Response serialization uses camelCase field names to match the
//! portal's JSON API.

pub mod handler_option;
pub mod order;
pub mod query;
pub mod user;

pub use handler_option::HandlerOption;
pub use order::{NewOrder, Order};
pub use query::{NewQuery, Query};
pub use user::{Account, NewAccount, NewUser, User, UserView};
