//! Business services for the portal.
//!
//! Services own the domain rules (derived-field computation, soft-delete
//! lifecycle, snapshot denormalization, notification guarantees) and consume
//! the store and mail transport through their traits.

pub mod auth;
pub mod export;
pub mod mailer;
pub mod orders;
pub mod queries;
pub mod reports;
pub mod scheduler;

pub use auth::AuthService;
pub use mailer::{DisabledMailer, MailError, MailMessage, Mailer, SmtpMailer};
pub use orders::OrderService;
pub use queries::QueryService;
pub use reports::ReportService;
pub use scheduler::{ExpiryScheduler, SchedulerHandle};
