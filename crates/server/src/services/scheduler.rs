//! Query expiration scheduler.
//!
//! A single background task sweeps for queries whose expiry falls within the
//! next hour and emails the owner once per query. The guarantee is
//! at-most-once success: `notified_expire` flips to true only after the mail
//! transport confirms a send, and a failed send leaves the query pending so
//! the next sweep retries. Sweeps never overlap: the loop schedules the next
//! sweep only after the previous one finishes, and an Idle/Running guard
//! covers externally triggered sweeps as well.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::db::{QueryStore, UserStore};
use crate::models::{Query, User};
use crate::services::mailer::{MailMessage, Mailer};

/// Seconds between sweeps.
const SWEEP_INTERVAL_SECS: u64 = 60;

/// How far ahead of "now" a deadline counts as due.
const LOOKAHEAD_MINUTES: i64 = 60;

/// Upper bound on candidates examined per sweep.
pub const SWEEP_BATCH_SIZE: i64 = 50;

/// Whether a sweep is currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepState {
    Idle,
    Running,
}

/// Counters from one sweep, mostly for logs and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Candidates fetched from the store.
    pub examined: usize,
    /// Notifications confirmed sent and marked.
    pub notified: usize,
    /// Candidates left pending because the transport declined the send.
    pub deferred: usize,
    /// Candidates that failed outside the transport (e.g. missing owner).
    pub failed: usize,
    /// True when the sweep was skipped because another one was running.
    pub skipped: bool,
}

/// Background sweeper for query expiry notifications.
pub struct ExpiryScheduler {
    queries: Arc<dyn QueryStore>,
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    state: Mutex<SweepState>,
}

/// Handle to a started scheduler; dropping it does not stop the task, call
/// [`SchedulerHandle::shutdown`] for a graceful stop.
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop scheduling new sweeps and wait for the in-flight one to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Scheduler task panicked during shutdown");
        }
    }
}

impl ExpiryScheduler {
    /// Create a scheduler over the given store and transport seams.
    #[must_use]
    pub fn new(
        queries: Arc<dyn QueryStore>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            queries,
            users,
            mailer,
            state: Mutex::new(SweepState::Idle),
        }
    }

    /// Start the recurring sweep: once immediately, then every
    /// [`SWEEP_INTERVAL_SECS`] after the previous sweep completes.
    #[must_use]
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (stop, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            tracing::info!("Query expiration scheduler started");
            loop {
                let report = self.run_sweep(Utc::now()).await;
                if report.examined > 0 {
                    tracing::info!(
                        examined = report.examined,
                        notified = report.notified,
                        deferred = report.deferred,
                        failed = report.failed,
                        "Expiry sweep finished"
                    );
                }

                tokio::select! {
                    changed = stopped.changed() => {
                        // A closed channel means the handle is gone; stop too.
                        if changed.is_err() || *stopped.borrow() {
                            tracing::info!("Query expiration scheduler stopped");
                            break;
                        }
                    }
                    () = tokio::time::sleep(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS)) => {}
                }
            }
        });

        SchedulerHandle { stop, task }
    }

    /// Execute one sweep at the given instant.
    ///
    /// Candidates are processed independently: one candidate failing (its
    /// owner missing, the transport down) never aborts the others, and no
    /// error escapes this function.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> SweepReport {
        if !self.begin_sweep() {
            tracing::warn!("Skipping expiry sweep: previous sweep still running");
            return SweepReport {
                skipped: true,
                ..SweepReport::default()
            };
        }
        let _guard = SweepGuard { state: &self.state };

        let cutoff = now + Duration::minutes(LOOKAHEAD_MINUTES);
        tracing::debug!(%cutoff, "Checking for queries expiring before cutoff");

        let candidates = match self.queries.find_expiring(cutoff, SWEEP_BATCH_SIZE).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(error = %e, "Expiry sweep could not fetch candidates");
                return SweepReport::default();
            }
        };

        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };

        for query in &candidates {
            match self.process_candidate(query, now).await {
                Ok(true) => report.notified += 1,
                Ok(false) => report.deferred += 1,
                Err(stage) => {
                    report.failed += 1;
                    tracing::error!(query_id = %query.id, stage, "Expiry candidate failed");
                }
            }
        }

        report
    }

    /// Mark the sweep as running; false when one is already in flight.
    fn begin_sweep(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == SweepState::Running {
            return false;
        }
        *state = SweepState::Running;
        true
    }

    /// Notify one candidate. `Ok(true)` means sent and marked; `Ok(false)`
    /// means the transport declined and the query stays pending for the next
    /// sweep. The error value names the stage that failed, for the log.
    async fn process_candidate(
        &self,
        query: &Query,
        now: DateTime<Utc>,
    ) -> Result<bool, &'static str> {
        let user = self
            .users
            .find(query.user_id)
            .await
            .map_err(|_| "owner lookup")?
            .ok_or("owner missing")?;

        let message = build_expiry_email(&user, query, now);

        match self.mailer.send(&message).await {
            Ok(()) => {
                let marked = self
                    .queries
                    .mark_notified(query.id)
                    .await
                    .map_err(|_| "mark notified")?;
                if marked {
                    tracing::info!(query_id = %query.id, "Sent expiry notification");
                } else {
                    tracing::warn!(query_id = %query.id, "Query was already marked notified");
                }
                Ok(true)
            }
            Err(e) => {
                tracing::info!(query_id = %query.id, error = %e, "Email not sent, will retry later");
                Ok(false)
            }
        }
    }
}

/// Resets the sweep state to idle when a sweep exits by any path.
struct SweepGuard<'a> {
    state: &'a Mutex<SweepState>,
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = SweepState::Idle;
    }
}

/// Compose the notification for a due query.
///
/// An already-passed deadline and one inside the lookahead window route the
/// same way; only the wording differs. The sub-account display name comes
/// from the owner's account list, matched by the string-rendered account id,
/// with "N/A" when the reference no longer resolves.
fn build_expiry_email(user: &User, query: &Query, now: DateTime<Utc>) -> MailMessage {
    let account_name = user
        .accounts
        .iter()
        .find(|a| a.id.to_string() == query.account_ref)
        .map_or("N/A", |a| a.account_name.as_str());

    let is_expired = query.expires_at.is_some_and(|at| at <= now);
    let status_text = if is_expired {
        "has expired"
    } else {
        "is expiring soon (within 1 hour)"
    };

    let reference = query
        .order_id
        .clone()
        .unwrap_or_else(|| query.id.to_string());
    let order_id = query.order_id.as_deref().unwrap_or("-");
    let handler = query.handler_name.as_deref().unwrap_or("-");
    let message = query.message.as_deref().unwrap_or("-");
    let expires = query
        .expires_at
        .map_or_else(|| "-".to_owned(), |at| at.to_rfc3339());

    let subject = format!("Query Update: {reference} {status_text}");
    let text = format!(
        "Hello {name},\n\nYour query {status_text}.\n\n\
         Account Name: {account_name}\nOrder ID: {order_id}\nDetails: {details}\n\
         Message: {message}\nHandler: {handler}\nExpires At: {expires}\n\n\
         Regards,\nOrder Portal",
        name = user.name,
        details = query.details,
    );
    let html = format!(
        "<p>Hello {name},</p>\
         <p>Your query <b>{status_text}</b>.</p>\
         <ul>\
           <li><b>Account Name:</b> {account_name}</li>\
           <li><b>Order ID:</b> {order_id}</li>\
           <li><b>Details:</b> {details}</li>\
           <li><b>Message:</b> {message}</li>\
           <li><b>Handler:</b> {handler}</li>\
           <li><b>Expires At:</b> {expires}</li>\
         </ul>\
         <p>Regards,<br/>Order Portal</p>",
        name = user.name,
        details = query.details,
    );

    MailMessage {
        to: user.email.to_string(),
        subject,
        text,
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use order_portal_core::{AccountId, Email, QueryId, QueryStatus, UserId, UserRole};

    use crate::models::Account;

    fn sample_user() -> User {
        User {
            id: UserId::new(1),
            name: "Asha".to_owned(),
            email: Email::parse("asha@example.com").expect("valid email"),
            role: UserRole::User,
            image: String::new(),
            password_hash: String::new(),
            reset_code_hash: None,
            reset_code_expires: None,
            accounts: vec![Account {
                id: AccountId::new(11),
                platform: "ebay".to_owned(),
                account_name: "Main Store".to_owned(),
                account_id: "store-1".to_owned(),
                image: String::new(),
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_query(expires_at: DateTime<Utc>) -> Query {
        Query {
            id: QueryId::new(7),
            user_id: UserId::new(1),
            account_ref: "11".to_owned(),
            order_id: Some("ORD-77".to_owned()),
            sku: "SKU-1".to_owned(),
            details: "Blue widget".to_owned(),
            message: Some("Where is my parcel?".to_owned()),
            answer: None,
            handler_name: Some("Lee".to_owned()),
            status: QueryStatus::InProgress,
            expires_at: Some(expires_at),
            notified_expire: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_expired_wording() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid");
        let message = build_expiry_email(&sample_user(), &sample_query(now - Duration::minutes(5)), now);
        assert!(message.subject.contains("ORD-77 has expired"));
        assert!(message.text.contains("Account Name: Main Store"));
    }

    #[test]
    fn test_expiring_soon_wording() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid");
        let message = build_expiry_email(&sample_user(), &sample_query(now + Duration::minutes(30)), now);
        assert!(message.subject.contains("is expiring soon"));
    }

    #[test]
    fn test_unresolved_account_falls_back() {
        let now = Utc::now();
        let mut query = sample_query(now);
        query.account_ref = "999".to_owned();
        let message = build_expiry_email(&sample_user(), &query, now);
        assert!(message.text.contains("Account Name: N/A"));
    }

    #[test]
    fn test_subject_falls_back_to_internal_id() {
        let now = Utc::now();
        let mut query = sample_query(now);
        query.order_id = None;
        let message = build_expiry_email(&sample_user(), &query, now);
        assert!(message.subject.contains("Query Update: 7"));
    }
}
