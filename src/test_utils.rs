//! Shared test utilities for the key tracker.
//!
//! Provides an in-memory database, a pinned clock and a notifier that records what it
//! was asked to send.

use crate::{
    context::AppContext,
    core::{calendar::FixedClock, employee},
    errors::{Error, Result},
    models::EmployeeName,
    notify::Notifier,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Shorthand for a calendar date. Panics on an impossible date.
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Notifier that records every message instead of delivering it.
///
/// With `set_failing(true)` every send returns a notification error and nothing is
/// recorded.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<(NaiveDate, Vec<String>)>>,
    followups: Mutex<Vec<(NaiveDate, String)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Alerts sent so far, with the key bearers each one named.
    #[allow(clippy::unwrap_used)]
    pub fn alerts(&self) -> Vec<(NaiveDate, Vec<String>)> {
        self.alerts.lock().unwrap().clone()
    }

    /// Follow-ups sent so far, with the employee each one named.
    #[allow(clippy::unwrap_used)]
    pub fn followups(&self) -> Vec<(NaiveDate, String)> {
        self.followups.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Notification {
                message: "simulated delivery failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    #[allow(clippy::unwrap_used)]
    async fn send_alert(&self, date: NaiveDate, key_bearers: &[EmployeeName]) -> Result<()> {
        self.check_failing()?;
        self.alerts.lock().unwrap().push((
            date,
            key_bearers.iter().map(ToString::to_string).collect(),
        ));
        Ok(())
    }

    #[allow(clippy::unwrap_used)]
    async fn send_change_of_plans(&self, date: NaiveDate, employee_name: &str) -> Result<()> {
        self.check_failing()?;
        self.followups
            .lock()
            .unwrap()
            .push((date, employee_name.to_string()));
        Ok(())
    }
}

/// Creates a context over a fresh database with "today" pinned to `today`.
pub async fn setup_test_context(today: NaiveDate) -> Result<(AppContext, Arc<RecordingNotifier>)> {
    let db = setup_test_db().await?;
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = AppContext::new(
        db,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        Arc::new(FixedClock(today)),
    );
    Ok((ctx, notifier))
}

/// Creates a context with the given employees registered as key bearers.
///
/// # Defaults
/// * today: Monday 1 July 2024, before either monthly job is due
pub async fn setup_with_key_bearers(
    names: &[&str],
) -> Result<(AppContext, Arc<RecordingNotifier>)> {
    let (ctx, notifier) = setup_test_context(date(2024, 7, 1)).await?;
    for name in names {
        employee::create_employee(&ctx.database, name, true).await?;
    }
    Ok((ctx, notifier))
}
