//! Shared context handed to the alert engine, the scheduler and the request layer.

use crate::core::calendar::{Clock, SystemClock};
use crate::notify::{Notifier, SharedNotifier};
use chrono::NaiveDate;
use chrono_tz::Tz;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Everything a unit of work needs: the store, the notifier and the clock.
/// Built once at startup and cloned into each request.
#[derive(Clone)]
pub struct AppContext {
    /// Database connection for all store operations
    pub database: DatabaseConnection,
    /// Delivers alerts and follow-ups
    pub notifier: SharedNotifier,
    /// Resolves "today" in the office timezone
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    /// Creates a context from explicit collaborators.
    #[must_use]
    pub fn new(
        database: DatabaseConnection,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            database,
            notifier,
            clock,
        }
    }

    /// Creates a context whose clock follows the system time in `timezone`.
    #[must_use]
    pub fn with_system_clock(
        database: DatabaseConnection,
        notifier: Arc<dyn Notifier>,
        timezone: Tz,
    ) -> Self {
        Self::new(database, notifier, Arc::new(SystemClock::new(timezone)))
    }

    /// The current civil date.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}
