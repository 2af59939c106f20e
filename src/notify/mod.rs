//! Notification delivery.
//!
//! The alert engine only knows the [`Notifier`] trait. [`EmailNotifier`] delivers over
//! SMTP; [`DisabledNotifier`] stands in when no mail server is configured and reports
//! every send as failed, so the ledger is never written for an undelivered alert.

/// SMTP delivery through lettre
pub mod email;
/// Subject and body composition for both notification kinds
pub mod messages;

pub use email::EmailNotifier;

use crate::errors::{Error, Result};
use crate::models::EmployeeName;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::warn;

/// Something that can tell the office about key-bearer availability.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Every key bearer is out on `date`.
    async fn send_alert(&self, date: NaiveDate, key_bearers: &[EmployeeName]) -> Result<()>;

    /// `employee_name` is coming in after all on `date`, after an alert went out.
    async fn send_change_of_plans(&self, date: NaiveDate, employee_name: &str) -> Result<()>;
}

pub type SharedNotifier = Arc<dyn Notifier>;

/// Notifier used when SMTP is not configured. Every send fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send_alert(&self, date: NaiveDate, _key_bearers: &[EmployeeName]) -> Result<()> {
        warn!(%date, "Email is not configured; alert not delivered");
        Err(Error::Notification {
            message: "email delivery is not configured".to_string(),
        })
    }

    async fn send_change_of_plans(&self, date: NaiveDate, employee_name: &str) -> Result<()> {
        warn!(%date, employee = employee_name, "Email is not configured; follow-up not delivered");
        Err(Error::Notification {
            message: "email delivery is not configured".to_string(),
        })
    }
}
