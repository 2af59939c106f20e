//! Usual-absence template application.
//!
//! Saving a template projects it forward from tomorrow (never today, which may already be
//! under way) to the end of the current month, or to the end of next month when that
//! month has already been seeded by the populate job. Flagged weekdays get an absence;
//! unflagged weekdays lose theirs. Notifications reuse the alert engine per date and are
//! only sent when the caller has confirmed.

use crate::{
    context::AppContext,
    core::{
        absence,
        alert::{self, AlertReason, FollowupReason},
        calendar::{DateRange, YearMonth, tomorrow},
        employee,
        sync_ledger::{self, SyncOperation},
    },
    errors::Result,
    models::WeekdayFlags,
};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// What applying a template changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateApplication {
    /// Dates that gained an absence
    pub marked: Vec<NaiveDate>,
    /// Dates that lost an absence
    pub cleared: Vec<NaiveDate>,
    /// Dates on which an "all absent" alert was sent
    pub alerts_sent: Vec<NaiveDate>,
    /// Dates on which a change-of-plans follow-up was sent
    pub followups_sent: Vec<NaiveDate>,
    /// Dates whose processing failed and was skipped
    pub failed_dates: Vec<NaiveDate>,
    /// Unconfirmed update only: dates that would send an alert. Nothing was written.
    pub pending_alerts: Vec<NaiveDate>,
    /// Unconfirmed update only: dates that would send a follow-up. Nothing was written.
    pub pending_followups: Vec<NaiveDate>,
}

impl TemplateApplication {
    /// Whether the update was held back waiting for confirmation.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.pending_alerts.is_empty() || !self.pending_followups.is_empty()
    }
}

/// The dates a template saved on `today` is projected across.
pub async fn projection_range(ctx: &AppContext, today: NaiveDate) -> Result<DateRange> {
    let current = YearMonth::of(today);
    let next = current.next();
    let populated_key = sync_ledger::sync_key(SyncOperation::Populate, next);

    let end = if sync_ledger::exists(&ctx.database, &populated_key).await? {
        next.range().end
    } else {
        current.range().end
    };

    Ok(DateRange::new(tomorrow(today), end))
}

/// Whether projecting the template onto `day` would notify anyone.
async fn would_notify(
    ctx: &AppContext,
    employee_name: &str,
    day: NaiveDate,
    usually_absent: bool,
) -> Result<bool> {
    if usually_absent {
        Ok(alert::predict_absence(ctx, day, employee_name)
            .await?
            .would_alert)
    } else if absence::is_absent(&ctx.database, employee_name, day).await? {
        Ok(alert::predict_cancellation(ctx, day, employee_name)
            .await?
            .would_follow_up)
    } else {
        Ok(false)
    }
}

async fn apply_to_date(
    ctx: &AppContext,
    employee_name: &str,
    day: NaiveDate,
    usually_absent: bool,
    confirmed: bool,
    report: &mut TemplateApplication,
) -> Result<()> {
    let db = &ctx.database;

    if usually_absent {
        if absence::upsert_absence(db, employee_name, day).await? {
            report.marked.push(day);
        }
        if confirmed {
            let outcome = alert::evaluate_and_maybe_alert(ctx, day).await?;
            if outcome.sent && outcome.reason == AlertReason::AllAbsent {
                report.alerts_sent.push(day);
            }
        }
    } else if absence::is_absent(db, employee_name, day).await? {
        if confirmed {
            let outcome = alert::evaluate_cancellation(ctx, day, employee_name).await?;
            if outcome.sent && outcome.reason == FollowupReason::FollowupSent {
                report.followups_sent.push(day);
            }
        } else {
            absence::delete_absence(db, employee_name, day).await?;
        }
        report.cleared.push(day);
    }

    Ok(())
}

/// Stores `flags` as the employee's usual absence and projects it forward.
///
/// # Arguments
/// * `ctx` - Application context; its clock decides where the projection starts
/// * `employee_name` - A registered employee
/// * `flags` - The new template, replacing the stored one wholesale
/// * `confirmed` - Whether the caller accepts the alerts and follow-ups this may send
///
/// # Returns
/// A [`TemplateApplication`] listing the dates changed and notified. When not confirmed
/// and any date would notify, nothing is written (not even the template) and only
/// `pending_alerts` / `pending_followups` are filled in.
///
/// Each date is handled on its own: a failure is logged, listed in `failed_dates`, and
/// the remaining dates are still processed.
#[instrument(skip(ctx))]
pub async fn apply_usual_absence(
    ctx: &AppContext,
    employee_name: &str,
    flags: WeekdayFlags,
    confirmed: bool,
) -> Result<TemplateApplication> {
    employee::require_employee(&ctx.database, employee_name).await?;

    let range = projection_range(ctx, ctx.today()).await?;
    let mut report = TemplateApplication::default();

    if !confirmed {
        for day in range.weekdays() {
            let usually_absent = flags.is_absent_on(day.weekday());
            match would_notify(ctx, employee_name, day, usually_absent).await {
                Ok(true) if usually_absent => report.pending_alerts.push(day),
                Ok(true) => report.pending_followups.push(day),
                Ok(false) => {}
                Err(e) => {
                    warn!(employee = employee_name, date = %day, "Failed to predict impact: {}", e);
                    report.failed_dates.push(day);
                }
            }
        }
        if report.is_pending() {
            info!(
                employee = employee_name,
                alerts = report.pending_alerts.len(),
                followups = report.pending_followups.len(),
                "Usual absence held back until confirmed"
            );
            return Ok(report);
        }
    }

    employee::upsert_template(&ctx.database, employee_name, flags).await?;
    if range.is_empty() {
        debug!(employee = employee_name, "No dates left to project onto");
    }

    for day in range.weekdays() {
        if report.failed_dates.contains(&day) {
            continue;
        }
        let usually_absent = flags.is_absent_on(day.weekday());
        if let Err(e) =
            apply_to_date(ctx, employee_name, day, usually_absent, confirmed, &mut report).await
        {
            warn!(employee = employee_name, date = %day, "Failed to apply usual absence: {}", e);
            report.failed_dates.push(day);
        }
    }

    info!(
        employee = employee_name,
        marked = report.marked.len(),
        cleared = report.cleared.len(),
        alerts = report.alerts_sent.len(),
        followups = report.followups_sent.len(),
        "Usual absence applied"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::ledger;
    use crate::errors::Error;
    use crate::test_utils::*;

    const WEDNESDAYS: WeekdayFlags = WeekdayFlags {
        monday: false,
        tuesday: false,
        wednesday: true,
        thursday: false,
        friday: false,
    };

    #[tokio::test]
    async fn test_projection_starts_tomorrow() -> Result<()> {
        // Wednesday 10 July 2024
        let (ctx, _notifier) = setup_test_context(date(2024, 7, 10)).await?;
        employee::create_employee(&ctx.database, "Alice", false).await?;

        let report = apply_usual_absence(&ctx, "Alice", WEDNESDAYS, true).await?;

        assert_eq!(
            report.marked,
            vec![date(2024, 7, 17), date(2024, 7, 24), date(2024, 7, 31)]
        );
        assert!(!absence::is_absent(&ctx.database, "Alice", date(2024, 7, 10)).await?);
        assert!(!absence::is_absent(&ctx.database, "Alice", date(2024, 8, 7)).await?);
        assert_eq!(employee::get_template(&ctx.database, "Alice").await?, WEDNESDAYS);

        Ok(())
    }

    #[tokio::test]
    async fn test_reapplying_creates_no_duplicates() -> Result<()> {
        let (ctx, _notifier) = setup_test_context(date(2024, 7, 10)).await?;
        employee::create_employee(&ctx.database, "Alice", false).await?;

        apply_usual_absence(&ctx, "Alice", WEDNESDAYS, true).await?;
        let second = apply_usual_absence(&ctx, "Alice", WEDNESDAYS, true).await?;

        assert!(second.marked.is_empty());
        let in_july = absence::list_absences_in_range(
            &ctx.database,
            None,
            YearMonth::of(date(2024, 7, 1)).range(),
        )
        .await?;
        assert_eq!(in_july.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_unflagged_days_are_cleared_but_today_is_kept() -> Result<()> {
        let (ctx, _notifier) = setup_test_context(date(2024, 7, 10)).await?;
        employee::create_employee(&ctx.database, "Alice", false).await?;
        absence::upsert_absence(&ctx.database, "Alice", date(2024, 7, 10)).await?;
        absence::upsert_absence(&ctx.database, "Alice", date(2024, 7, 11)).await?;

        let report = apply_usual_absence(&ctx, "Alice", WEDNESDAYS, true).await?;

        assert_eq!(report.cleared, vec![date(2024, 7, 11)]);
        assert!(absence::is_absent(&ctx.database, "Alice", date(2024, 7, 10)).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_projection_extends_into_populated_month() -> Result<()> {
        let (ctx, _notifier) = setup_test_context(date(2024, 7, 26)).await?;
        employee::create_employee(&ctx.database, "Alice", false).await?;
        sync_ledger::put(&ctx.database, "populate_2024_8").await?;

        let range = projection_range(&ctx, ctx.today()).await?;
        assert_eq!(range, DateRange::new(date(2024, 7, 27), date(2024, 9, 1)));

        let report = apply_usual_absence(&ctx, "Alice", WEDNESDAYS, true).await?;
        assert_eq!(report.marked.first(), Some(&date(2024, 7, 31)));
        assert_eq!(report.marked.last(), Some(&date(2024, 8, 28)));

        Ok(())
    }

    #[tokio::test]
    async fn test_confirmed_template_sends_alert_and_followup() -> Result<()> {
        let (ctx, notifier) = setup_with_key_bearers(&["Alice", "Bob"]).await?;
        // setup_with_key_bearers pins today to 1 July 2024 (a Monday)
        absence::upsert_absence(&ctx.database, "Bob", date(2024, 7, 3)).await?;

        let marked = apply_usual_absence(&ctx, "Alice", WEDNESDAYS, true).await?;
        assert_eq!(marked.alerts_sent, vec![date(2024, 7, 3)]);

        let cleared = apply_usual_absence(&ctx, "Alice", WeekdayFlags::default(), true).await?;
        assert!(cleared.cleared.contains(&date(2024, 7, 3)));
        assert_eq!(cleared.followups_sent, vec![date(2024, 7, 3)]);
        assert_eq!(notifier.followups().len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_unconfirmed_clearing_holds_back_followup() -> Result<()> {
        let (ctx, notifier) = setup_with_key_bearers(&["Alice", "Bob"]).await?;
        absence::upsert_absence(&ctx.database, "Bob", date(2024, 7, 3)).await?;
        ledger::open_cycle(&ctx.database, date(2024, 7, 3)).await?;
        absence::upsert_absence(&ctx.database, "Alice", date(2024, 7, 3)).await?;
        employee::upsert_template(&ctx.database, "Alice", WEDNESDAYS).await?;

        let report = apply_usual_absence(&ctx, "Alice", WeekdayFlags::default(), false).await?;

        assert_eq!(report.pending_followups, vec![date(2024, 7, 3)]);
        assert!(report.pending_alerts.is_empty());
        assert!(report.cleared.is_empty());
        assert!(notifier.followups().is_empty());
        // Nothing was written: the absence, the open cycle and the old template remain
        assert!(absence::is_absent(&ctx.database, "Alice", date(2024, 7, 3)).await?);
        assert!(
            ledger::get_entry(&ctx.database, date(2024, 7, 3))
                .await?
                .unwrap()
                .is_open()
        );
        assert_eq!(employee::get_template(&ctx.database, "Alice").await?, WEDNESDAYS);

        // Confirming applies it and closes the cycle
        let confirmed =
            apply_usual_absence(&ctx, "Alice", WeekdayFlags::default(), true).await?;
        assert_eq!(confirmed.followups_sent, vec![date(2024, 7, 3)]);

        Ok(())
    }

    #[tokio::test]
    async fn test_unconfirmed_marking_holds_back_alert() -> Result<()> {
        let (ctx, notifier) = setup_with_key_bearers(&["Alice", "Bob"]).await?;
        absence::upsert_absence(&ctx.database, "Bob", date(2024, 7, 3)).await?;

        let report = apply_usual_absence(&ctx, "Alice", WEDNESDAYS, false).await?;

        assert_eq!(report.pending_alerts, vec![date(2024, 7, 3)]);
        assert!(report.marked.is_empty());
        assert!(!absence::is_absent(&ctx.database, "Alice", date(2024, 7, 10)).await?);
        assert!(ledger::get_entry(&ctx.database, date(2024, 7, 3)).await?.is_none());
        assert!(notifier.alerts().is_empty());
        assert_eq!(
            employee::get_template(&ctx.database, "Alice").await?,
            WeekdayFlags::default()
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_unconfirmed_without_notifications_is_applied() -> Result<()> {
        let (ctx, notifier) = setup_with_key_bearers(&["Alice", "Bob"]).await?;

        let report = apply_usual_absence(&ctx, "Alice", WEDNESDAYS, false).await?;

        assert!(!report.is_pending());
        assert_eq!(report.marked.first(), Some(&date(2024, 7, 3)));
        assert!(notifier.alerts().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_employee_is_rejected() -> Result<()> {
        let (ctx, _notifier) = setup_test_context(date(2024, 7, 10)).await?;

        let result = apply_usual_absence(&ctx, "Nobody", WEDNESDAYS, true).await;
        assert!(matches!(result, Err(Error::EmployeeNotFound { .. })));
        assert!(employee::list_templates(&ctx.database).await?.is_empty());

        Ok(())
    }
}
