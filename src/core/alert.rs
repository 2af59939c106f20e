//! Alert decision engine.
//!
//! Per date, the engine decides whether to send a first "all key bearers absent" alert,
//! suppress a duplicate, or send a "change of plans" follow-up once someone becomes
//! available again. The [alert ledger](crate::core::ledger) holds the state:
//!
//! * no entry, or `followup_sent == true`: cycle closed, a new alert may be sent
//! * entry with `followup_sent == false`: cycle open, alerts are suppressed and the next
//!   key-bearer cancellation sends a follow-up
//!
//! The mutating paths and the read-only impact predictions share [`decide_alert`] and
//! [`followup_due`], so a prediction never disagrees with what actually happens.
//!
//! Two requests racing on the same date may both see a closed cycle and both send an
//! alert; the ledger write is not wrapped in a cross-request transaction.

use crate::{
    context::AppContext,
    core::{absence, employee, ledger},
    entities::email_log,
    errors::Result,
    models::EmployeeName,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

/// Why an evaluation did or did not send an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertReason {
    /// No employee holds a key, so there is nobody whose absence matters
    NoKeyBearers,
    /// An alert cycle is already open for the date
    AlreadySent,
    /// Every key bearer is absent and the alert was delivered
    AllAbsent,
    /// Every key bearer is absent but delivery failed; the ledger was left alone
    EmailFailed,
    /// At least one key bearer is still coming in
    NotAllAbsent,
}

impl AlertReason {
    /// Stable reason code, e.g. `"already_sent"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoKeyBearers => "no_key_bearers",
            Self::AlreadySent => "already_sent",
            Self::AllAbsent => "all_absent",
            Self::EmailFailed => "email_failed",
            Self::NotAllAbsent => "not_all_absent",
        }
    }
}

/// Result of [`evaluate_and_maybe_alert`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertOutcome {
    pub date: NaiveDate,
    pub sent: bool,
    pub reason: AlertReason,
    /// Key bearers recorded absent on the date
    pub absent_key_bearers: usize,
    /// Key bearers currently configured
    pub total_key_bearers: usize,
}

/// Why a cancellation did or did not send a follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowupReason {
    /// The employee does not hold a key, so their presence restores nothing
    NotKeyBearer,
    /// No alert cycle is open for the date
    NoOpenAlert,
    /// The follow-up was delivered and the cycle closed
    FollowupSent,
    /// Delivery failed; the cycle stays open
    EmailFailed,
}

/// Result of [`evaluate_cancellation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancellationOutcome {
    pub date: NaiveDate,
    pub employee: String,
    /// Whether an absence row was actually removed
    pub absence_removed: bool,
    pub sent: bool,
    pub reason: FollowupReason,
}

/// What [`decide_alert`] concluded for one date, before any side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    /// Nothing to do, for the given reason
    Skip(AlertReason),
    /// Every key bearer is absent and a new cycle may be opened
    Send,
}

/// Whether every key bearer is in the absent set. Absences of employees without a key
/// are irrelevant; an empty key-bearer set is trivially covered.
#[must_use]
pub fn all_key_bearers_absent(
    absent: &BTreeSet<EmployeeName>,
    key_bearers: &BTreeSet<EmployeeName>,
) -> bool {
    key_bearers.is_subset(absent)
}

/// Reset rule: a new alert may be opened when there is no ledger entry, or the entry's
/// cycle was closed by a follow-up.
#[must_use]
pub fn cycle_allows_new_alert(entry: Option<&email_log::Model>) -> bool {
    entry.is_none_or(|e| e.followup_sent)
}

/// A follow-up is owed when a key bearer cancels during an open cycle.
#[must_use]
pub fn followup_due(is_key_bearer: bool, entry: Option<&email_log::Model>) -> bool {
    is_key_bearer && entry.is_some_and(email_log::Model::is_open)
}

/// The pure alert rule shared by evaluation and prediction.
#[must_use]
pub fn decide_alert(
    key_bearers: &BTreeSet<EmployeeName>,
    absent: &BTreeSet<EmployeeName>,
    entry: Option<&email_log::Model>,
) -> AlertDecision {
    if key_bearers.is_empty() {
        AlertDecision::Skip(AlertReason::NoKeyBearers)
    } else if !cycle_allows_new_alert(entry) {
        AlertDecision::Skip(AlertReason::AlreadySent)
    } else if all_key_bearers_absent(absent, key_bearers) {
        AlertDecision::Send
    } else {
        AlertDecision::Skip(AlertReason::NotAllAbsent)
    }
}

/// Everything the alert rule reads for one date.
struct DateSnapshot {
    key_bearers: BTreeSet<EmployeeName>,
    absent: BTreeSet<EmployeeName>,
    entry: Option<email_log::Model>,
}

impl DateSnapshot {
    async fn load(ctx: &AppContext, date: NaiveDate) -> Result<Self> {
        let db = &ctx.database;
        let key_bearers = employee::list_key_bearers(db)
            .await?
            .into_iter()
            .map(|e| EmployeeName::new(e.name))
            .collect();
        let absent = absence::list_absences(db, date)
            .await?
            .into_iter()
            .map(EmployeeName::new)
            .collect();
        let entry = ledger::get_entry(db, date).await?;

        Ok(Self {
            key_bearers,
            absent,
            entry,
        })
    }

    fn absent_key_bearers(&self) -> usize {
        self.key_bearers.intersection(&self.absent).count()
    }

    fn decide(&self) -> AlertDecision {
        decide_alert(&self.key_bearers, &self.absent, self.entry.as_ref())
    }
}

/// Whether a fresh alert cycle may be opened for `date`.
pub async fn can_open_new_alert(ctx: &AppContext, date: NaiveDate) -> Result<bool> {
    let entry = ledger::get_entry(&ctx.database, date).await?;
    Ok(cycle_allows_new_alert(entry.as_ref()))
}

/// Checks whether every key bearer is absent on `date` and, if so and no cycle is open,
/// sends the alert and opens a new cycle.
///
/// A failed delivery is reported as `sent: false` with [`AlertReason::EmailFailed`] and
/// leaves the ledger untouched, so the next evaluation retries.
///
/// # Arguments
/// * `ctx` - Application context (store and notifier)
/// * `date` - The date to evaluate
///
/// # Returns
/// An [`AlertOutcome`] with the reason code and key-bearer counts. Only store errors
/// are returned as `Err`.
#[instrument(skip(ctx))]
pub async fn evaluate_and_maybe_alert(ctx: &AppContext, date: NaiveDate) -> Result<AlertOutcome> {
    let snapshot = DateSnapshot::load(ctx, date).await?;
    let absent_key_bearers = snapshot.absent_key_bearers();
    let total_key_bearers = snapshot.key_bearers.len();
    let outcome = |sent, reason| AlertOutcome {
        date,
        sent,
        reason,
        absent_key_bearers,
        total_key_bearers,
    };

    match snapshot.decide() {
        AlertDecision::Skip(reason) => {
            debug!(
                reason = reason.as_str(),
                absent_key_bearers, total_key_bearers, "No alert sent"
            );
            Ok(outcome(false, reason))
        }
        AlertDecision::Send => {
            let bearers: Vec<EmployeeName> = snapshot.key_bearers.into_iter().collect();
            match ctx.notifier.send_alert(date, &bearers).await {
                Ok(()) => {
                    ledger::open_cycle(&ctx.database, date).await?;
                    info!(%date, "All key bearers absent; alert sent");
                    Ok(outcome(true, AlertReason::AllAbsent))
                }
                Err(e) => {
                    warn!(%date, "Alert delivery failed: {}", e);
                    Ok(outcome(false, AlertReason::EmailFailed))
                }
            }
        }
    }
}

/// Removes `employee_name`'s absence on `date` and, when that key bearer's return
/// ends an open alert cycle, sends the change-of-plans follow-up and closes the cycle.
///
/// The absence is deleted whether or not anything is sent. A failed delivery leaves the
/// cycle open so a later cancellation can still close it.
///
/// # Arguments
/// * `ctx` - Application context (store and notifier)
/// * `date` - The date being cancelled
/// * `employee_name` - Whose absence to remove
///
/// # Returns
/// A [`CancellationOutcome`] saying whether a row was removed and whether a follow-up
/// went out.
#[instrument(skip(ctx))]
pub async fn evaluate_cancellation(
    ctx: &AppContext,
    date: NaiveDate,
    employee_name: &str,
) -> Result<CancellationOutcome> {
    let db = &ctx.database;
    let absence_removed = absence::delete_absence(db, employee_name, date).await?;

    let is_key_bearer = employee::get_employee(db, employee_name)
        .await?
        .is_some_and(|e| e.has_key);
    let entry = ledger::get_entry(db, date).await?;

    let outcome = |sent, reason| CancellationOutcome {
        date,
        employee: employee_name.to_string(),
        absence_removed,
        sent,
        reason,
    };

    if !followup_due(is_key_bearer, entry.as_ref()) {
        let reason = if is_key_bearer {
            FollowupReason::NoOpenAlert
        } else {
            FollowupReason::NotKeyBearer
        };
        return Ok(outcome(false, reason));
    }

    match ctx.notifier.send_change_of_plans(date, employee_name).await {
        Ok(()) => {
            ledger::mark_followup(db, date).await?;
            info!(%date, employee = employee_name, "Change of plans follow-up sent");
            Ok(outcome(true, FollowupReason::FollowupSent))
        }
        Err(e) => {
            warn!(%date, employee = employee_name, "Follow-up delivery failed: {}", e);
            Ok(outcome(false, FollowupReason::EmailFailed))
        }
    }
}

/// Predicted effect of a hypothetical absence change. Nothing is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbsenceImpact {
    pub date: NaiveDate,
    pub employee: String,
    /// Adding the absence would send an "all absent" alert
    pub would_alert: bool,
    /// Removing the absence would send a change-of-plans follow-up
    pub would_follow_up: bool,
    /// Key bearers absent once the change is applied
    pub absent_key_bearers: usize,
    pub total_key_bearers: usize,
}

/// Predicts whether marking `employee_name` absent on `date` would fire an alert.
pub async fn predict_absence(
    ctx: &AppContext,
    date: NaiveDate,
    employee_name: &str,
) -> Result<AbsenceImpact> {
    let mut snapshot = DateSnapshot::load(ctx, date).await?;
    snapshot.absent.insert(EmployeeName::from(employee_name));

    Ok(AbsenceImpact {
        date,
        employee: employee_name.to_string(),
        would_alert: snapshot.decide() == AlertDecision::Send,
        would_follow_up: false,
        absent_key_bearers: snapshot.absent_key_bearers(),
        total_key_bearers: snapshot.key_bearers.len(),
    })
}

/// Predicts whether cancelling `employee_name`'s absence on `date` would send a
/// follow-up.
pub async fn predict_cancellation(
    ctx: &AppContext,
    date: NaiveDate,
    employee_name: &str,
) -> Result<AbsenceImpact> {
    let mut snapshot = DateSnapshot::load(ctx, date).await?;
    let name = EmployeeName::from(employee_name);
    snapshot.absent.remove(&name);
    let is_key_bearer = snapshot.key_bearers.contains(&name);

    Ok(AbsenceImpact {
        date,
        employee: employee_name.to_string(),
        would_alert: false,
        would_follow_up: followup_due(is_key_bearer, snapshot.entry.as_ref()),
        absent_key_bearers: snapshot.absent_key_bearers(),
        total_key_bearers: snapshot.key_bearers.len(),
    })
}
