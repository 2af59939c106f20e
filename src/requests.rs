//! Request layer - framework-agnostic entry points for the office key tracker.
//!
//! Each operation is one short unit of work against the store. Every request first runs
//! the scheduler heartbeat, so the monthly jobs keep up with traffic without a timer.
//! Dates cross this boundary as `YYYY-MM-DD` strings and are parsed here.
//!
//! Mutations that may notify people take a `confirmed` flag. Without it, a request whose
//! impact prediction says it would send an alert or follow-up writes nothing and returns
//! the affected dates, so the caller can warn the user and resubmit.

use crate::{
    context::AppContext,
    core::{
        absence, alert,
        calendar::{format_iso_date, parse_iso_date, week_range},
        employee, ledger, scheduler,
        template::{self, TemplateApplication},
    },
    entities::employee as employee_entity,
    errors::{Error, Result},
    models::{EmployeeName, WeekdayFlags},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{instrument, warn};

/// Mark one employee absent on one or more dates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkAbsenceRequest {
    pub employee: String,
    pub dates: Vec<String>,
    #[serde(default)]
    pub confirmed: bool,
}

/// Response to [`mark_absent`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarkAbsenceResponse {
    /// Dates now recorded as absences
    pub dates_marked: Vec<String>,
    /// Dates on which an "all absent" alert was sent
    pub alerts_sent: Vec<String>,
    /// Dates that could not be processed
    pub failed_dates: Vec<String>,
    /// Unconfirmed request only: dates that would send an alert. Nothing was written.
    pub pending_alerts: Vec<String>,
}

/// Cancel one employee's absence on one or more dates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelAbsenceRequest {
    pub employee: String,
    pub dates: Vec<String>,
    #[serde(default)]
    pub confirmed: bool,
}

/// Response to [`cancel_absence`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CancelAbsenceResponse {
    pub dates_cancelled: Vec<String>,
    /// Dates on which a change-of-plans follow-up was sent
    pub followups_sent: Vec<String>,
    pub failed_dates: Vec<String>,
    /// Unconfirmed request only: dates that would send a follow-up. Nothing was written.
    pub pending_followups: Vec<String>,
}

/// Replace one employee's usual-absence template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsualAbsenceRequest {
    pub employee: String,
    pub flags: WeekdayFlags,
    #[serde(default)]
    pub confirmed: bool,
}

/// One key bearer's state on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyBearerStatus {
    pub name: String,
    pub absent: bool,
}

/// Office access status for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateStatus {
    pub date: String,
    pub key_bearers: Vec<KeyBearerStatus>,
    /// Every key bearer is absent (false when nobody holds a key)
    pub all_absent: bool,
    /// Key bearers absent on the date
    pub absent_count: usize,
    pub total_count: usize,
    /// An alert went out for the date and no follow-up has closed it
    pub alert_open: bool,
}

fn require_employee_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Missing employee".to_string(),
        });
    }
    Ok(())
}

fn require_dates(dates: &[String]) -> Result<()> {
    if dates.is_empty() {
        return Err(Error::Validation {
            message: "Missing dates".to_string(),
        });
    }
    Ok(())
}

async fn heartbeat(ctx: &AppContext) {
    scheduler::run_heartbeat(ctx).await;
}

/// Parses every date; unparsable ones are logged and returned separately.
fn split_dates(dates: &[String]) -> (Vec<NaiveDate>, Vec<String>) {
    let mut parsed = Vec::with_capacity(dates.len());
    let mut invalid = Vec::new();
    for raw in dates {
        match parse_iso_date(raw) {
            Ok(date) => parsed.push(date),
            Err(e) => {
                warn!("Skipping date: {}", e);
                invalid.push(raw.clone());
            }
        }
    }
    (parsed, invalid)
}

/// Records absences and runs the alert check for each date.
#[instrument(skip(ctx, request), fields(employee = %request.employee))]
pub async fn mark_absent(
    ctx: &AppContext,
    request: MarkAbsenceRequest,
) -> Result<MarkAbsenceResponse> {
    require_employee_name(&request.employee)?;
    require_dates(&request.dates)?;
    heartbeat(ctx).await;

    let (dates, invalid) = split_dates(&request.dates);
    let mut response = MarkAbsenceResponse {
        failed_dates: invalid,
        ..Default::default()
    };

    let mut ready = Vec::with_capacity(dates.len());
    for date in dates {
        if request.confirmed {
            ready.push(date);
            continue;
        }
        match alert::predict_absence(ctx, date, &request.employee).await {
            Ok(impact) => {
                if impact.would_alert {
                    response.pending_alerts.push(format_iso_date(date));
                }
                ready.push(date);
            }
            Err(e) => {
                warn!(%date, "Error predicting absence impact: {}", e);
                response.failed_dates.push(format_iso_date(date));
            }
        }
    }
    if !response.pending_alerts.is_empty() {
        return Ok(response);
    }

    for date in ready {
        let result = async {
            absence::upsert_absence(&ctx.database, &request.employee, date).await?;
            alert::evaluate_and_maybe_alert(ctx, date).await
        }
        .await;

        match result {
            Ok(outcome) => {
                response.dates_marked.push(format_iso_date(date));
                if outcome.sent {
                    response.alerts_sent.push(format_iso_date(date));
                }
            }
            Err(e) => {
                warn!(%date, "Error marking absence: {}", e);
                response.failed_dates.push(format_iso_date(date));
            }
        }
    }

    Ok(response)
}

/// Cancels absences and sends any follow-up an open alert cycle is owed.
#[instrument(skip(ctx, request), fields(employee = %request.employee))]
pub async fn cancel_absence(
    ctx: &AppContext,
    request: CancelAbsenceRequest,
) -> Result<CancelAbsenceResponse> {
    require_employee_name(&request.employee)?;
    require_dates(&request.dates)?;
    heartbeat(ctx).await;

    let (dates, invalid) = split_dates(&request.dates);
    let mut response = CancelAbsenceResponse {
        failed_dates: invalid,
        ..Default::default()
    };

    let mut ready = Vec::with_capacity(dates.len());
    for date in dates {
        if request.confirmed {
            ready.push(date);
            continue;
        }
        match alert::predict_cancellation(ctx, date, &request.employee).await {
            Ok(impact) => {
                if impact.would_follow_up {
                    response.pending_followups.push(format_iso_date(date));
                }
                ready.push(date);
            }
            Err(e) => {
                warn!(%date, "Error predicting cancellation impact: {}", e);
                response.failed_dates.push(format_iso_date(date));
            }
        }
    }
    if !response.pending_followups.is_empty() {
        return Ok(response);
    }

    for date in ready {
        match alert::evaluate_cancellation(ctx, date, &request.employee).await {
            Ok(outcome) => {
                response.dates_cancelled.push(format_iso_date(date));
                if outcome.sent {
                    response.followups_sent.push(format_iso_date(date));
                }
            }
            Err(e) => {
                warn!(%date, "Error cancelling absence: {}", e);
                response.failed_dates.push(format_iso_date(date));
            }
        }
    }

    Ok(response)
}

/// Replaces an employee's usual absence and projects it forward.
///
/// Unconfirmed updates that would notify anyone are held back; see
/// [`template::apply_usual_absence`].
pub async fn update_usual_absence(
    ctx: &AppContext,
    request: UsualAbsenceRequest,
) -> Result<TemplateApplication> {
    require_employee_name(&request.employee)?;
    heartbeat(ctx).await;
    template::apply_usual_absence(ctx, &request.employee, request.flags, request.confirmed).await
}

/// The employee's stored usual absence (all false when none is stored).
pub async fn get_usual_absence(ctx: &AppContext, employee_name: &str) -> Result<WeekdayFlags> {
    heartbeat(ctx).await;
    employee::require_employee(&ctx.database, employee_name).await?;
    employee::get_template(&ctx.database, employee_name).await
}

/// Office access status for `date` (`YYYY-MM-DD`).
pub async fn date_status(ctx: &AppContext, date: &str) -> Result<DateStatus> {
    let date = parse_iso_date(date)?;
    heartbeat(ctx).await;

    let db = &ctx.database;
    let bearers = employee::list_key_bearers(db).await?;
    let absent: BTreeSet<EmployeeName> = absence::list_absences(db, date)
        .await?
        .into_iter()
        .map(EmployeeName::new)
        .collect();
    let bearer_names: BTreeSet<EmployeeName> = bearers
        .iter()
        .map(|b| EmployeeName::new(b.name.clone()))
        .collect();

    let key_bearers: Vec<KeyBearerStatus> = bearers
        .into_iter()
        .map(|b| KeyBearerStatus {
            absent: absent.contains(&EmployeeName::new(b.name.clone())),
            name: b.name,
        })
        .collect();
    let absent_count = key_bearers.iter().filter(|s| s.absent).count();
    let entry = ledger::get_entry(db, date).await?;

    Ok(DateStatus {
        date: format_iso_date(date),
        all_absent: !bearer_names.is_empty()
            && alert::all_key_bearers_absent(&absent, &bearer_names),
        absent_count,
        total_count: key_bearers.len(),
        key_bearers,
        alert_open: entry.is_some_and(|e| e.is_open()),
    })
}

fn group_by_iso_date(grouped: BTreeMap<NaiveDate, Vec<String>>) -> BTreeMap<String, Vec<String>> {
    grouped
        .into_iter()
        .map(|(date, names)| (format_iso_date(date), names))
        .collect()
}

/// Every absence from today on, keyed by date, for calendar display.
pub async fn upcoming_absences(ctx: &AppContext) -> Result<BTreeMap<String, Vec<String>>> {
    heartbeat(ctx).await;
    let grouped = absence::absences_from(&ctx.database, ctx.today()).await?;
    Ok(group_by_iso_date(grouped))
}

/// One employee's absences from today on, in date order.
pub async fn employee_absences(ctx: &AppContext, employee_name: &str) -> Result<Vec<String>> {
    require_employee_name(employee_name)?;
    heartbeat(ctx).await;
    let dates = absence::employee_absences_from(&ctx.database, employee_name, ctx.today()).await?;
    Ok(dates.into_iter().map(format_iso_date).collect())
}

/// Absences in the Monday-based week containing `date`, keyed by date.
pub async fn week_absences(ctx: &AppContext, date: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let date = parse_iso_date(date)?;
    heartbeat(ctx).await;
    let rows = absence::list_absences_in_range(&ctx.database, None, week_range(date)).await?;

    let mut grouped: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    for (name, day) in rows {
        grouped.entry(day).or_default().push(name);
    }
    Ok(group_by_iso_date(grouped))
}

/// Every registered employee.
pub async fn list_employees(ctx: &AppContext) -> Result<Vec<employee_entity::Model>> {
    heartbeat(ctx).await;
    employee::list_employees(&ctx.database).await
}

/// Flips whether the employee holds a key.
pub async fn toggle_key(ctx: &AppContext, employee_name: &str) -> Result<employee_entity::Model> {
    require_employee_name(employee_name)?;
    heartbeat(ctx).await;
    employee::toggle_key(&ctx.database, employee_name).await
}
