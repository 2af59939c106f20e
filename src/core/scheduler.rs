//! Sync scheduler - the recurring populate and cleanup sweeps.
//!
//! The scheduler has no timer of its own. [`run_heartbeat`] is called inline by request
//! handling (and by the binary's periodic tick), so it must be cheap and safe to call
//! arbitrarily often. Each job checks the [sync ledger](crate::core::sync_ledger) first
//! and runs at most once per calendar month:
//!
//! * from day 25 on, next month's absences are seeded from every usual-absence template
//! * from day 5 on, last month's absences are purged
//!
//! If a job finishes its writes but the ledger entry cannot be stored, the job runs again
//! on the next heartbeat. For population that only repeats no-op upserts; for cleanup it
//! repeats an idempotent range delete.

use crate::{
    context::AppContext,
    core::{
        absence,
        calendar::{DateRange, YearMonth},
        employee,
        sync_ledger::{self, SyncOperation},
    },
    errors::Result,
};
use chrono::{Datelike, NaiveDate};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Day of the month from which next month is populated.
pub const POPULATE_FROM_DAY: u32 = 25;
/// Day of the month from which last month is cleaned up.
pub const CLEANUP_FROM_DAY: u32 = 5;

/// What happened to one templated absence during population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "error")]
pub enum RecordStatus {
    /// A new absence row was written
    Inserted,
    /// The absence already existed
    AlreadyPresent,
    /// The write failed; population carried on with the next record
    Failed(String),
}

/// Per-record result of [`populate_from_templates`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub employee: String,
    pub date: NaiveDate,
    pub status: RecordStatus,
}

/// Result of one populate run.
#[derive(Debug, Clone, Serialize)]
pub struct PopulateResult {
    /// Sync ledger key written for this run
    pub key: String,
    /// Every templated absence that was attempted
    pub outcomes: Vec<RecordOutcome>,
}

impl PopulateResult {
    /// Number of absences newly written.
    #[must_use]
    pub fn inserted_count(&self) -> usize {
        self.count(|status| matches!(status, RecordStatus::Inserted))
    }

    /// Number of absences that already existed.
    #[must_use]
    pub fn already_present_count(&self) -> usize {
        self.count(|status| matches!(status, RecordStatus::AlreadyPresent))
    }

    /// Records whose write failed.
    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RecordStatus::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&RecordStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }
}

/// Result of one cleanup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupResult {
    /// Sync ledger key written for this run
    pub key: String,
    /// Absence rows removed
    pub deleted: u64,
}

/// What a heartbeat did. `None` means the job was not due or had already run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeartbeatResult {
    pub populate: Option<PopulateResult>,
    pub cleanup: Option<CleanupResult>,
}

/// Expands every stored usual-absence template across the weekdays of `range`.
///
/// Individual write failures are recorded in the returned outcomes instead of aborting
/// the sweep. Only failing to read the templates is an error.
pub async fn populate_from_templates(
    db: &DatabaseConnection,
    range: DateRange,
) -> Result<Vec<RecordOutcome>> {
    let templates = employee::list_templates(db).await?;
    let mut outcomes = Vec::new();

    for template in templates {
        let flags = template.flags();
        for day in range.weekdays().filter(|d| flags.is_absent_on(d.weekday())) {
            let status = match absence::upsert_absence(db, &template.employee_name, day).await {
                Ok(true) => RecordStatus::Inserted,
                Ok(false) => RecordStatus::AlreadyPresent,
                Err(e) => {
                    warn!(
                        employee = %template.employee_name,
                        date = %day,
                        "Failed to populate absence: {}",
                        e
                    );
                    RecordStatus::Failed(e.to_string())
                }
            };
            outcomes.push(RecordOutcome {
                employee: template.employee_name.clone(),
                date: day,
                status,
            });
        }
    }

    Ok(outcomes)
}

/// Seeds next month from templates once `today` reaches [`POPULATE_FROM_DAY`], unless
/// that month has already been populated.
///
/// # Arguments
/// * `db` - Database connection
/// * `today` - The current civil date
///
/// # Returns
/// * `Ok(None)` if the job is not due yet or already ran for next month
/// * `Ok(Some(result))` with per-record outcomes when it ran
pub async fn populate_next_month_if_due(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<Option<PopulateResult>> {
    if today.day() < POPULATE_FROM_DAY {
        return Ok(None);
    }

    let target = YearMonth::of(today).next();
    let key = sync_ledger::sync_key(SyncOperation::Populate, target);
    if sync_ledger::exists(db, &key).await? {
        debug!("{} already done", key);
        return Ok(None);
    }

    let outcomes = populate_from_templates(db, target.range()).await?;
    sync_ledger::put(db, &key).await?;

    let result = PopulateResult { key, outcomes };
    info!(
        key = %result.key,
        inserted = result.inserted_count(),
        already_present = result.already_present_count(),
        failed = result.failures().count(),
        "Populated absences from usual-absence templates"
    );
    Ok(Some(result))
}

/// Purges last month's absences once `today` reaches [`CLEANUP_FROM_DAY`], unless that
/// month has already been cleaned up.
pub async fn cleanup_previous_month_if_due(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<Option<CleanupResult>> {
    if today.day() < CLEANUP_FROM_DAY {
        return Ok(None);
    }

    let target = YearMonth::of(today).previous();
    let key = sync_ledger::sync_key(SyncOperation::Cleanup, target);
    if sync_ledger::exists(db, &key).await? {
        debug!("{} already done", key);
        return Ok(None);
    }

    let deleted = absence::delete_absences_in_range(db, target.range()).await?;
    sync_ledger::put(db, &key).await?;

    info!(%key, deleted, "Cleaned up past month's absences");
    Ok(Some(CleanupResult { key, deleted }))
}

/// Runs both jobs for the context's current date. A failing job is logged and does not
/// prevent the other from running.
pub async fn run_heartbeat(ctx: &AppContext) -> HeartbeatResult {
    let today = ctx.today();
    let db = &ctx.database;

    let populate = populate_next_month_if_due(db, today)
        .await
        .inspect_err(|e| error!("Populate job failed: {}", e))
        .ok()
        .flatten();
    let cleanup = cleanup_previous_month_if_due(db, today)
        .await
        .inspect_err(|e| error!("Cleanup job failed: {}", e))
        .ok()
        .flatten();

    HeartbeatResult { populate, cleanup }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::employee::upsert_template;
    use crate::entities::Absence;
    use crate::models::WeekdayFlags;
    use crate::test_utils::*;
    use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};

    const MONDAYS: WeekdayFlags = WeekdayFlags {
        monday: true,
        tuesday: false,
        wednesday: false,
        thursday: false,
        friday: false,
    };

    #[tokio::test]
    async fn test_populate_not_due_before_day_25() -> Result<()> {
        let db = setup_test_db().await?;
        upsert_template(&db, "Alice", MONDAYS).await?;

        assert!(populate_next_month_if_due(&db, date(2024, 7, 24)).await?.is_none());
        assert_eq!(Absence::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_populate_next_month_from_templates() -> Result<()> {
        let db = setup_test_db().await?;
        upsert_template(&db, "Alice", MONDAYS).await?;
        upsert_template(
            &db,
            "Bob",
            WeekdayFlags {
                friday: true,
                ..Default::default()
            },
        )
        .await?;

        let result = populate_next_month_if_due(&db, date(2024, 7, 25))
            .await?
            .unwrap();

        assert_eq!(result.key, "populate_2024_8");
        // August 2024: Mondays 5, 12, 19, 26 and Fridays 2, 9, 16, 23, 30
        assert_eq!(result.inserted_count(), 9);
        assert_eq!(result.failures().count(), 0);
        assert!(absence::is_absent(&db, "Alice", date(2024, 8, 26)).await?);
        assert!(absence::is_absent(&db, "Bob", date(2024, 8, 30)).await?);
        assert!(!absence::is_absent(&db, "Alice", date(2024, 7, 29)).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_populate_runs_once_per_month() -> Result<()> {
        let db = setup_test_db().await?;
        upsert_template(&db, "Alice", MONDAYS).await?;

        assert!(populate_next_month_if_due(&db, date(2024, 7, 25)).await?.is_some());
        assert!(populate_next_month_if_due(&db, date(2024, 7, 26)).await?.is_none());
        assert!(populate_next_month_if_due(&db, date(2024, 7, 31)).await?.is_none());

        // A manual cancellation inside the populated month is not undone by later heartbeats
        absence::delete_absence(&db, "Alice", date(2024, 8, 5)).await?;
        populate_next_month_if_due(&db, date(2024, 7, 30)).await?;
        assert!(!absence::is_absent(&db, "Alice", date(2024, 8, 5)).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_populate_keeps_existing_absences() -> Result<()> {
        let db = setup_test_db().await?;
        upsert_template(&db, "Alice", MONDAYS).await?;
        absence::upsert_absence(&db, "Alice", date(2024, 8, 5)).await?;

        let result = populate_next_month_if_due(&db, date(2024, 7, 28))
            .await?
            .unwrap();
        assert_eq!(result.already_present_count(), 1);
        assert_eq!(result.inserted_count(), 3);
        assert_eq!(Absence::find().count(&db).await?, 4);

        Ok(())
    }

    #[tokio::test]
    async fn test_populate_records_failures_and_carries_on() -> Result<()> {
        let db = setup_test_db().await?;
        upsert_template(&db, "Alice", MONDAYS).await?;
        db.execute_unprepared("DROP TABLE absences").await?;

        let result = populate_next_month_if_due(&db, date(2024, 7, 25))
            .await?
            .unwrap();

        // Every Monday of August 2024 was attempted and failed on its own
        assert_eq!(result.outcomes.len(), 4);
        assert!(
            result
                .outcomes
                .iter()
                .all(|o| matches!(o.status, RecordStatus::Failed(_)))
        );
        assert_eq!(result.failures().count(), 4);
        assert_eq!(result.inserted_count(), 0);
        assert!(sync_ledger::exists(&db, &result.key).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_populate_rolls_over_year() -> Result<()> {
        let db = setup_test_db().await?;
        upsert_template(&db, "Alice", MONDAYS).await?;

        let result = populate_next_month_if_due(&db, date(2024, 12, 27))
            .await?
            .unwrap();
        assert_eq!(result.key, "populate_2025_1");
        assert!(absence::is_absent(&db, "Alice", date(2025, 1, 6)).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_cleanup_previous_month_once() -> Result<()> {
        let db = setup_test_db().await?;
        absence::upsert_absence(&db, "Alice", date(2024, 6, 3)).await?;
        absence::upsert_absence(&db, "Bob", date(2024, 6, 30)).await?;
        absence::upsert_absence(&db, "Alice", date(2024, 7, 1)).await?;

        assert!(cleanup_previous_month_if_due(&db, date(2024, 7, 4)).await?.is_none());

        let result = cleanup_previous_month_if_due(&db, date(2024, 7, 5))
            .await?
            .unwrap();
        assert_eq!(result.key, "cleanup_2024_6");
        assert_eq!(result.deleted, 2);
        assert!(absence::is_absent(&db, "Alice", date(2024, 7, 1)).await?);

        // A late-arriving June record survives a second heartbeat in the same month
        absence::upsert_absence(&db, "Bob", date(2024, 6, 28)).await?;
        assert!(cleanup_previous_month_if_due(&db, date(2024, 7, 20)).await?.is_none());
        assert!(absence::is_absent(&db, "Bob", date(2024, 6, 28)).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_cleanup_rolls_back_over_year() -> Result<()> {
        let db = setup_test_db().await?;
        absence::upsert_absence(&db, "Alice", date(2024, 12, 31)).await?;

        let result = cleanup_previous_month_if_due(&db, date(2025, 1, 10))
            .await?
            .unwrap();
        assert_eq!(result.key, "cleanup_2024_12");
        assert_eq!(result.deleted, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_heartbeat_runs_both_jobs_when_due() -> Result<()> {
        let (ctx, _notifier) = setup_test_context(date(2024, 7, 26)).await?;
        upsert_template(&ctx.database, "Alice", MONDAYS).await?;
        absence::upsert_absence(&ctx.database, "Alice", date(2024, 6, 10)).await?;

        let first = run_heartbeat(&ctx).await;
        assert_eq!(first.populate.unwrap().key, "populate_2024_8");
        assert_eq!(first.cleanup.unwrap().key, "cleanup_2024_6");

        for _ in 0..5 {
            let again = run_heartbeat(&ctx).await;
            assert!(again.populate.is_none());
            assert!(again.cleanup.is_none());
        }

        Ok(())
    }
}
