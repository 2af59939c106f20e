//! Alert ledger - per-date record of delivered alerts and follow-ups.
//!
//! The ledger is what makes the alert state machine survive restarts: an entry with
//! `followup_sent == false` means an alert cycle is open for that date.

use crate::{
    entities::{EmailLog, email_log},
    errors::Result,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    Set,
    prelude::*,
    sea_query::{Expr, OnConflict},
};

/// The ledger entry for `date`, if an alert was ever delivered for it.
pub async fn get_entry(db: &DatabaseConnection, date: NaiveDate) -> Result<Option<email_log::Model>> {
    EmailLog::find()
        .filter(email_log::Column::AlertDate.eq(date))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Opens a fresh alert cycle for `date`.
///
/// Any previous entry is overwritten in the same statement, so a `followup_sent` flag
/// left over from an earlier, closed cycle never carries into the new one.
pub async fn open_cycle(db: &DatabaseConnection, date: NaiveDate) -> Result<()> {
    let model = email_log::ActiveModel {
        alert_date: Set(date),
        followup_sent: Set(false),
        sent_at: Set(Utc::now()),
        ..Default::default()
    };

    EmailLog::insert(model)
        .on_conflict(
            OnConflict::column(email_log::Column::AlertDate)
                .update_columns([email_log::Column::FollowupSent, email_log::Column::SentAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

/// Closes the open cycle for `date`. Returns `false` when there was no open cycle.
pub async fn mark_followup(db: &DatabaseConnection, date: NaiveDate) -> Result<bool> {
    let result = EmailLog::update_many()
        .col_expr(email_log::Column::FollowupSent, Expr::value(true))
        .filter(email_log::Column::AlertDate.eq(date))
        .filter(email_log::Column::FollowupSent.eq(false))
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_open_cycle_then_close() -> Result<()> {
        let db = setup_test_db().await?;
        let day = date(2024, 7, 10);

        assert!(get_entry(&db, day).await?.is_none());

        open_cycle(&db, day).await?;
        let entry = get_entry(&db, day).await?.unwrap();
        assert!(entry.is_open());

        assert!(mark_followup(&db, day).await?);
        assert!(get_entry(&db, day).await?.unwrap().followup_sent);

        // Already closed
        assert!(!mark_followup(&db, day).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_reopening_replaces_closed_entry() -> Result<()> {
        let db = setup_test_db().await?;
        let day = date(2024, 7, 10);

        open_cycle(&db, day).await?;
        mark_followup(&db, day).await?;
        open_cycle(&db, day).await?;

        let entry = get_entry(&db, day).await?.unwrap();
        assert!(!entry.followup_sent);
        assert_eq!(EmailLog::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_mark_followup_without_entry() -> Result<()> {
        let db = setup_test_db().await?;

        assert!(!mark_followup(&db, date(2024, 7, 10)).await?);
        assert_eq!(EmailLog::find().count(&db).await?, 0);

        Ok(())
    }
}
