//! Sync ledger - at-most-once bookkeeping for the recurring maintenance jobs.
//!
//! Entries live in the `system_state` table keyed by operation and calendar period,
//! e.g. `populate_2024_7`. Only existence matters; the value records when the job ran.

use crate::{
    core::calendar::YearMonth,
    entities::{SystemState, system_state},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Set, prelude::*, sea_query::OnConflict};

/// A recurring job scoped to one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    /// Seed a month's absences from usual-absence templates
    Populate,
    /// Purge a finished month's absences
    Cleanup,
}

impl SyncOperation {
    /// Prefix used in the ledger key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Populate => "populate",
            Self::Cleanup => "cleanup",
        }
    }
}

/// Ledger key for `operation` over `month`, e.g. `populate_2024_7`.
#[must_use]
pub fn sync_key(operation: SyncOperation, month: YearMonth) -> String {
    format!("{}_{}_{}", operation.as_str(), month.year(), month.month())
}

/// Whether the job identified by `key` has already completed.
pub async fn exists(db: &DatabaseConnection, key: &str) -> Result<bool> {
    let count = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Records the job identified by `key` as completed.
pub async fn put(db: &DatabaseConnection, key: &str) -> Result<()> {
    let now = Utc::now();
    let model = system_state::ActiveModel {
        key: Set(key.to_string()),
        value: Set(now.to_rfc3339()),
        updated_at: Set(now.naive_utc()),
        ..Default::default()
    };

    SystemState::insert(model)
        .on_conflict(
            OnConflict::column(system_state::Column::Key)
                .update_columns([system_state::Column::Value, system_state::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}
