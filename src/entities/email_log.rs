//! Email log entity - The alert ledger.
//!
//! One row per date on which an "all key bearers absent" alert was delivered. A row with
//! `followup_sent == false` is an open alert cycle; no row, or `followup_sent == true`,
//! is a closed one.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Alert ledger database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Date the alert was about
    #[sea_orm(unique)]
    pub alert_date: Date,
    /// Whether the "change of plans" follow-up has been delivered for this cycle
    pub followup_sent: bool,
    /// When the alert for the current cycle was delivered
    pub sent_at: DateTimeUtc,
}

impl Model {
    /// An alert went out and nobody has closed the cycle yet.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !self.followup_sent
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
