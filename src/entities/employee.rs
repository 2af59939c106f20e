//! Employee entity - Someone who may or may not be in the office on a given day.
//!
//! Employees are identified by their (case-sensitive) name. The `has_key` flag marks
//! the key bearers whose combined absence triggers an office alert.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Employee database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    /// Unique identifier for the employee row
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Display name, also the identity used by absences and templates
    #[sea_orm(unique)]
    pub name: String,
    /// Whether this employee currently holds an office key
    pub has_key: bool,
    /// When the employee was registered
    pub created_at: DateTime,
}

/// Employees are linked to absences and templates by name, not by foreign key
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
