//! Absence entity - "this employee will not be in the office on this date".
//!
//! The row's existence is the whole fact. `(employee_name, absence_date)` is unique;
//! the composite unique index is created alongside the table in
//! [`crate::config::database::create_tables`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Absence database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "absences")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Name of the absent employee
    pub employee_name: String,
    /// Calendar date of the absence, stored as `YYYY-MM-DD`
    pub absence_date: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
