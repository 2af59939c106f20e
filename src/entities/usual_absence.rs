//! Usual absence entity - The weekly Monday-Friday default absence pattern of an employee.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::WeekdayFlags;

/// Usual absence template database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usual_absences")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning employee; at most one template per employee
    #[sea_orm(unique)]
    pub employee_name: String,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    /// When the template was last replaced
    pub updated_at: DateTime,
}

impl Model {
    /// The stored flags as a value type
    #[must_use]
    pub const fn flags(&self) -> WeekdayFlags {
        WeekdayFlags {
            monday: self.monday,
            tuesday: self.tuesday,
            wednesday: self.wednesday,
            thursday: self.thursday,
            friday: self.friday,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
