//! Employee registry - who works here, who holds a key, and their usual absences.
//!
//! Employees are never hard-deleted. Templates are replaced wholesale on every update
//! and only seed future absences; they never enforce presence retroactively.

use crate::{
    entities::{Employee, UsualAbsence, employee, usual_absence},
    errors::{Error, Result},
    models::WeekdayFlags,
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::OnConflict};

/// Retrieves every employee, ordered alphabetically by name.
pub async fn list_employees(db: &DatabaseConnection) -> Result<Vec<employee::Model>> {
    Employee::find()
        .order_by_asc(employee::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the employees currently holding a key, ordered by name.
pub async fn list_key_bearers(db: &DatabaseConnection) -> Result<Vec<employee::Model>> {
    Employee::find()
        .filter(employee::Column::HasKey.eq(true))
        .order_by_asc(employee::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an employee by exact name.
pub async fn get_employee(db: &DatabaseConnection, name: &str) -> Result<Option<employee::Model>> {
    Employee::find()
        .filter(employee::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_employee`] but a missing employee is an error.
pub async fn require_employee(db: &DatabaseConnection, name: &str) -> Result<employee::Model> {
    get_employee(db, name)
        .await?
        .ok_or_else(|| Error::EmployeeNotFound {
            name: name.to_string(),
        })
}

/// Registers a new employee. Names are stored exactly as given.
pub async fn create_employee(
    db: &DatabaseConnection,
    name: &str,
    has_key: bool,
) -> Result<employee::Model> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Employee name cannot be empty".to_string(),
        });
    }

    let model = employee::ActiveModel {
        name: Set(name.to_string()),
        has_key: Set(has_key),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    Ok(model.insert(db).await?)
}

/// Registers the employee unless they already exist. An existing row, including its
/// `has_key` flag, is returned untouched.
pub async fn ensure_employee(
    db: &DatabaseConnection,
    name: &str,
    has_key: bool,
) -> Result<employee::Model> {
    match get_employee(db, name).await? {
        Some(existing) => Ok(existing),
        None => create_employee(db, name, has_key).await,
    }
}

/// Sets whether the employee holds a key.
pub async fn set_has_key(
    db: &DatabaseConnection,
    name: &str,
    has_key: bool,
) -> Result<employee::Model> {
    let existing = require_employee(db, name).await?;
    let mut active_model: employee::ActiveModel = existing.into();
    active_model.has_key = Set(has_key);
    Ok(active_model.update(db).await?)
}

/// Flips the employee's key flag and returns the updated row.
pub async fn toggle_key(db: &DatabaseConnection, name: &str) -> Result<employee::Model> {
    let existing = require_employee(db, name).await?;
    let has_key = !existing.has_key;
    let mut active_model: employee::ActiveModel = existing.into();
    active_model.has_key = Set(has_key);
    Ok(active_model.update(db).await?)
}

/// The employee's usual-absence template; all-false when none has been stored.
pub async fn get_template(db: &DatabaseConnection, name: &str) -> Result<WeekdayFlags> {
    let template = UsualAbsence::find()
        .filter(usual_absence::Column::EmployeeName.eq(name))
        .one(db)
        .await?;

    Ok(template.map(|t| t.flags()).unwrap_or_default())
}

/// Every stored template.
pub async fn list_templates(db: &DatabaseConnection) -> Result<Vec<usual_absence::Model>> {
    UsualAbsence::find()
        .order_by_asc(usual_absence::Column::EmployeeName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces all five flags of the employee's template in a single upsert.
pub async fn upsert_template(
    db: &DatabaseConnection,
    name: &str,
    flags: WeekdayFlags,
) -> Result<usual_absence::Model> {
    let model = usual_absence::ActiveModel {
        employee_name: Set(name.to_string()),
        monday: Set(flags.monday),
        tuesday: Set(flags.tuesday),
        wednesday: Set(flags.wednesday),
        thursday: Set(flags.thursday),
        friday: Set(flags.friday),
        updated_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    UsualAbsence::insert(model)
        .on_conflict(
            OnConflict::column(usual_absence::Column::EmployeeName)
                .update_columns([
                    usual_absence::Column::Monday,
                    usual_absence::Column::Tuesday,
                    usual_absence::Column::Wednesday,
                    usual_absence::Column::Thursday,
                    usual_absence::Column::Friday,
                    usual_absence::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    UsualAbsence::find()
        .filter(usual_absence::Column::EmployeeName.eq(name))
        .one(db)
        .await?
        .ok_or_else(|| Error::EmployeeNotFound {
            name: name.to_string(),
        })
}
