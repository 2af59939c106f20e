//! Absence store - which employee is out on which date.
//!
//! Marking an existing absence and cancelling a missing one are both no-ops rather than
//! errors; the boolean results only report whether a row actually changed.

use crate::{
    core::calendar::DateRange,
    entities::{Absence, absence},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::OnConflict};
use std::collections::BTreeMap;

/// Records that `employee_name` is absent on `date`. Returns `true` when a new row was
/// written and `false` when the absence was already recorded.
pub async fn upsert_absence(
    db: &DatabaseConnection,
    employee_name: &str,
    date: NaiveDate,
) -> Result<bool> {
    let model = absence::ActiveModel {
        employee_name: Set(employee_name.to_string()),
        absence_date: Set(date),
        ..Default::default()
    };

    let inserted = Absence::insert(model)
        .on_conflict(
            OnConflict::columns([absence::Column::EmployeeName, absence::Column::AbsenceDate])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(inserted > 0)
}

/// Removes the absence if present. Returns whether a row was deleted.
pub async fn delete_absence(
    db: &DatabaseConnection,
    employee_name: &str,
    date: NaiveDate,
) -> Result<bool> {
    let result = Absence::delete_many()
        .filter(absence::Column::EmployeeName.eq(employee_name))
        .filter(absence::Column::AbsenceDate.eq(date))
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

/// Whether an absence is recorded for the employee on `date`.
pub async fn is_absent(db: &DatabaseConnection, employee_name: &str, date: NaiveDate) -> Result<bool> {
    let count = Absence::find()
        .filter(absence::Column::EmployeeName.eq(employee_name))
        .filter(absence::Column::AbsenceDate.eq(date))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Names of everyone absent on `date`, ordered by name.
pub async fn list_absences(db: &DatabaseConnection, date: NaiveDate) -> Result<Vec<String>> {
    let rows = Absence::find()
        .filter(absence::Column::AbsenceDate.eq(date))
        .order_by_asc(absence::Column::EmployeeName)
        .all(db)
        .await?;

    Ok(rows.into_iter().map(|row| row.employee_name).collect())
}

/// All `(employee, date)` absences inside `range`, optionally restricted to some
/// employees. Ordered by date, then name.
pub async fn list_absences_in_range(
    db: &DatabaseConnection,
    employees: Option<&[String]>,
    range: DateRange,
) -> Result<Vec<(String, NaiveDate)>> {
    let mut query = Absence::find()
        .filter(absence::Column::AbsenceDate.gte(range.start))
        .filter(absence::Column::AbsenceDate.lt(range.end));

    if let Some(names) = employees {
        query = query.filter(absence::Column::EmployeeName.is_in(names.iter().map(String::as_str)));
    }

    let rows = query
        .order_by_asc(absence::Column::AbsenceDate)
        .order_by_asc(absence::Column::EmployeeName)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.employee_name, row.absence_date))
        .collect())
}

/// Deletes every absence inside `range`. Returns the number of rows removed.
pub async fn delete_absences_in_range(db: &DatabaseConnection, range: DateRange) -> Result<u64> {
    let result = Absence::delete_many()
        .filter(absence::Column::AbsenceDate.gte(range.start))
        .filter(absence::Column::AbsenceDate.lt(range.end))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Absences on or after `from`, grouped by date for calendar display.
pub async fn absences_from(
    db: &DatabaseConnection,
    from: NaiveDate,
) -> Result<BTreeMap<NaiveDate, Vec<String>>> {
    let rows = Absence::find()
        .filter(absence::Column::AbsenceDate.gte(from))
        .order_by_asc(absence::Column::AbsenceDate)
        .order_by_asc(absence::Column::EmployeeName)
        .all(db)
        .await?;

    let mut grouped: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.absence_date)
            .or_default()
            .push(row.employee_name);
    }
    Ok(grouped)
}

/// One employee's absences on or after `from`, in date order.
pub async fn employee_absences_from(
    db: &DatabaseConnection,
    employee_name: &str,
    from: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    let rows = Absence::find()
        .filter(absence::Column::EmployeeName.eq(employee_name))
        .filter(absence::Column::AbsenceDate.gte(from))
        .order_by_asc(absence::Column::AbsenceDate)
        .all(db)
        .await?;

    Ok(rows.into_iter().map(|row| row.absence_date).collect())
}
