//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Creation is idempotent, which lets the
//! binary call [`create_tables`] on every start.

use crate::entities::{Absence, EmailLog, Employee, SystemState, UsualAbsence, absence};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use std::{fs, path::Path};
use tracing::{debug, info};

/// Default location of the `SQLite` database; `mode=rwc` creates the file on first run.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/key_tracker.sqlite?mode=rwc";

/// The on-disk path of a `sqlite://` URL, without query parameters. `None` for
/// in-memory databases and other backends.
fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url.strip_prefix("sqlite://")?;
    let path = rest.split('?').next().unwrap_or(rest);
    (!path.is_empty() && !path.starts_with(":memory:")).then(|| Path::new(path))
}

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {}", database_url);
    if let Some(parent) = sqlite_file_path(database_url).and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables, plus the composite unique index that makes an absence unique
/// per `(employee_name, absence_date)`.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, Employee).await?;
    create_table(db, &schema, UsualAbsence).await?;
    create_table(db, &schema, Absence).await?;
    create_table(db, &schema, EmailLog).await?;
    create_table(db, &schema, SystemState).await?;

    let absence_index = Index::create()
        .name("idx_absences_employee_date")
        .table(Absence)
        .col(absence::Column::EmployeeName)
        .col(absence::Column::AbsenceDate)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&absence_index)).await?;

    info!("Database tables ensured.");
    Ok(())
}
