/// Absence records: per-employee, per-date rows
pub mod absence;
/// The alert engine: "all key bearers absent" alerts and change-of-plans follow-ups
pub mod alert;
/// Dates, weeks, months and the clock
pub mod calendar;
/// Employees, key holding and usual-absence templates
pub mod employee;
/// Per-date record of sent alerts and follow-ups
pub mod ledger;
/// Monthly populate and cleanup jobs, driven by the request heartbeat
pub mod scheduler;
/// Once-per-month markers for the scheduler jobs
pub mod sync_ledger;
/// Projection of usual-absence templates onto concrete dates
pub mod template;
