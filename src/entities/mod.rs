//! Entity module - Contains all SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod absence;
pub mod email_log;
pub mod employee;
pub mod system_state;
pub mod usual_absence;

// Re-export specific types to avoid conflicts
pub use absence::{Column as AbsenceColumn, Entity as Absence, Model as AbsenceModel};
pub use email_log::{Column as EmailLogColumn, Entity as EmailLog, Model as EmailLogModel};
pub use employee::{Column as EmployeeColumn, Entity as Employee, Model as EmployeeModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use usual_absence::{
    Column as UsualAbsenceColumn, Entity as UsualAbsence, Model as UsualAbsenceModel,
};
