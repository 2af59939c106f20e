//! Plain value types shared between the store layer and the decision logic.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an employee. Comparison is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeName(String);

impl EmployeeName {
    /// Wraps a name without normalising it.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EmployeeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EmployeeName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which weekdays an employee is usually out of the office.
///
/// Weekends are never flagged; [`WeekdayFlags::is_absent_on`] returns `false` for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayFlags {
    /// Usually absent on Mondays
    #[serde(default)]
    pub monday: bool,
    /// Usually absent on Tuesdays
    #[serde(default)]
    pub tuesday: bool,
    /// Usually absent on Wednesdays
    #[serde(default)]
    pub wednesday: bool,
    /// Usually absent on Thursdays
    #[serde(default)]
    pub thursday: bool,
    /// Usually absent on Fridays
    #[serde(default)]
    pub friday: bool,
}

impl WeekdayFlags {
    /// Whether the template marks `weekday` as a usual absence.
    #[must_use]
    pub const fn is_absent_on(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat | Weekday::Sun => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_flags_lookup() {
        let flags = WeekdayFlags {
            monday: true,
            friday: true,
            ..Default::default()
        };

        assert!(flags.is_absent_on(Weekday::Mon));
        assert!(!flags.is_absent_on(Weekday::Wed));
        assert!(flags.is_absent_on(Weekday::Fri));
        assert!(!flags.is_absent_on(Weekday::Sat));
        assert!(!WeekdayFlags::default().is_absent_on(Weekday::Mon));
    }

    #[test]
    fn test_employee_name_is_case_sensitive() {
        assert_ne!(EmployeeName::from("alice"), EmployeeName::from("Alice"));
        assert_eq!(EmployeeName::from("Alice").to_string(), "Alice");
    }
}
