//! Notification content. Both kinds are sent as multipart/alternative with a plain-text
//! and an HTML body.

use crate::core::calendar::format_long_date;
use crate::models::EmployeeName;
use chrono::NaiveDate;

const FOOTER: &str = "This is an automated message from the Office Key Tracker.";

/// A composed message, ready for any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Minimal escaping for names interpolated into HTML.
fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// "All key bearers absent" alert for `date`.
#[must_use]
pub fn alert_message(date: NaiveDate, key_bearers: &[EmployeeName]) -> MessageContent {
    let formatted_date = format_long_date(date);

    let status_lines: String = key_bearers
        .iter()
        .map(|bearer| format!("  - {bearer}: Not Available\n"))
        .collect();
    let status_items: String = key_bearers
        .iter()
        .map(|bearer| format!("<li>{} - Not Available</li>", escape_html(bearer.as_str())))
        .collect();

    let text_body = format!(
        "OFFICE ACCESS ALERT\n\n\
         Date: {formatted_date}\n\n\
         All key bearers have indicated they will NOT be in the office on this date.\n\n\
         Key Bearers Status:\n{status_lines}\n\
         Please make alternative arrangements if you need office access on this day.\n\n\
         ---\n{FOOTER}\n"
    );

    let html_body = format!(
        "<!DOCTYPE html><html><body>\
         <h1>Office Key Tracker</h1>\
         <h2>{formatted_date}</h2>\
         <p>No key bearers available</p>\
         <p><strong>All key bearers</strong> have indicated they will NOT be in the office on this date.</p>\
         <h3>Key Bearers Status:</h3><ul>{status_items}</ul>\
         <p>Please make alternative arrangements if you need office access on this day.</p>\
         <p><small>{FOOTER}</small></p>\
         </body></html>"
    );

    MessageContent {
        subject: format!("Office Alert - No Key Bearers Available - {formatted_date}"),
        text_body,
        html_body,
    }
}

/// "Change of plans" follow-up: `employee_name` will be in on `date` after all.
#[must_use]
pub fn change_of_plans_message(date: NaiveDate, employee_name: &str) -> MessageContent {
    let formatted_date = format_long_date(date);
    let escaped_name = escape_html(employee_name);

    let text_body = format!(
        "CHANGE OF PLANS\n\n\
         Date: {formatted_date}\n\n\
         Good news! {employee_name} is now going to be in the office on this date.\n\n\
         The office will be accessible.\n\n\
         ---\n{FOOTER}\n"
    );

    let html_body = format!(
        "<!DOCTYPE html><html><body>\
         <h1>Office Key Tracker</h1>\
         <h2>{formatted_date}</h2>\
         <p>Change of Plans</p>\
         <h3>Good News!</h3>\
         <p><strong>{escaped_name}</strong> is now going to be in the office on this date.</p>\
         <p>The office will be accessible.</p>\
         <p><small>{FOOTER}</small></p>\
         </body></html>"
    );

    MessageContent {
        subject: format!("Office Update - Change of Plans - {formatted_date}"),
        text_body,
        html_body,
    }
}
