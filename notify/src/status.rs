//! Complaint status vocabulary and the notification texts sent for each
//! status change.

/// Statuses recognized by the notification relay. Parsing is case-insensitive
/// and tolerant of surrounding whitespace; "completed" is an alias of
/// resolved. Anything else is carried through verbatim for the generic
/// update wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplaintStatus {
    Assigned,
    InProgress,
    Resolved,
    Other(String),
}

impl ComplaintStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "assigned" => ComplaintStatus::Assigned,
            "in progress" => ComplaintStatus::InProgress,
            "resolved" | "completed" => ComplaintStatus::Resolved,
            _ => ComplaintStatus::Other(raw.trim().to_string()),
        }
    }

    /// Only the well-known statuses trigger notifications.
    pub fn should_notify(&self) -> bool {
        !matches!(self, ComplaintStatus::Other(_))
    }
}

/// Rendered notification content for one status change.
#[derive(Debug, Clone)]
pub struct StatusMessages {
    pub sms: String,
    pub email_subject: String,
    pub email_body: String,
}

/// Build the SMS and email texts for a status change.
pub fn status_messages(
    status: &ComplaintStatus,
    department: Option<&str>,
    issue_type: Option<&str>,
) -> StatusMessages {
    let dept = department.filter(|d| !d.is_empty()).unwrap_or("the department");
    let issue = issue_type.filter(|i| !i.is_empty()).unwrap_or("your complaint");

    match status {
        ComplaintStatus::Assigned => StatusMessages {
            sms: format!(
                "Your complaint \"{issue}\" has been assigned to {dept}. \
                 We'll keep you updated on the progress."
            ),
            email_subject: format!("Complaint Assigned - {issue}"),
            email_body: format!(
                "Dear Citizen,\n\nYour complaint \"{issue}\" has been assigned to {dept}.\n\n\
                 We will keep you updated on the progress.\n\n\
                 Thank you for using CivicHero.\n\nBest regards,\nCivicHero Team"
            ),
        },
        ComplaintStatus::InProgress => StatusMessages {
            sms: format!(
                "Good news! Your complaint \"{issue}\" is now In Progress by {dept}. \
                 We're working on resolving it."
            ),
            email_subject: format!("Complaint In Progress - {issue}"),
            email_body: format!(
                "Dear Citizen,\n\nGreat news! Your complaint \"{issue}\" is now In Progress by {dept}.\n\n\
                 Our team is actively working on resolving your issue. \
                 We'll notify you once it's completed.\n\n\
                 Thank you for your patience.\n\nBest regards,\nCivicHero Team"
            ),
        },
        ComplaintStatus::Resolved => StatusMessages {
            sms: format!(
                "🎉 Your complaint \"{issue}\" has been marked as Resolved by {dept}. \
                 Thank you for using CivicHero!"
            ),
            email_subject: format!("Complaint Resolved - {issue}"),
            email_body: format!(
                "Dear Citizen,\n\nWe're pleased to inform you that your complaint \"{issue}\" \
                 has been successfully resolved by {dept}.\n\n\
                 Thank you for using CivicHero and helping us improve our community!\n\n\
                 If you have any feedback, please don't hesitate to reach out.\n\n\
                 Best regards,\nCivicHero Team"
            ),
        },
        ComplaintStatus::Other(raw) => StatusMessages {
            sms: format!(
                "Your complaint \"{issue}\" status has been updated to {raw} by {dept}."
            ),
            email_subject: format!("Complaint Status Update - {issue}"),
            email_body: format!(
                "Dear Citizen,\n\nYour complaint \"{issue}\" status has been updated to {raw} by {dept}.\n\n\
                 Thank you for using CivicHero.\n\nBest regards,\nCivicHero Team"
            ),
        },
    }
}
