use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::InquiryId;
use crate::define_status_enum;

define_status_enum!(
    /// Handling state of a public inquiry. `Resolved` is terminal.
    InquiryStatus {
        Pending => "Pending",
        InProgress => "In Progress",
        Resolved => "Resolved",
    }
);

/// Contact-form inquiry submitted by a prospective student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: InquiryId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course_name: Option<String>,
    pub message: String,
    pub status: InquiryStatus,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Insert payload for a new inquiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub course_name: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_progress_wire_form() {
        let json = serde_json::to_string(&InquiryStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let parsed: InquiryStatus = serde_json::from_str("\"in progress\"").unwrap();
        assert_eq!(parsed, InquiryStatus::InProgress);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = "Closed".parse::<InquiryStatus>().unwrap_err();
        assert_eq!(err.kind, "InquiryStatus");
        assert_eq!(err.value, "Closed");

        let err = serde_json::from_str::<InquiryStatus>("\"Lost\"").unwrap_err();
        assert!(err.to_string().contains("unknown InquiryStatus value 'Lost'"));
        assert!(serde_json::from_str::<InquiryStatus>("3").is_err());
    }
}
