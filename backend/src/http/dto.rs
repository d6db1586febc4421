//! Data Transfer Objects for the HTTP API.
//!
//! Request bodies that map one-to-one onto a service call reuse the service
//! types (`RegisterRequest`, `CreateBookingRequest`, ...). The types here
//! cover query strings, small action bodies and response envelopes.

use serde::{Deserialize, Serialize};

use crate::db::repository::BookingFilter;
use crate::models::{
    BookingStatus, EnrollmentStatus, InquiryStatus, PaymentMethod, User, UserId,
};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Envelope for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ==================== Auth ====================

#[derive(Debug, Clone, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// Public contact card for a user, as listed on unauthenticated endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
        }
    }
}

// ==================== Queries ====================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseListQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InquiryListQuery {
    pub status: Option<InquiryStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListQuery {
    pub student_id: Option<UserId>,
    pub status: Option<BookingStatus>,
}

impl From<BookingListQuery> for BookingFilter {
    fn from(query: BookingListQuery) -> Self {
        BookingFilter {
            student_id: query.student_id,
            status: query.status,
        }
    }
}

// ==================== Status changes and actions ====================

#[derive(Debug, Clone, Deserialize)]
pub struct InquiryStatusRequest {
    pub status: InquiryStatus,
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentStatusRequest {
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressRequest {
    pub lessons_completed: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayRequest {
    #[serde(default = "default_method")]
    pub method: PaymentMethod,
}

fn default_method() -> PaymentMethod {
    PaymentMethod::Cash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_counts_items() {
        let list: ListResponse<i32> = vec![1, 2, 3].into();
        assert_eq!(list.total, 3);
    }

    #[test]
    fn test_pay_request_defaults_to_cash() {
        let req: PayRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.method, PaymentMethod::Cash);
        let req: PayRequest = serde_json::from_str(r#"{"method":"Card"}"#).unwrap();
        assert_eq!(req.method, PaymentMethod::Card);
    }
}
