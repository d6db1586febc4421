use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Inquiry, InquiryId, InquiryStatus, NewInquiry};

/// Repository trait for public inquiries.
#[async_trait]
pub trait InquiryRepository: Send + Sync {
    /// Store a new inquiry in `Pending` state.
    async fn create_inquiry(&self, inquiry: NewInquiry) -> RepositoryResult<Inquiry>;

    async fn get_inquiry(&self, inquiry_id: InquiryId) -> RepositoryResult<Inquiry>;

    /// List inquiries newest first, optionally filtered by status.
    async fn list_inquiries(&self, status: Option<InquiryStatus>)
        -> RepositoryResult<Vec<Inquiry>>;

    /// Persist status, response and resolution timestamp.
    async fn update_inquiry(&self, inquiry: &Inquiry) -> RepositoryResult<Inquiry>;
}
