//! Public contact inquiries.

use chrono::Utc;
use tracing::info;

use super::{
    deliver, normalize_email, require_non_empty, validate_email, ServiceError, ServiceResult,
};
use crate::config::AppConfig;
use crate::db::repository::{FullRepository, InquiryRepository};
use crate::models::{Inquiry, InquiryId, InquiryStatus, NewInquiry};
use crate::notify::{templates, Mailer};

pub async fn submit_inquiry<R: FullRepository + ?Sized>(
    repo: &R,
    mut inquiry: NewInquiry,
) -> ServiceResult<Inquiry> {
    require_non_empty("name", &inquiry.name)?;
    require_non_empty("message", &inquiry.message)?;
    validate_email(&inquiry.email)?;

    inquiry.name = inquiry.name.trim().to_string();
    inquiry.email = normalize_email(&inquiry.email);
    inquiry.course_name = inquiry
        .course_name
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let created = repo.create_inquiry(inquiry).await?;
    info!(inquiry_id = %created.id, "Inquiry submitted");
    Ok(created)
}

pub async fn list_inquiries<R: FullRepository + ?Sized>(
    repo: &R,
    status: Option<InquiryStatus>,
) -> ServiceResult<Vec<Inquiry>> {
    Ok(repo.list_inquiries(status).await?)
}

pub async fn get_inquiry<R: FullRepository + ?Sized>(
    repo: &R,
    inquiry_id: InquiryId,
) -> ServiceResult<Inquiry> {
    Ok(repo.get_inquiry(inquiry_id).await?)
}

/// Move an inquiry to `status`. `Resolved` inquiries are closed.
///
/// Resolving stamps `resolved_at` and emails the response to the inquirer.
pub async fn update_inquiry_status<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    config: &AppConfig,
    inquiry_id: InquiryId,
    status: InquiryStatus,
    response: Option<String>,
) -> ServiceResult<Inquiry> {
    let mut inquiry = repo.get_inquiry(inquiry_id).await?;
    if inquiry.status == InquiryStatus::Resolved {
        return Err(ServiceError::bad_request(format!(
            "Inquiry {} is already resolved",
            inquiry_id
        )));
    }

    if let Some(response) = response.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) {
        inquiry.response = Some(response);
    }
    inquiry.status = status;
    if status == InquiryStatus::Resolved {
        inquiry.resolved_at = Some(Utc::now());
    }

    let updated = repo.update_inquiry(&inquiry).await?;
    info!(inquiry_id = %updated.id, status = %updated.status, "Inquiry status updated");

    if updated.status == InquiryStatus::Resolved {
        deliver(
            mailer,
            templates::inquiry_resolution_email(&config.school, &updated),
            "inquiry_resolution",
        )
        .await;
    }
    Ok(updated)
}
