//! Completion certificates: issuing, rendering and public verification.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{deliver, ServiceError, ServiceResult};
use crate::config::AppConfig;
use crate::db::checksum::sha256_hex;
use crate::db::repository::{EnrollmentRepository, FullRepository, UserRepository};
use crate::models::{
    Certificate, CertificateId, CertificateStatus, Enrollment, EnrollmentId, EnrollmentStatus,
    NewCertificate, UserId,
};
use crate::notify::{templates, Mailer};
use crate::render::{render_certificate, CertificateData};

/// Result of a public certificate lookup.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateVerification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
}

pub fn is_eligible(enrollment: &Enrollment) -> bool {
    enrollment.status == EnrollmentStatus::Completed && enrollment.lessons_done()
}

/// Hex SHA-256 of `number|student_id|student_name|course_name|issued_at`.
pub fn verification_hash(
    certificate_number: &str,
    student_id: UserId,
    student_name: &str,
    course_name: &str,
    issued_at: DateTime<Utc>,
) -> String {
    let payload = format!(
        "{}|{}|{}|{}|{}",
        certificate_number,
        student_id,
        student_name,
        course_name,
        issued_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    sha256_hex(payload.as_bytes())
}

fn recompute_hash(certificate: &Certificate) -> Option<String> {
    Some(verification_hash(
        certificate.certificate_number.as_deref()?,
        certificate.student_id,
        &certificate.student_name,
        &certificate.course_name,
        certificate.issued_at?,
    ))
}

fn certificate_data(config: &AppConfig, certificate: &Certificate) -> ServiceResult<CertificateData> {
    match (
        &certificate.certificate_number,
        &certificate.verification_hash,
        certificate.issued_at,
    ) {
        (Some(number), Some(hash), Some(issued_at)) if certificate.status == CertificateStatus::Issued => {
            Ok(CertificateData {
                school_name: config.school.name.clone(),
                student_name: certificate.student_name.clone(),
                course_name: certificate.course_name.clone(),
                issued_at,
                certificate_number: number.clone(),
                verification_hash: hash.clone(),
            })
        }
        _ => Err(ServiceError::bad_request(format!(
            "Certificate {} has not been issued",
            certificate.id
        ))),
    }
}

/// Issue the certificate for a completed enrollment and email it to the student.
///
/// Calling this again for an enrollment that already has an issued
/// certificate returns that certificate unchanged.
pub async fn generate<R: FullRepository + ?Sized>(
    repo: &R,
    mailer: &dyn Mailer,
    config: &AppConfig,
    enrollment_id: EnrollmentId,
) -> ServiceResult<Certificate> {
    let mut enrollment = repo.get_enrollment(enrollment_id).await?;
    if !is_eligible(&enrollment) {
        return Err(ServiceError::bad_request(format!(
            "Enrollment {} is not completed ({} of {} lessons, status {})",
            enrollment_id, enrollment.lessons_completed, enrollment.total_lessons, enrollment.status
        )));
    }

    let existing = repo.find_certificate_by_enrollment(enrollment_id).await?;
    let mut certificate = match existing {
        Some(certificate) if certificate.status == CertificateStatus::Issued => {
            debug!(certificate_id = %certificate.id, "Certificate already issued");
            return Ok(certificate);
        }
        Some(certificate) => certificate,
        None => {
            let student = repo.get_user(enrollment.student_id).await?;
            repo.create_certificate(NewCertificate {
                enrollment_id,
                student_id: student.id,
                student_name: student.name,
                course_name: enrollment.course_name.clone(),
            })
            .await?
        }
    };

    let issued_at = Utc::now().trunc_subsecs(0);
    let number = Certificate::number_for(certificate.id, issued_at);
    certificate.verification_hash = Some(verification_hash(
        &number,
        certificate.student_id,
        &certificate.student_name,
        &certificate.course_name,
        issued_at,
    ));
    certificate.certificate_number = Some(number);
    certificate.issued_at = Some(issued_at);
    certificate.status = CertificateStatus::Issued;

    let pdf = render_certificate(&certificate_data(config, &certificate)?)?;
    let certificate = repo.update_certificate(&certificate).await?;

    enrollment.certificate_status = CertificateStatus::Issued;
    repo.update_enrollment(&enrollment).await?;
    info!(
        certificate_id = %certificate.id,
        enrollment_id = %enrollment_id,
        number = certificate.certificate_number.as_deref().unwrap_or_default(),
        "Certificate issued"
    );

    match repo.get_user(certificate.student_id).await {
        Ok(student) => {
            deliver(
                mailer,
                templates::certificate_email(&config.school, &student.email, &certificate, pdf),
                "certificate",
            )
            .await
        }
        Err(e) => warn!(certificate_id = %certificate.id, error = %e, "Cannot email certificate"),
    }
    Ok(certificate)
}

/// Render an issued certificate. Returns `(filename, bytes)`.
pub async fn render_pdf<R: FullRepository + ?Sized>(
    repo: &R,
    config: &AppConfig,
    certificate_id: CertificateId,
) -> ServiceResult<(String, Vec<u8>)> {
    let certificate = repo.get_certificate(certificate_id).await?;
    let data = certificate_data(config, &certificate)?;
    let bytes = render_certificate(&data)?;
    Ok((format!("{}.pdf", data.certificate_number), bytes))
}

/// Look a certificate up by its number or verification hash.
///
/// Unknown codes are reported as invalid rather than as errors.
pub async fn verify<R: FullRepository + ?Sized>(
    repo: &R,
    code: &str,
) -> ServiceResult<CertificateVerification> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(CertificateVerification {
            valid: false,
            certificate: None,
        });
    }

    let found = match repo
        .find_certificate_by_number(&code.to_ascii_uppercase())
        .await?
    {
        Some(certificate) => Some(certificate),
        None => {
            repo.find_certificate_by_hash(&code.to_ascii_lowercase())
                .await?
        }
    };

    let Some(certificate) = found else {
        debug!(code, "Unknown certificate code");
        return Ok(CertificateVerification {
            valid: false,
            certificate: None,
        });
    };

    let valid = certificate.status == CertificateStatus::Issued
        && certificate.verification_hash.is_some()
        && recompute_hash(&certificate) == certificate.verification_hash;
    if !valid {
        warn!(certificate_id = %certificate.id, "Certificate failed verification");
    }
    Ok(CertificateVerification {
        valid,
        certificate: Some(certificate),
    })
}

pub async fn get_certificate<R: FullRepository + ?Sized>(
    repo: &R,
    certificate_id: CertificateId,
) -> ServiceResult<Certificate> {
    Ok(repo.get_certificate(certificate_id).await?)
}

pub async fn list_for_student<R: FullRepository + ?Sized>(
    repo: &R,
    student_id: UserId,
) -> ServiceResult<Vec<Certificate>> {
    repo.get_user(student_id).await?;
    Ok(repo.list_certificates_for_student(student_id).await?)
}
