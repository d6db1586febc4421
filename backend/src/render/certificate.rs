use chrono::{DateTime, Utc};

use super::{Canvas, RenderError};

/// Everything printed on a completion certificate.
#[derive(Debug, Clone)]
pub struct CertificateData {
    pub school_name: String,
    pub student_name: String,
    pub course_name: String,
    pub issued_at: DateTime<Utc>,
    pub certificate_number: String,
    pub verification_hash: String,
}

const LANDSCAPE_WIDTH: f32 = 297.0;
const LANDSCAPE_HEIGHT: f32 = 210.0;

/// A4 landscape certificate with a double border.
pub fn render_certificate(data: &CertificateData) -> Result<Vec<u8>, RenderError> {
    let canvas = Canvas::new(
        &format!("Certificate {}", data.certificate_number),
        LANDSCAPE_WIDTH,
        LANDSCAPE_HEIGHT,
    )?;

    canvas.rect(10.0, 10.0, LANDSCAPE_WIDTH - 20.0, LANDSCAPE_HEIGHT - 20.0, 2.5);
    canvas.rect(15.0, 15.0, LANDSCAPE_WIDTH - 30.0, LANDSCAPE_HEIGHT - 30.0, 0.75);

    canvas.centered(&data.school_name, 18.0, 175.0, true);
    canvas.centered("CERTIFICATE OF COMPLETION", 28.0, 150.0, true);
    canvas.centered("This is to certify that", 13.0, 130.0, false);
    canvas.centered(&data.student_name, 26.0, 112.0, true);
    canvas.line((70.0, 108.0), (227.0, 108.0), 0.75);
    canvas.centered("has successfully completed the course", 13.0, 95.0, false);
    canvas.centered(&data.course_name, 20.0, 80.0, true);
    canvas.centered(
        &format!("Issued on {}", data.issued_at.format("%d %B %Y")),
        12.0,
        62.0,
        false,
    );

    canvas.text(
        &format!("Certificate No: {}", data.certificate_number),
        10.0,
        25.0,
        32.0,
    );
    canvas.text(
        &format!("Verification code: {}", data.verification_hash),
        7.0,
        25.0,
        25.0,
    );

    canvas.finish()
}
