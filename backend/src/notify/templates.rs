//! Email templates.
//!
//! Every template returns a complete [`OutgoingEmail`] with plain-text and HTML
//! bodies. Text that came from users is escaped before it goes into HTML.

use super::OutgoingEmail;
use crate::config::SchoolSettings;
use crate::models::{Booking, Certificate, Inquiry, OtpPurpose, Payment, User};
use crate::render::{format_amount, PDF_CONTENT_TYPE};

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn wrap_html(school: &SchoolSettings, heading: &str, inner: &str) -> String {
    format!(
        "<html><body style=\"font-family: Arial, sans-serif; color: #222;\">\
         <h2>{heading}</h2>{inner}\
         <hr/><p style=\"font-size: 12px; color: #666;\">{school}</p>\
         </body></html>",
        heading = escape_html(heading),
        inner = inner,
        school = escape_html(&school.name),
    )
}

pub fn otp_email(
    school: &SchoolSettings,
    name: &str,
    email: &str,
    code: &str,
    purpose: OtpPurpose,
    ttl_minutes: i64,
) -> OutgoingEmail {
    let (subject, action) = match purpose {
        OtpPurpose::Verification => (
            format!("{}: verify your email", school.name),
            "verify your email address",
        ),
        OtpPurpose::PasswordReset => (
            format!("{}: password reset code", school.name),
            "reset your password",
        ),
    };

    let text = format!(
        "Hello {name},\n\nUse the code {code} to {action}. \
         The code expires in {ttl_minutes} minutes.\n\n{school}",
        school = school.name,
    );
    let html = wrap_html(
        school,
        "Your one-time code",
        &format!(
            "<p>Hello {name},</p><p>Use the code below to {action}.</p>\
             <p style=\"font-size: 28px; letter-spacing: 6px;\"><strong>{code}</strong></p>\
             <p>The code expires in {ttl_minutes} minutes.</p>",
            name = escape_html(name),
            code = escape_html(code),
        ),
    );

    OutgoingEmail::new(email, subject)
        .to_name(name)
        .bodies(text, html)
}

pub fn booking_confirmation_email(
    school: &SchoolSettings,
    student: &User,
    booking: &Booking,
) -> OutgoingEmail {
    let amount = format_amount(booking.total_amount);
    let start = booking.start_date.format("%d %b %Y");
    let text = format!(
        "Hello {name},\n\nYour booking #{id} for {course} has been received.\n\
         Start date: {start}\nPreferred slot: {slot}\nPayment plan: {plan}\n\
         Course fee: {amount}\nStatus: {status}\n\n{school}",
        name = student.name,
        id = booking.id,
        course = booking.course_name,
        slot = booking.preferred_slot,
        plan = booking.payment_plan,
        status = booking.status,
        school = school.name,
    );
    let html = wrap_html(
        school,
        "Booking received",
        &format!(
            "<p>Hello {name},</p><p>Your booking <strong>#{id}</strong> for \
             <strong>{course}</strong> has been received.</p>\
             <table>\
             <tr><td>Start date</td><td>{start}</td></tr>\
             <tr><td>Preferred slot</td><td>{slot}</td></tr>\
             <tr><td>Payment plan</td><td>{plan}</td></tr>\
             <tr><td>Course fee</td><td>{amount}</td></tr>\
             <tr><td>Status</td><td>{status}</td></tr>\
             </table>",
            name = escape_html(&student.name),
            id = booking.id,
            course = escape_html(&booking.course_name),
            slot = escape_html(&booking.preferred_slot),
            plan = booking.payment_plan,
            status = booking.status,
        ),
    );

    OutgoingEmail::new(&student.email, format!("Booking #{} received", booking.id))
        .to_name(&student.name)
        .bodies(text, html)
}

pub fn certificate_email(
    school: &SchoolSettings,
    student_email: &str,
    certificate: &Certificate,
    pdf: Vec<u8>,
) -> OutgoingEmail {
    let number = certificate.certificate_number.clone().unwrap_or_default();
    let hash = certificate.verification_hash.clone().unwrap_or_default();
    let text = format!(
        "Congratulations {name}!\n\nYou have completed {course}. Your certificate \
         {number} is attached.\nVerification code: {hash}\n\n{school}",
        name = certificate.student_name,
        course = certificate.course_name,
        school = school.name,
    );
    let html = wrap_html(
        school,
        "Congratulations!",
        &format!(
            "<p>Dear {name},</p><p>You have successfully completed \
             <strong>{course}</strong>. Your certificate <strong>{number}</strong> \
             is attached to this email.</p>\
             <p style=\"font-size: 11px;\">Verification code: {hash}</p>",
            name = escape_html(&certificate.student_name),
            course = escape_html(&certificate.course_name),
            number = escape_html(&number),
            hash = escape_html(&hash),
        ),
    );

    OutgoingEmail::new(student_email, format!("Your certificate {}", number))
        .to_name(&certificate.student_name)
        .bodies(text, html)
        .attach(format!("{}.pdf", number), PDF_CONTENT_TYPE, pdf)
}

pub fn inquiry_resolution_email(school: &SchoolSettings, inquiry: &Inquiry) -> OutgoingEmail {
    let response = inquiry
        .response
        .clone()
        .unwrap_or_else(|| "Your inquiry has been resolved.".to_string());
    let text = format!(
        "Hello {name},\n\nThank you for contacting us. Regarding your message:\n\n\
         \"{message}\"\n\nOur response:\n{response}\n\n{school}",
        name = inquiry.name,
        message = inquiry.message,
        school = school.name,
    );
    let html = wrap_html(
        school,
        "Your inquiry has been resolved",
        &format!(
            "<p>Hello {name},</p><p>Thank you for contacting us. Regarding your message:</p>\
             <blockquote>{message}</blockquote><p><strong>Our response:</strong></p>\
             <p>{response}</p>",
            name = escape_html(&inquiry.name),
            message = escape_html(&inquiry.message),
            response = escape_html(&response),
        ),
    );

    OutgoingEmail::new(&inquiry.email, format!("Re: your inquiry #{}", inquiry.id))
        .to_name(&inquiry.name)
        .bodies(text, html)
}

pub fn installment_receipt_email(
    school: &SchoolSettings,
    student: &User,
    payment: &Payment,
    balance: i64,
    pdf: Vec<u8>,
) -> OutgoingEmail {
    let what = match payment.installment_number {
        Some(0) => "down payment".to_string(),
        Some(n) => format!("installment #{}", n),
        None => "payment".to_string(),
    };
    let amount = format_amount(payment.amount);
    let balance = format_amount(balance);
    let text = format!(
        "Hello {name},\n\nWe received your {what} of {amount} for booking #{booking}.\n\
         Receipt: {receipt}\nBalance remaining: {balance}\n\n{school}",
        name = student.name,
        booking = payment.booking_id,
        receipt = payment.receipt_number,
        school = school.name,
    );
    let html = wrap_html(
        school,
        "Payment received",
        &format!(
            "<p>Hello {name},</p><p>We received your {what} of <strong>{amount}</strong> \
             for booking #{booking}.</p><p>Receipt: {receipt}<br/>Balance remaining: {balance}</p>",
            name = escape_html(&student.name),
            booking = payment.booking_id,
            receipt = escape_html(&payment.receipt_number),
        ),
    );

    OutgoingEmail::new(&student.email, format!("Receipt {}", payment.receipt_number))
        .to_name(&student.name)
        .bodies(text, html)
        .attach(
            format!("{}.pdf", payment.receipt_number),
            PDF_CONTENT_TYPE,
            pdf,
        )
}
