use chrono::{DateTime, Utc};

use super::{format_amount, Canvas, RenderError};
use crate::config::SchoolSettings;
use crate::models::PaymentMethod;

/// Everything printed on a payment receipt.
#[derive(Debug, Clone)]
pub struct ReceiptData {
    pub school: SchoolSettings,
    pub receipt_number: String,
    pub paid_at: DateTime<Utc>,
    pub student_name: String,
    pub student_email: String,
    pub course_name: String,
    pub booking_id: i64,
    pub method: PaymentMethod,
    pub installment_number: Option<i32>,
    pub amount: i64,
    pub total_amount: i64,
    pub balance: i64,
}

const A4_WIDTH: f32 = 210.0;
const A4_HEIGHT: f32 = 297.0;

/// A4 portrait receipt.
pub fn render_receipt(data: &ReceiptData) -> Result<Vec<u8>, RenderError> {
    let canvas = Canvas::new(
        &format!("Receipt {}", data.receipt_number),
        A4_WIDTH,
        A4_HEIGHT,
    )?;

    // Header
    canvas.bold(&data.school.name, 20.0, 20.0, 270.0);
    let mut y = 262.0;
    for line in [&data.school.address, &data.school.phone, &data.school.email] {
        if !line.is_empty() {
            canvas.text(line, 10.0, 20.0, y);
            y -= 5.0;
        }
    }
    canvas.line((20.0, 245.0), (190.0, 245.0), 1.0);

    canvas.bold("PAYMENT RECEIPT", 16.0, 20.0, 232.0);
    canvas.text(&format!("Receipt No: {}", data.receipt_number), 11.0, 20.0, 222.0);
    canvas.text(
        &format!("Date: {}", data.paid_at.format("%d %b %Y %H:%M UTC")),
        11.0,
        120.0,
        222.0,
    );

    let installment = match data.installment_number {
        Some(0) => "Down payment".to_string(),
        Some(n) => format!("Installment #{}", n),
        None => "Full payment".to_string(),
    };

    let rows = [
        ("Student", data.student_name.clone()),
        ("Email", data.student_email.clone()),
        ("Course", data.course_name.clone()),
        ("Booking", format!("#{}", data.booking_id)),
        ("Payment method", data.method.to_string()),
        ("Payment for", installment),
        ("Course fee", format_amount(data.total_amount)),
    ];

    let mut y = 205.0;
    for (label, value) in rows {
        canvas.bold(label, 11.0, 20.0, y);
        canvas.text(&value, 11.0, 75.0, y);
        y -= 9.0;
    }

    canvas.line((20.0, y), (190.0, y), 0.75);
    y -= 12.0;
    canvas.bold("Amount paid", 14.0, 20.0, y);
    canvas.bold(&format_amount(data.amount), 14.0, 75.0, y);
    y -= 10.0;
    canvas.text("Balance remaining", 11.0, 20.0, y);
    canvas.text(&format_amount(data.balance), 11.0, 75.0, y);

    canvas.line((20.0, 30.0), (190.0, 30.0), 0.5);
    canvas.text(
        "This is a computer generated receipt and does not require a signature.",
        9.0,
        20.0,
        22.0,
    );

    canvas.finish()
}
