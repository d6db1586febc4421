//! PDF rendering for payment receipts and completion certificates.
//!
//! Documents are drawn with printpdf's builtin Helvetica fonts so no font
//! files need to ship with the server.

mod certificate;
mod receipt;

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};
use thiserror::Error;

pub use certificate::{render_certificate, CertificateData};
pub use receipt::{render_receipt, ReceiptData};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to load font: {0}")]
    Font(String),

    #[error("Failed to write PDF: {0}")]
    Write(String),
}

/// Format minor currency units as `<major>.<minor>`, e.g. `150000 -> "1500.00"`.
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Single-page drawing surface shared by both documents.
pub(crate) struct Canvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    width: f32,
}

impl Canvas {
    pub(crate) fn new(title: &str, width: f32, height: f32) -> Result<Self, RenderError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(width), Mm(height), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Font(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Font(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            width,
        })
    }

    pub(crate) fn text(&self, text: &str, size: f32, x: f32, y: f32) {
        self.layer.use_text(text, size, Mm(x), Mm(y), &self.regular);
    }

    pub(crate) fn bold(&self, text: &str, size: f32, x: f32, y: f32) {
        self.layer.use_text(text, size, Mm(x), Mm(y), &self.bold);
    }

    /// Horizontally centred text using an average Helvetica glyph width.
    pub(crate) fn centered(&self, text: &str, size: f32, y: f32, bold: bool) {
        let approx_width_mm = text.chars().count() as f32 * size * 0.5 * 0.3528;
        let x = ((self.width - approx_width_mm) / 2.0).max(5.0);
        if bold {
            self.bold(text, size, x, y);
        } else {
            self.text(text, size, x, y);
        }
    }

    pub(crate) fn line(&self, from: (f32, f32), to: (f32, f32), thickness: f32) {
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.2, 0.2, 0.2, None)));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(from.0), Mm(from.1)), false),
                (Point::new(Mm(to.0), Mm(to.1)), false),
            ],
            is_closed: false,
        });
    }

    pub(crate) fn rect(&self, x: f32, y: f32, w: f32, h: f32, thickness: f32) {
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.1, 0.2, 0.45, None)));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x), Mm(y)), false),
                (Point::new(Mm(x + w), Mm(y)), false),
                (Point::new(Mm(x + w), Mm(y + h)), false),
                (Point::new(Mm(x), Mm(y + h)), false),
            ],
            is_closed: true,
        });
    }

    pub(crate) fn finish(self) -> Result<Vec<u8>, RenderError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| RenderError::Write(e.to_string()))
    }
}
