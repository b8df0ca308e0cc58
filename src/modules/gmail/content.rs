// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::base64_decode_url_safe;
use crate::modules::gmail::model::{Header, MessagePart, PartBody};
use ahash::AHashMap;
use scraper::Html;

/// A Gmail message normalized for the pipeline: headers of interest, both
/// body renditions, regular attachments, and the inline-image parts that the
/// HTML body references via `cid:` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMessage {
    /// Raw From header, display-name form included.
    pub from: String,
    pub subject: String,
    pub date: String,
    /// Message-ID header with angle brackets stripped.
    pub message_id: String,
    pub body_text: String,
    /// HTML body with `cid:` references rewritten to inline placeholders.
    pub body_html: String,
    pub attachments: Vec<Attachment>,
    pub inline_parts: Vec<Attachment>,
    /// content-id → filename, for resolving inline placeholders.
    pub inline_map: AHashMap<String, String>,
}

impl RawMessage {
    /// True when a fetch failure produced a message with nothing to process.
    pub fn is_empty(&self) -> bool {
        self.from.is_empty()
            && self.subject.is_empty()
            && self.body_text.is_empty()
            && self.body_html.is_empty()
            && self.attachments.is_empty()
            && self.inline_parts.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub is_inline: bool,
    pub content_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedHeaders {
    pub from: String,
    pub subject: String,
    pub date: String,
    pub message_id: String,
}

/// Returns the subset of headers the pipeline cares about, matched
/// case-insensitively.
pub fn extract_headers(headers: &[Header]) -> ExtractedHeaders {
    let mut extracted = ExtractedHeaders::default();
    for header in headers {
        match header.name.to_ascii_lowercase().as_str() {
            "from" => extracted.from = header.value.clone(),
            "subject" => extracted.subject = header.value.clone(),
            "date" => extracted.date = header.value.clone(),
            "message-id" => extracted.message_id = clean_angle_brackets(&header.value),
            _ => {}
        }
    }
    extracted
}

fn clean_angle_brackets(value: &str) -> String {
    value
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string()
}

/// Recursively extracts the plain-text rendition of a message: the first
/// non-empty result wins. HTML leaves are stripped to text.
pub fn extract_plain_text(part: &MessagePart) -> String {
    if part.mime_type.starts_with("multipart") {
        for child in &part.parts {
            let text = extract_plain_text(child);
            if !text.is_empty() {
                return text;
            }
        }
        return String::new();
    }
    let PartBody::Body { data, .. } = &part.body else {
        return String::new();
    };
    let decoded = decode_text(data);
    match part.mime_type.as_str() {
        "text/plain" => decoded.trim().to_string(),
        "text/html" => strip_html_to_text(&decoded),
        _ => String::new(),
    }
}

/// Returns the first HTML body found anywhere in the part tree, decoded.
/// Collected independently of the plain-text extraction so a message can
/// contribute both renditions.
pub fn extract_html(part: &MessagePart) -> Option<String> {
    if part.mime_type.starts_with("multipart") {
        return part.parts.iter().find_map(extract_html);
    }
    if part.mime_type != "text/html" {
        return None;
    }
    let PartBody::Body { data, .. } = &part.body else {
        return None;
    };
    let decoded = decode_text(data);
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

/// Decodes base64url part data to text. Decode errors yield an empty string
/// rather than propagating; invalid UTF-8 sequences are replaced.
fn decode_text(data: &str) -> String {
    match base64_decode_url_safe!(data) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

/// Strips markup from an HTML fragment, returning the text content with the
/// ends trimmed.
pub fn strip_html_to_text(html: &str) -> String {
    let parsed = Html::parse_document(html);
    let text: String = parsed.root_element().text().collect();
    text.trim().to_string()
}

/// Collects the leaf parts that represent attachments (non-empty filename).
pub fn attachment_parts(part: &MessagePart) -> Vec<&MessagePart> {
    let mut found = Vec::new();
    collect_attachment_parts(part, &mut found);
    found
}

fn collect_attachment_parts<'a>(part: &'a MessagePart, found: &mut Vec<&'a MessagePart>) {
    if !part.filename.is_empty() {
        found.push(part);
    }
    for child in &part.parts {
        collect_attachment_parts(child, found);
    }
}

/// Content-ID header of a part with the angle brackets stripped.
pub fn part_content_id(part: &MessagePart) -> Option<String> {
    part.headers.iter().find_map(|header| {
        if header.name.eq_ignore_ascii_case("content-id") {
            Some(clean_angle_brackets(&header.value))
        } else {
            None
        }
    })
}

pub fn part_is_inline_disposition(part: &MessagePart) -> bool {
    part.headers.iter().any(|header| {
        header.name.eq_ignore_ascii_case("content-disposition")
            && header.value.to_ascii_lowercase().starts_with("inline")
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineResolution {
    /// HTML body with every referenced `cid:` rewritten to a placeholder.
    pub html: String,
    /// Attachments left for regular upload.
    pub attachments: Vec<Attachment>,
    /// Parts pulled out of the regular list for inline resolution.
    pub inline_parts: Vec<Attachment>,
    pub inline_map: AHashMap<String, String>,
}

/// Splits attachments into inline parts and regular ones, substituting
/// placeholders for each `cid:` reference found in the HTML body. A part is
/// inline when the body references its content-id or its disposition says so.
pub fn resolve_inline(html: &str, attachments: Vec<Attachment>) -> InlineResolution {
    let mut html = html.to_string();
    let mut resolution = InlineResolution::default();
    for mut attachment in attachments {
        if let Some(cid) = attachment.content_id.clone() {
            let reference = format!("cid:{}", cid);
            if html.contains(&reference) {
                html = html.replace(&reference, &format!("__INLINE_IMAGE__[{}]__", cid));
                attachment.is_inline = true;
            }
        }
        if attachment.is_inline {
            if let Some(cid) = &attachment.content_id {
                resolution
                    .inline_map
                    .insert(cid.clone(), attachment.filename.clone());
            }
            resolution.inline_parts.push(attachment);
        } else {
            resolution.attachments.push(attachment);
        }
    }
    resolution.html = html;
    resolution
}
