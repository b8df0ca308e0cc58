// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::document::{AdfDocument, AdfNode};
use crate::modules::gmail::content::Attachment;
use crate::modules::jira::{TicketTracker, UploadOutcome};
use crate::modules::settings::cli::SETTINGS;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPolicy {
    pub enabled: bool,
    pub max_bytes: u64,
    /// Empty list accepts every MIME type.
    pub allowed_mime: Vec<String>,
    pub attach_inline_images: bool,
}

impl AttachmentPolicy {
    pub fn from_settings() -> Self {
        Self {
            enabled: SETTINGS.rustticket_attachment_upload_enabled,
            max_bytes: SETTINGS.rustticket_max_attachment_bytes,
            allowed_mime: SETTINGS.rustticket_allowed_attachment_mime.clone(),
            attach_inline_images: SETTINGS.rustticket_attach_inline_images,
        }
    }
}

/// Per-file outcome of the attachment pipeline. Policy rejections are
/// recorded, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentStatus {
    Uploaded,
    SkippedInline,
    Oversize,
    Disallowed,
    /// Transport failure talking to the tracker.
    Error,
    /// The tracker refused the upload with this HTTP status.
    Failed(u16),
}

impl fmt::Display for AttachmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentStatus::Uploaded => write!(f, "uploaded"),
            AttachmentStatus::SkippedInline => write!(f, "skipped-inline"),
            AttachmentStatus::Oversize => write!(f, "oversize"),
            AttachmentStatus::Disallowed => write!(f, "disallowed"),
            AttachmentStatus::Error => write!(f, "error"),
            AttachmentStatus::Failed(code) => write!(f, "failed-{}", code),
        }
    }
}

pub struct AttachmentPipeline<'a> {
    tracker: &'a dyn TicketTracker,
    policy: &'a AttachmentPolicy,
}

impl<'a> AttachmentPipeline<'a> {
    pub fn new(tracker: &'a dyn TicketTracker, policy: &'a AttachmentPolicy) -> Self {
        Self { tracker, policy }
    }

    /// Uploads each candidate that passes the inline/size/MIME checks (in
    /// that order) and reconciles the outcomes into the document. One failed
    /// upload never aborts the remaining candidates. When nothing was
    /// uploaded the returned document equals the input, so callers can skip
    /// the description update.
    pub async fn process(
        &self,
        ticket_key: &str,
        attachments: &[Attachment],
        doc: &AdfDocument,
    ) -> (Vec<(String, AttachmentStatus)>, AdfDocument) {
        if !self.policy.enabled {
            return (Vec::new(), doc.clone());
        }
        let mut statuses = Vec::new();
        for attachment in attachments {
            let status = self.upload_one(ticket_key, attachment).await;
            statuses.push((attachment.filename.clone(), status));
        }
        let reconciled = reconcile(doc, &statuses);
        (statuses, reconciled)
    }

    async fn upload_one(&self, ticket_key: &str, attachment: &Attachment) -> AttachmentStatus {
        if attachment.is_inline && !self.policy.attach_inline_images {
            return AttachmentStatus::SkippedInline;
        }
        if attachment.data.len() as u64 > self.policy.max_bytes {
            warn!(
                "Skipping oversize attachment '{}' ({} bytes)",
                attachment.filename,
                attachment.data.len()
            );
            return AttachmentStatus::Oversize;
        }
        if !self.policy.allowed_mime.is_empty()
            && !self.policy.allowed_mime.contains(&attachment.mime_type)
        {
            warn!(
                "Skipping attachment '{}' with disallowed type {}",
                attachment.filename, attachment.mime_type
            );
            return AttachmentStatus::Disallowed;
        }
        match self
            .tracker
            .upload_attachment(
                ticket_key,
                &attachment.filename,
                attachment.data.clone(),
                &attachment.mime_type,
            )
            .await
        {
            UploadOutcome::Uploaded => AttachmentStatus::Uploaded,
            UploadOutcome::Rejected(code) => AttachmentStatus::Failed(code),
            UploadOutcome::TransportError => AttachmentStatus::Error,
        }
    }
}

/// Appends an "Attachments" header plus one line per uploaded file, in
/// attempt order. With zero uploads the input document is returned as-is.
pub fn reconcile(
    doc: &AdfDocument,
    statuses: &[(String, AttachmentStatus)],
) -> AdfDocument {
    let uploaded: Vec<&str> = statuses
        .iter()
        .filter(|(_, status)| *status == AttachmentStatus::Uploaded)
        .map(|(filename, _)| filename.as_str())
        .collect();
    if uploaded.is_empty() {
        return doc.clone();
    }
    let mut content = doc.content.clone();
    content.push(AdfNode::paragraph_text("Attachments"));
    for filename in uploaded {
        content.push(AdfNode::paragraph_text(filename));
    }
    AdfDocument::new(content)
}
