// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::classify::{Classification, Classifier, IssueType};
use crate::modules::common::Addr;
use crate::modules::document::builder::build_document;
use crate::modules::error::{code::ErrorCode, RustTicketResult};
use crate::modules::gmail::content::{Attachment, RawMessage};
use crate::modules::gmail::MailProvider;
use crate::modules::jira::attachments::{AttachmentPipeline, AttachmentPolicy};
use crate::modules::jira::TicketTracker;
use crate::modules::render::render_html;
use crate::modules::render::RenderFormat;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::state::StateStore;
use crate::raise_error;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use tracing::{debug, error, info, warn};

#[cfg(test)]
mod tests;

static LABEL_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").unwrap());

/// Policy knobs the processor needs, extracted from settings so tests can
/// construct them directly.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Empty set accepts every sender.
    pub allowed_senders: HashSet<String>,
    /// Overrides the classifier's client when the sender domain matches.
    pub domain_client_map: HashMap<String, String>,
    pub attachment_policy: AttachmentPolicy,
    pub preserve_html_render: bool,
    pub render_format: RenderFormat,
}

impl ProcessorConfig {
    pub fn from_settings() -> Self {
        Self {
            allowed_senders: SETTINGS.rustticket_allowed_senders.clone(),
            domain_client_map: SETTINGS.rustticket_domain_client_map.clone(),
            attachment_policy: AttachmentPolicy::from_settings(),
            preserve_html_render: SETTINGS.rustticket_preserve_html_render,
            render_format: SETTINGS.rustticket_html_render_format,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A ticket was created and the id recorded as processed.
    Created(String),
    /// The id was already processed or claimed by a concurrent invocation.
    AlreadyProcessed,
    /// The message fetch produced nothing to work with; claim released.
    NothingToProcess,
    /// The sender is not on the allow-list; claim released.
    SenderNotAllowed,
}

/// Drives the full pipeline for one message id: claim, normalize, classify,
/// build the document, create the ticket, reconcile attachments, record
/// completion. Collaborators are injected so every seam is substitutable.
pub struct MessageProcessor {
    mail: Arc<dyn MailProvider>,
    classifier: Arc<dyn Classifier>,
    tracker: Arc<dyn TicketTracker>,
    state: Arc<StateStore>,
    config: ProcessorConfig,
}

impl MessageProcessor {
    pub fn new(
        mail: Arc<dyn MailProvider>,
        classifier: Arc<dyn Classifier>,
        tracker: Arc<dyn TicketTracker>,
        state: Arc<StateStore>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            mail,
            classifier,
            tracker,
            state,
            config,
        }
    }

    /// Processes one message id at most once. Any failure after a successful
    /// claim releases the claim before the error propagates, keeping the id
    /// eligible for retry on the next notification covering its range.
    pub async fn process_message(&self, message_id: &str) -> RustTicketResult<ProcessOutcome> {
        if !self.state.claim(message_id).await? {
            info!("Message {} already processed", message_id);
            return Ok(ProcessOutcome::AlreadyProcessed);
        }
        match self.run_claimed(message_id).await {
            Ok(ProcessOutcome::Created(key)) => Ok(ProcessOutcome::Created(key)),
            Ok(outcome) => {
                self.release_claim(message_id).await;
                Ok(outcome)
            }
            Err(e) => {
                self.release_claim(message_id).await;
                Err(e)
            }
        }
    }

    async fn release_claim(&self, message_id: &str) {
        if let Err(e) = self.state.unclaim(message_id).await {
            error!("Failed to unclaim message {}: {:?}", message_id, e);
        }
    }

    async fn run_claimed(&self, message_id: &str) -> RustTicketResult<ProcessOutcome> {
        let msg = self.mail.fetch_message(message_id).await?;
        if msg.is_empty() {
            warn!("Message {} yielded no content", message_id);
            return Ok(ProcessOutcome::NothingToProcess);
        }

        debug!(
            "Message {} from '{}' dated '{}'",
            message_id, msg.from, msg.date
        );
        let sender = Addr::parse(&msg.from);
        let sender_addr = sender.bare_address();
        if !self.is_sender_allowed(&sender_addr, &msg.from) {
            return Ok(ProcessOutcome::SenderNotAllowed);
        }

        let (issue_type, client) = self.classify_client_and_issue(&msg, &sender).await;

        let html = if msg.body_html.is_empty() {
            msg.body_text.clone()
        } else {
            msg.body_html.clone()
        };
        let mut doc = build_document(&html, &msg.inline_map);

        let mut candidates: Vec<Attachment> = msg.attachments.clone();
        candidates.extend(msg.inline_parts.iter().cloned());

        if self.config.preserve_html_render {
            match render_html(&html, &msg.inline_parts, self.config.render_format) {
                Ok((data, filename)) => {
                    doc = doc.prepend_note(&format!(
                        "Full-fidelity email rendering attached: {}",
                        filename
                    ));
                    candidates.push(Attachment {
                        mime_type: self.config.render_format.mime_type().to_string(),
                        filename,
                        data,
                        is_inline: false,
                        content_id: None,
                    });
                }
                Err(e) => warn!("Failed to render message {}: {:?}", message_id, e),
            }
        }

        let labels = build_labels(&sanitize_message_id(&msg.message_id));
        let summary = if msg.subject.is_empty() {
            "(No Subject)".to_string()
        } else {
            msg.subject.clone()
        };

        let Some(ticket_key) = self
            .tracker
            .create_ticket(&summary, &doc, &client, issue_type, &labels)
            .await
        else {
            return Err(raise_error!(
                format!("Failed to create ticket for message {}", message_id),
                ErrorCode::JiraApiCallFailed
            ));
        };

        let pipeline =
            AttachmentPipeline::new(self.tracker.as_ref(), &self.config.attachment_policy);
        let (statuses, updated) = pipeline.process(&ticket_key, &candidates, &doc).await;
        for (filename, status) in &statuses {
            debug!("Attachment '{}' on {}: {}", filename, ticket_key, status);
        }
        if updated != doc {
            if let Err(e) = self.tracker.update_description(&ticket_key, &updated).await {
                warn!("Failed to update description of {}: {:?}", ticket_key, e);
            }
        }

        self.state.mark_processed(message_id).await?;
        Ok(ProcessOutcome::Created(ticket_key))
    }

    fn is_sender_allowed(&self, sender_addr: &str, sender_full: &str) -> bool {
        if !self.config.allowed_senders.is_empty()
            && !self.config.allowed_senders.contains(sender_addr)
        {
            info!("Sender {} not allowed (addr={})", sender_full, sender_addr);
            return false;
        }
        true
    }

    async fn classify_client_and_issue(
        &self,
        msg: &RawMessage,
        sender: &Addr,
    ) -> (IssueType, String) {
        let classification = self
            .classifier
            .classify(&msg.subject, &msg.body_text)
            .await
            .unwrap_or_else(Classification::default);
        let mut client = classification.client;
        let domain = sender.domain();
        if let Some(mapped) = self.config.domain_client_map.get(&domain) {
            client = mapped.clone();
        }
        (classification.issue_type, client)
    }
}

/// Reduces a Message-ID header to label-safe characters: angle brackets
/// dropped, any other run replaced by a single dash.
pub fn sanitize_message_id(raw: &str) -> String {
    let stripped = raw.replace(['<', '>'], "");
    LABEL_CHARS_RE
        .replace_all(&stripped, "-")
        .trim_matches('-')
        .to_string()
}

pub fn build_labels(sanitized_message_id: &str) -> Vec<String> {
    let mut labels = vec!["Billable".to_string()];
    if !sanitized_message_id.is_empty() {
        labels.push(format!("email_msgid_{}", sanitized_message_id));
    }
    labels
}
