use crate::modules::classify::{Classification, Classifier, IssueType};
use crate::modules::database::manager::DatabaseManager;
use crate::modules::document::{AdfDocument, AdfNode};
use crate::modules::error::RustTicketResult;
use crate::modules::gmail::content::{Attachment, RawMessage};
use crate::modules::gmail::{MailProvider, WatchRegistration};
use crate::modules::jira::attachments::AttachmentPolicy;
use crate::modules::jira::{TicketTracker, UploadOutcome};
use crate::modules::processor::{
    build_labels, sanitize_message_id, MessageProcessor, ProcessOutcome, ProcessorConfig,
};
use crate::modules::render::RenderFormat;
use crate::modules::state::StateStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct FakeMail {
    message: RawMessage,
}

#[async_trait]
impl MailProvider for FakeMail {
    async fn list_added_message_ids(&self, _: u64, _: u64) -> RustTicketResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn fetch_message(&self, _: &str) -> RustTicketResult<RawMessage> {
        Ok(self.message.clone())
    }

    async fn register_watch(&self, _: &str, _: &str) -> RustTicketResult<WatchRegistration> {
        Ok(WatchRegistration {
            history_id: 0,
            expiration: 0,
        })
    }
}

struct FakeClassifier {
    result: Option<Classification>,
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, _: &str, _: &str) -> Option<Classification> {
        self.result.clone()
    }
}

#[derive(Debug, Clone)]
struct CreatedTicket {
    summary: String,
    description: AdfDocument,
    client: String,
    issue_type: IssueType,
    labels: Vec<String>,
}

#[derive(Default)]
struct FakeTracker {
    fail_create: AtomicBool,
    created: Mutex<Vec<CreatedTicket>>,
    uploaded: Mutex<Vec<String>>,
    updates: Mutex<Vec<AdfDocument>>,
}

impl FakeTracker {
    fn created(&self) -> Vec<CreatedTicket> {
        self.created.lock().unwrap().clone()
    }

    fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    fn updates(&self) -> Vec<AdfDocument> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketTracker for FakeTracker {
    async fn create_ticket(
        &self,
        summary: &str,
        description: &AdfDocument,
        client: &str,
        issue_type: IssueType,
        labels: &[String],
    ) -> Option<String> {
        if self.fail_create.load(Ordering::SeqCst) {
            return None;
        }
        let mut created = self.created.lock().unwrap();
        created.push(CreatedTicket {
            summary: summary.to_string(),
            description: description.clone(),
            client: client.to_string(),
            issue_type,
            labels: labels.to_vec(),
        });
        Some(format!("JIRA-{}", created.len()))
    }

    async fn upload_attachment(
        &self,
        _ticket_key: &str,
        filename: &str,
        _data: Vec<u8>,
        _mime_type: &str,
    ) -> UploadOutcome {
        self.uploaded.lock().unwrap().push(filename.to_string());
        UploadOutcome::Uploaded
    }

    async fn update_description(
        &self,
        _ticket_key: &str,
        description: &AdfDocument,
    ) -> RustTicketResult<()> {
        self.updates.lock().unwrap().push(description.clone());
        Ok(())
    }
}

fn message() -> RawMessage {
    RawMessage {
        from: "Marisa@oetraining.com".to_string(),
        subject: "Sub".to_string(),
        message_id: "id1".to_string(),
        body_text: "Body".to_string(),
        body_html: "<p>Body</p>".to_string(),
        ..Default::default()
    }
}

fn config() -> ProcessorConfig {
    ProcessorConfig {
        allowed_senders: HashSet::new(),
        domain_client_map: HashMap::new(),
        attachment_policy: AttachmentPolicy {
            enabled: true,
            max_bytes: 10 * 1024 * 1024,
            allowed_mime: vec!["application/pdf".to_string(), "image/png".to_string()],
            attach_inline_images: true,
        },
        preserve_html_render: false,
        render_format: RenderFormat::Pdf,
    }
}

fn processor(
    msg: RawMessage,
    config: ProcessorConfig,
) -> (MessageProcessor, Arc<FakeTracker>, Arc<StateStore>) {
    let tracker = Arc::new(FakeTracker::default());
    let state = Arc::new(StateStore::new(DatabaseManager::open_in_memory().unwrap()));
    let processor = MessageProcessor::new(
        Arc::new(FakeMail { message: msg }),
        Arc::new(FakeClassifier {
            result: Some(Classification::default()),
        }),
        tracker.clone(),
        state.clone(),
        config,
    );
    (processor, tracker, state)
}

fn paragraph_texts(doc: &AdfDocument) -> Vec<String> {
    doc.content
        .iter()
        .filter_map(|node| match node {
            AdfNode::Paragraph { content } => content.first().and_then(|n| match n {
                AdfNode::Text { text, .. } => Some(text.clone()),
                _ => None,
            }),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn creates_one_ticket_and_marks_the_message_processed() {
    let mut msg = message();
    msg.attachments = vec![Attachment {
        filename: "file1.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        data: b"1".to_vec(),
        is_inline: false,
        content_id: None,
    }];
    let (processor, tracker, state) = processor(msg, config());

    let outcome = processor.process_message("A1").await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Created("JIRA-1".to_string()));
    assert!(state.is_processed("A1").await.unwrap());
    assert_eq!(tracker.uploaded(), vec!["file1.pdf"]);

    let updates = tracker.updates();
    assert_eq!(updates.len(), 1);
    let texts = paragraph_texts(&updates[0]);
    assert!(texts.contains(&"Attachments".to_string()));
    assert!(texts.contains(&"file1.pdf".to_string()));
}

#[tokio::test]
async fn a_second_run_is_deduplicated() {
    let (processor, tracker, _) = processor(message(), config());
    let first = processor.process_message("A1").await.unwrap();
    let second = processor.process_message("A1").await.unwrap();
    assert!(matches!(first, ProcessOutcome::Created(_)));
    assert_eq!(second, ProcessOutcome::AlreadyProcessed);
    assert_eq!(tracker.created().len(), 1);
}

#[tokio::test]
async fn concurrent_runs_create_exactly_one_ticket() {
    let (processor, tracker, _) = processor(message(), config());
    let processor = Arc::new(processor);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let processor = processor.clone();
        handles.push(tokio::spawn(async move {
            processor.process_message("A1").await.unwrap()
        }));
    }
    let mut created = 0;
    for handle in handles {
        if matches!(handle.await.unwrap(), ProcessOutcome::Created(_)) {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(tracker.created().len(), 1);
}

#[tokio::test]
async fn disallowed_senders_are_filtered_and_the_claim_released() {
    let mut cfg = config();
    cfg.allowed_senders.insert("other@example.com".to_string());
    let (processor, tracker, state) = processor(message(), cfg);

    let outcome = processor.process_message("A1").await.unwrap();
    assert_eq!(outcome, ProcessOutcome::SenderNotAllowed);
    assert!(tracker.created().is_empty());
    assert!(!state.is_processed("A1").await.unwrap());
    // the claim must be gone so a later policy change can retry the id
    assert!(state.claim("A1").await.unwrap());
}

#[tokio::test]
async fn empty_messages_are_nothing_to_process() {
    let (processor, tracker, state) = processor(RawMessage::default(), config());
    let outcome = processor.process_message("A1").await.unwrap();
    assert_eq!(outcome, ProcessOutcome::NothingToProcess);
    assert!(tracker.created().is_empty());
    assert!(state.claim("A1").await.unwrap());
}

#[tokio::test]
async fn failed_ticket_creation_releases_the_claim_for_retry() {
    let (processor, tracker, state) = processor(message(), config());
    tracker.fail_create.store(true, Ordering::SeqCst);

    let error = processor.process_message("A1").await.unwrap_err();
    assert!(error.to_string().contains("A1"));
    assert!(!state.is_processed("A1").await.unwrap());

    tracker.fail_create.store(false, Ordering::SeqCst);
    let outcome = processor.process_message("A1").await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::Created(_)));
    assert!(state.is_processed("A1").await.unwrap());
}

#[tokio::test]
async fn the_domain_map_overrides_the_classifier_client() {
    let mut cfg = config();
    cfg.domain_client_map
        .insert("oetraining.com".to_string(), "OETraining".to_string());
    let (processor, tracker, _) = processor(message(), cfg);
    processor.process_message("A1").await.unwrap();
    assert_eq!(tracker.created()[0].client, "OETraining");
    assert_eq!(tracker.created()[0].issue_type, IssueType::Task);
}

#[tokio::test]
async fn tickets_carry_billable_and_message_id_labels() {
    let mut msg = message();
    msg.message_id = "id.1@mail".to_string();
    let (processor, tracker, _) = processor(msg, config());
    processor.process_message("A1").await.unwrap();
    let labels = tracker.created()[0].labels.clone();
    assert!(labels.contains(&"Billable".to_string()));
    assert!(labels.contains(&"email_msgid_id-1-mail".to_string()));
}

#[tokio::test]
async fn missing_subjects_fall_back_to_a_placeholder() {
    let mut msg = message();
    msg.subject = String::new();
    let (processor, tracker, _) = processor(msg, config());
    processor.process_message("A1").await.unwrap();
    assert_eq!(tracker.created()[0].summary, "(No Subject)");
}

#[tokio::test]
async fn render_artifact_is_uploaded_and_the_note_leads_the_description() {
    let mut cfg = config();
    cfg.preserve_html_render = true;
    let (processor, tracker, _) = processor(message(), cfg);
    processor.process_message("A1").await.unwrap();

    assert_eq!(tracker.uploaded(), vec!["email-render.pdf"]);
    let created = tracker.created();
    let first = paragraph_texts(&created[0].description);
    assert_eq!(
        first[0],
        "Full-fidelity email rendering attached: email-render.pdf"
    );
}

#[tokio::test]
async fn no_description_update_when_nothing_was_uploaded() {
    let (processor, tracker, _) = processor(message(), config());
    processor.process_message("A1").await.unwrap();
    assert!(tracker.uploaded().is_empty());
    assert!(tracker.updates().is_empty());
}

#[test]
fn message_ids_sanitize_to_label_safe_characters() {
    assert_eq!(sanitize_message_id("<id.1@mail>"), "id-1-mail");
    assert_eq!(sanitize_message_id("<abc>"), "abc");
    assert_eq!(sanitize_message_id(""), "");
    assert_eq!(sanitize_message_id("<!!!>"), "");
}

#[test]
fn labels_skip_the_message_id_when_empty() {
    assert_eq!(build_labels(""), vec!["Billable".to_string()]);
    assert_eq!(
        build_labels("abc"),
        vec!["Billable".to_string(), "email_msgid_abc".to_string()]
    );
}
