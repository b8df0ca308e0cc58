use crate::base64_encode;
use crate::modules::classify::{Classification, Classifier, IssueType};
use crate::modules::database::manager::DatabaseManager;
use crate::modules::document::AdfDocument;
use crate::modules::error::{code::ErrorCode, RustTicketResult};
use crate::modules::gmail::content::RawMessage;
use crate::modules::gmail::{MailProvider, WatchRegistration};
use crate::modules::jira::attachments::AttachmentPolicy;
use crate::modules::jira::{TicketTracker, UploadOutcome};
use crate::modules::processor::{MessageProcessor, ProcessorConfig};
use crate::modules::render::RenderFormat;
use crate::modules::state::StateStore;
use crate::modules::sync::{NotificationStatus, SyncController};
use crate::raise_error;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct FakeMail {
    ids: Vec<String>,
    fail_listing: bool,
    list_calls: AtomicUsize,
}

impl FakeMail {
    fn with_ids(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            fail_listing: false,
            list_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MailProvider for FakeMail {
    async fn list_added_message_ids(&self, _: u64, _: u64) -> RustTicketResult<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(raise_error!(
                "history listing unavailable".to_string(),
                ErrorCode::GmailApiCallFailed
            ));
        }
        Ok(self.ids.clone())
    }

    async fn fetch_message(&self, message_id: &str) -> RustTicketResult<RawMessage> {
        Ok(RawMessage {
            from: "sender@example.com".to_string(),
            // The subject carries the id so the fake tracker can fail
            // selectively per message.
            subject: message_id.to_string(),
            body_text: "Body".to_string(),
            body_html: "<p>Body</p>".to_string(),
            ..Default::default()
        })
    }

    async fn register_watch(&self, _: &str, _: &str) -> RustTicketResult<WatchRegistration> {
        Ok(WatchRegistration {
            history_id: 0,
            expiration: 0,
        })
    }
}

struct FakeClassifier;

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, _: &str, _: &str) -> Option<Classification> {
        Some(Classification::default())
    }
}

#[derive(Default)]
struct FakeTracker {
    failing_summaries: Mutex<HashSet<String>>,
    created: Mutex<Vec<String>>,
}

impl FakeTracker {
    fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketTracker for FakeTracker {
    async fn create_ticket(
        &self,
        summary: &str,
        _description: &AdfDocument,
        _client: &str,
        _issue_type: IssueType,
        _labels: &[String],
    ) -> Option<String> {
        if self.failing_summaries.lock().unwrap().contains(summary) {
            return None;
        }
        let mut created = self.created.lock().unwrap();
        created.push(summary.to_string());
        Some(format!("JIRA-{}", created.len()))
    }

    async fn upload_attachment(&self, _: &str, _: &str, _: Vec<u8>, _: &str) -> UploadOutcome {
        UploadOutcome::Uploaded
    }

    async fn update_description(&self, _: &str, _: &AdfDocument) -> RustTicketResult<()> {
        Ok(())
    }
}

fn config() -> ProcessorConfig {
    ProcessorConfig {
        allowed_senders: HashSet::new(),
        domain_client_map: HashMap::new(),
        attachment_policy: AttachmentPolicy {
            enabled: true,
            max_bytes: 10 * 1024 * 1024,
            allowed_mime: Vec::new(),
            attach_inline_images: true,
        },
        preserve_html_render: false,
        render_format: RenderFormat::Pdf,
    }
}

fn controller(
    mail: FakeMail,
) -> (
    SyncController,
    Arc<FakeMail>,
    Arc<FakeTracker>,
    Arc<StateStore>,
) {
    let mail = Arc::new(mail);
    let tracker = Arc::new(FakeTracker::default());
    let state = Arc::new(StateStore::new(DatabaseManager::open_in_memory().unwrap()));
    let processor = Arc::new(MessageProcessor::new(
        mail.clone(),
        Arc::new(FakeClassifier),
        tracker.clone(),
        state.clone(),
        config(),
    ));
    (
        SyncController::new(mail.clone(), processor, state.clone()),
        mail,
        tracker,
        state,
    )
}

fn envelope(history_id: serde_json::Value) -> serde_json::Value {
    let payload = json!({ "historyId": history_id }).to_string();
    json!({ "message": { "data": base64_encode!(payload.as_bytes()) } })
}

#[tokio::test]
async fn a_fresh_notification_processes_and_advances_the_watermark() {
    let (controller, _, tracker, state) = controller(FakeMail::with_ids(&["A1"]));
    let status = controller.on_notification(envelope(json!(12345))).await;
    assert_eq!(status, NotificationStatus::NoContent);
    assert_eq!(tracker.created(), vec!["A1"]);
    assert_eq!(state.watermark().await.unwrap(), 12345);
    assert!(state.is_processed("A1").await.unwrap());
}

#[tokio::test]
async fn string_history_ids_are_accepted() {
    let (controller, _, tracker, state) = controller(FakeMail::with_ids(&["A1"]));
    controller.on_notification(envelope(json!("12345"))).await;
    assert_eq!(tracker.created().len(), 1);
    assert_eq!(state.watermark().await.unwrap(), 12345);
}

#[tokio::test]
async fn stale_replays_skip_enumeration_entirely() {
    let (controller, mail, tracker, state) = controller(FakeMail::with_ids(&["A1"]));
    state.set_watermark(12345).await.unwrap();
    let status = controller.on_notification(envelope(json!(12345))).await;
    assert_eq!(status, NotificationStatus::NoContent);
    assert_eq!(mail.list_calls.load(Ordering::SeqCst), 0);
    assert!(tracker.created().is_empty());
}

#[tokio::test]
async fn malformed_envelopes_are_rejected() {
    let (controller, mail, _, _) = controller(FakeMail::with_ids(&[]));
    let status = controller.on_notification(json!({ "nope": 1 })).await;
    assert_eq!(status, NotificationStatus::BadRequest);

    let status = controller
        .on_notification(json!({ "message": { "data": "not-base64!!!" } }))
        .await;
    assert_eq!(status, NotificationStatus::BadRequest);
    assert_eq!(mail.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unusable_history_ids_are_acknowledged_no_ops() {
    let (controller, mail, _, _) = controller(FakeMail::with_ids(&["A1"]));

    // data present but payload carries no historyId
    let status = controller
        .on_notification(json!({ "message": {} }))
        .await;
    assert_eq!(status, NotificationStatus::NoContent);

    let status = controller.on_notification(envelope(json!("abc"))).await;
    assert_eq!(status, NotificationStatus::NoContent);
    assert_eq!(mail.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn a_partial_batch_failure_keeps_the_watermark_and_releases_the_claim() {
    let (controller, _, tracker, state) = controller(FakeMail::with_ids(&["A1", "A2"]));
    tracker
        .failing_summaries
        .lock()
        .unwrap()
        .insert("A2".to_string());

    controller.on_notification(envelope(json!(12345))).await;
    assert_eq!(tracker.created(), vec!["A1"]);
    assert_eq!(state.watermark().await.unwrap(), 0);
    assert!(state.is_processed("A1").await.unwrap());
    assert!(!state.is_processed("A2").await.unwrap());

    // The tracker recovers; the replayed notification retries only A2.
    tracker.failing_summaries.lock().unwrap().clear();
    controller.on_notification(envelope(json!(12345))).await;
    assert_eq!(tracker.created(), vec!["A1", "A2"]);
    assert_eq!(state.watermark().await.unwrap(), 12345);
}

#[tokio::test]
async fn an_enumeration_failure_aborts_the_whole_batch() {
    let mut mail = FakeMail::with_ids(&["A1"]);
    mail.fail_listing = true;
    let (controller, _, tracker, state) = controller(mail);

    let status = controller.on_notification(envelope(json!(12345))).await;
    assert_eq!(status, NotificationStatus::NoContent);
    assert!(tracker.created().is_empty());
    assert_eq!(state.watermark().await.unwrap(), 0);
}
