// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::base64_decode;
use crate::modules::gmail::MailProvider;
use crate::modules::processor::MessageProcessor;
use crate::modules::state::StateStore;
use std::sync::Arc;
use tracing::{error, info, warn};

#[cfg(test)]
mod tests;

/// How the notification boundary answers the caller. The handler never
/// propagates pipeline errors: the trigger delivers at-least-once, so a
/// valid envelope is always acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    /// The envelope itself was malformed.
    BadRequest,
    /// Acknowledged; any retry happens through the next notification.
    NoContent,
}

/// Turns "something changed" notifications into per-message pipeline runs,
/// advancing the watermark only when a whole batch succeeded.
pub struct SyncController {
    mail: Arc<dyn MailProvider>,
    processor: Arc<MessageProcessor>,
    state: Arc<StateStore>,
}

impl SyncController {
    pub fn new(
        mail: Arc<dyn MailProvider>,
        processor: Arc<MessageProcessor>,
        state: Arc<StateStore>,
    ) -> Self {
        Self {
            mail,
            processor,
            state,
        }
    }

    pub async fn on_notification(&self, envelope: serde_json::Value) -> NotificationStatus {
        let Some(payload) = parse_envelope(&envelope) else {
            return NotificationStatus::BadRequest;
        };
        let Some(history_id) = extract_history_id(&payload) else {
            return NotificationStatus::NoContent;
        };

        let watermark = match self.state.watermark().await {
            Ok(watermark) => watermark,
            Err(e) => {
                error!("Failed to read watermark: {:?}", e);
                0
            }
        };
        if history_id <= watermark {
            info!("Received stale historyId {}", history_id);
            return NotificationStatus::NoContent;
        }

        self.handle_new_messages(watermark, history_id).await;
        NotificationStatus::NoContent
    }

    /// Attempts every id in the range. One failure never aborts the others,
    /// but any failure leaves the watermark untouched so the next
    /// notification reprocesses the same range; ids that already succeeded
    /// are dedup-skipped on that retry.
    async fn handle_new_messages(&self, last_history_id: u64, history_id: u64) {
        let message_ids = match self
            .mail
            .list_added_message_ids(last_history_id, history_id)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                error!(
                    "Failed to enumerate history {}-{}: {:?}; batch aborted",
                    last_history_id, history_id, e
                );
                return;
            }
        };

        let mut failed = false;
        for message_id in message_ids {
            if let Err(e) = self.processor.process_message(&message_id).await {
                failed = true;
                error!("Error processing message {}: {:?}", message_id, e);
            }
        }

        if failed {
            error!(
                "One or more messages failed to process; not updating history ID {}",
                history_id
            );
        } else if let Err(e) = self.state.set_watermark(history_id).await {
            error!("Failed to set watermark {}: {:?}", history_id, e);
        }
    }
}

/// Unwraps the Pub/Sub push envelope: `{"message": {"data": <base64 JSON>}}`.
/// A missing `message` or undecodable data is a malformed request; a message
/// without data decodes to an empty payload (a valid, unusable notification).
fn parse_envelope(envelope: &serde_json::Value) -> Option<serde_json::Value> {
    let message = envelope.get("message")?;
    let Some(data) = message.get("data").and_then(|d| d.as_str()) else {
        return Some(serde_json::json!({}));
    };
    let bytes = match base64_decode!(data) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to parse Pub/Sub message: {}", e);
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(payload) => Some(payload),
        Err(e) => {
            error!("Failed to parse Pub/Sub message: {}", e);
            None
        }
    }
}

/// The `historyId` arrives as a string or a number depending on the
/// publisher; both forms are accepted, anything else is a logged no-op.
fn extract_history_id(payload: &serde_json::Value) -> Option<u64> {
    let value = match payload.get("historyId") {
        Some(value) => value,
        None => {
            warn!("Missing historyId in Pub/Sub message");
            return None;
        }
    };
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!("Non-numeric historyId: {}", value);
    }
    parsed
}
