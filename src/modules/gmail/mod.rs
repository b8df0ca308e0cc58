// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::RustTicketResult;
use crate::modules::gmail::content::RawMessage;
use async_trait::async_trait;

pub mod client;
pub mod content;
pub mod model;
pub mod watch;


/// Result of a watch registration against the mail provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchRegistration {
    pub history_id: u64,
    /// Expiration of the registration, epoch milliseconds.
    pub expiration: i64,
}

/// The mail provider contract consumed by the sync controller and the
/// message processor. Injected as a trait object so tests substitute fakes.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Enumerates ids of messages added after `start_history_id`, paging
    /// internally until exhausted. Any failure aborts the whole enumeration;
    /// callers must not advance their watermark on error.
    async fn list_added_message_ids(
        &self,
        start_history_id: u64,
        end_history_id: u64,
    ) -> RustTicketResult<Vec<String>>;

    /// Fetches and normalizes one message. Transport failures yield an empty
    /// `RawMessage` (logged), which downstream treats as nothing to process.
    async fn fetch_message(&self, message_id: &str) -> RustTicketResult<RawMessage>;

    /// Registers a push-notification watch routed to the given Pub/Sub topic.
    async fn register_watch(
        &self,
        project_id: &str,
        topic: &str,
    ) -> RustTicketResult<WatchRegistration>;
}
