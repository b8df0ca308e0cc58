// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryList {
    #[serde(default)]
    pub history: Vec<History>,
    #[serde(rename = "historyId")]
    #[serde(default)]
    pub history_id: String,
    #[serde(rename = "nextPageToken")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct History {
    pub id: String,
    #[serde(rename = "messagesAdded")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages_added: Vec<MessageObject>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MessageObject {
    pub message: MessageIndex,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageIndex {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartBody {
    Attachment {
        #[serde(rename = "attachmentId")]
        attachment_id: String,
        #[serde(default)]
        size: u32,
    },
    Body {
        data: String,
        #[serde(default)]
        size: u32,
    },
    Empty {
        #[serde(default)]
        size: u32,
    },
}

impl Default for PartBody {
    fn default() -> Self {
        PartBody::Empty { size: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessagePart {
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub filename: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,
    #[serde(rename = "mimeType")]
    #[serde(default)]
    pub mime_type: String,
    #[serde(rename = "partId")]
    #[serde(default)]
    pub part_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FullMessage {
    #[serde(default, rename = "historyId")]
    pub history_id: String,
    pub id: String,
    #[serde(rename = "internalDate")]
    #[serde(default)]
    pub internal_date: String,
    #[serde(default)]
    pub payload: MessagePart,
    #[serde(rename = "sizeEstimate")]
    #[serde(default)]
    pub size_estimate: i64,
    #[serde(default)]
    pub snippet: String,
    #[serde(rename = "threadId")]
    #[serde(default)]
    pub thread_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WatchResponse {
    #[serde(rename = "historyId")]
    pub history_id: String,
    #[serde(default)]
    pub expiration: String,
}
