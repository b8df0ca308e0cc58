// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::{code::ErrorCode, RustTicketResult};
use crate::modules::gmail::content::{
    attachment_parts, extract_headers, extract_html, extract_plain_text, part_content_id,
    part_is_inline_disposition, resolve_inline, Attachment, RawMessage,
};
use crate::modules::gmail::model::{FullMessage, HistoryList, PartBody, WatchResponse};
use crate::modules::gmail::{MailProvider, WatchRegistration};
use crate::modules::settings::cli::SETTINGS;
use crate::{base64_decode_url_safe, raise_error, rustticket_version};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{error, warn};

const HISTORY_PAGE_SIZE: u32 = 100;

pub struct GmailClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    access_token: String,
}

impl GmailClient {
    pub fn new(
        base_url: impl Into<String>,
        user_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> RustTicketResult<Self> {
        let http = reqwest::ClientBuilder::new()
            .user_agent(format!("RustTicket/{}", rustticket_version!()))
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                raise_error!(
                    format!("Failed to build HTTP client: {:#?}", e),
                    ErrorCode::InternalError
                )
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
            access_token: access_token.into(),
        })
    }

    /// Reads the OAuth2 access token from the configured token file.
    /// Token refresh is owned by the deployment environment, not this
    /// service; only a usable access token is expected here.
    pub fn from_settings() -> RustTicketResult<Self> {
        let path = &SETTINGS.rustticket_gmail_token_file;
        let raw = std::fs::read_to_string(path).map_err(|e| {
            raise_error!(
                format!("Gmail token not found at {}: {:#?}", path, e),
                ErrorCode::MissingConfiguration
            )
        })?;
        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            raise_error!(
                format!("Gmail token file {} is not valid JSON: {:#?}", path, e),
                ErrorCode::MissingConfiguration
            )
        })?;
        let token = value
            .get("access_token")
            .or_else(|| value.get("token"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                raise_error!(
                    format!("Gmail token file {} carries no access token", path),
                    ErrorCode::MissingConfiguration
                )
            })?;
        Self::new(
            SETTINGS.rustticket_gmail_api_url.clone(),
            SETTINGS.rustticket_gmail_user_id.clone(),
            token,
        )
    }

    async fn get_json(&self, url: &str) -> RustTicketResult<serde_json::Value> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::NetworkError))?;
        let status = response.status();
        if !status.is_success() {
            let code = if status == reqwest::StatusCode::NOT_FOUND {
                ErrorCode::GmailApiInvalidHistoryId
            } else {
                ErrorCode::GmailApiCallFailed
            };
            let body = response.text().await.unwrap_or_default();
            return Err(raise_error!(
                format!("Gmail API returned {}: {}", status, body),
                code
            ));
        }
        response
            .json()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> RustTicketResult<serde_json::Value> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::NetworkError))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(raise_error!(
                format!("Gmail API returned {}: {}", status, body),
                ErrorCode::GmailApiCallFailed
            ));
        }
        response
            .json()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))
    }

    async fn download_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> RustTicketResult<Vec<u8>> {
        let url = format!(
            "{}/users/{}/messages/{}/attachments/{}",
            self.base_url, self.user_id, message_id, attachment_id
        );
        let value = self.get_json(&url).await?;
        let body = serde_json::from_value::<PartBody>(value).map_err(|e| {
            raise_error!(
                format!(
                    "Failed to deserialize Gmail API response into PartBody: {:#?}. Possible model mismatch or API change.",
                    e
                ),
                ErrorCode::InternalError
            )
        })?;
        match body {
            PartBody::Body { data, .. } => base64_decode_url_safe!(data).map_err(|e| {
                raise_error!(
                    format!("Failed to decode attachment content: {}", e),
                    ErrorCode::InternalError
                )
            }),
            _ => Err(raise_error!(
                format!(
                    "Attachment {} of message {} carries no data",
                    attachment_id, message_id
                ),
                ErrorCode::GmailApiCallFailed
            )),
        }
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn list_added_message_ids(
        &self,
        start_history_id: u64,
        end_history_id: u64,
    ) -> RustTicketResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = format!(
                "{}/users/{}/history?startHistoryId={}&historyTypes=messageAdded&maxResults={}",
                self.base_url, self.user_id, start_history_id, HISTORY_PAGE_SIZE
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", token));
            }
            let value = self.get_json(&url).await.map_err(|e| {
                raise_error!(
                    format!(
                        "Gmail API error listing history {}-{}: {}",
                        start_history_id, end_history_id, e
                    ),
                    e.code()
                )
            })?;
            let list = serde_json::from_value::<HistoryList>(value).map_err(|e| {
                raise_error!(
                    format!(
                        "Failed to deserialize Gmail API response into HistoryList: {:#?}. Possible model mismatch or API change.",
                        e
                    ),
                    ErrorCode::InternalError
                )
            })?;
            for history in list.history {
                for added in history.messages_added {
                    if !added.message.id.is_empty() {
                        ids.push(added.message.id);
                    }
                }
            }
            page_token = list.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(ids)
    }

    async fn fetch_message(&self, message_id: &str) -> RustTicketResult<RawMessage> {
        let url = format!(
            "{}/users/{}/messages/{}?format=full",
            self.base_url, self.user_id, message_id
        );
        let value = match self.get_json(&url).await {
            Ok(value) => value,
            Err(e) => {
                error!("Gmail API error fetching message {}: {:?}", message_id, e);
                return Ok(RawMessage::default());
            }
        };
        let message = match serde_json::from_value::<FullMessage>(value) {
            Ok(message) => message,
            Err(e) => {
                error!(
                    "Failed to deserialize Gmail message {}: {:#?}",
                    message_id, e
                );
                return Ok(RawMessage::default());
            }
        };

        let headers = extract_headers(&message.payload.headers);
        let body_text = extract_plain_text(&message.payload);
        let body_html = extract_html(&message.payload).unwrap_or_default();

        let mut attachments = Vec::new();
        for part in attachment_parts(&message.payload) {
            let data = match &part.body {
                PartBody::Body { data, .. } => match base64_decode_url_safe!(data) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(
                            "Failed to decode attachment '{}' of message {}: {}",
                            part.filename, message_id, e
                        );
                        continue;
                    }
                },
                PartBody::Attachment { attachment_id, .. } => {
                    match self.download_attachment(message_id, attachment_id).await {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            warn!(
                                "Failed to download attachment '{}' of message {}: {:?}",
                                part.filename, message_id, e
                            );
                            continue;
                        }
                    }
                }
                PartBody::Empty { .. } => continue,
            };
            attachments.push(Attachment {
                filename: part.filename.clone(),
                mime_type: part.mime_type.clone(),
                data,
                is_inline: part_is_inline_disposition(part),
                content_id: part_content_id(part),
            });
        }

        let resolution = resolve_inline(&body_html, attachments);
        Ok(RawMessage {
            from: headers.from,
            subject: headers.subject,
            date: headers.date,
            message_id: headers.message_id,
            body_text,
            body_html: resolution.html,
            attachments: resolution.attachments,
            inline_parts: resolution.inline_parts,
            inline_map: resolution.inline_map,
        })
    }

    async fn register_watch(
        &self,
        project_id: &str,
        topic: &str,
    ) -> RustTicketResult<WatchRegistration> {
        let url = format!("{}/users/{}/watch", self.base_url, self.user_id);
        let body = json!({
            "topicName": format!("projects/{}/topics/{}", project_id, topic),
            "labelIds": ["INBOX"],
            "labelFilterAction": "include",
        });
        let value = self.post_json(&url, &body).await?;
        let response = serde_json::from_value::<WatchResponse>(value).map_err(|e| {
            raise_error!(
                format!(
                    "Failed to deserialize Gmail API response into WatchResponse: {:#?}. Possible model mismatch or API change.",
                    e
                ),
                ErrorCode::InternalError
            )
        })?;
        let history_id = response.history_id.parse::<u64>().map_err(|e| {
            raise_error!(
                format!("Failed to parse watch historyId: {}", e),
                ErrorCode::InternalError
            )
        })?;
        let expiration = response.expiration.parse::<i64>().unwrap_or(0);
        Ok(WatchRegistration {
            history_id,
            expiration,
        })
    }
}
