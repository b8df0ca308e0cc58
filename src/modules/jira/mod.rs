// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::classify::IssueType;
use crate::modules::document::AdfDocument;
use crate::modules::error::{code::ErrorCode, RustTicketResult};
use crate::modules::settings::cli::SETTINGS;
use crate::{raise_error, rustticket_version};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

pub mod attachments;


/// Outcome of one attachment upload attempt against the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// The tracker refused the file with this HTTP status.
    Rejected(u16),
    TransportError,
}

/// The issue tracker contract. Injected as a trait object so tests
/// substitute fakes; see the message processor.
#[async_trait]
pub trait TicketTracker: Send + Sync {
    /// Creates a ticket and returns its key, or None when the tracker
    /// refused the request (logged by the implementation).
    async fn create_ticket(
        &self,
        summary: &str,
        description: &AdfDocument,
        client: &str,
        issue_type: IssueType,
        labels: &[String],
    ) -> Option<String>;

    async fn upload_attachment(
        &self,
        ticket_key: &str,
        filename: &str,
        data: Vec<u8>,
        mime_type: &str,
    ) -> UploadOutcome;

    async fn update_description(
        &self,
        ticket_key: &str,
        description: &AdfDocument,
    ) -> RustTicketResult<()>;
}

pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    api_token: String,
    project_key: String,
    client_field_id: String,
    assignee: Option<String>,
}

impl JiraClient {
    pub fn new(
        base_url: impl Into<String>,
        user: impl Into<String>,
        api_token: impl Into<String>,
        project_key: impl Into<String>,
        client_field_id: impl Into<String>,
        assignee: Option<String>,
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
            user: user.into(),
            api_token: api_token.into(),
            project_key: project_key.into(),
            client_field_id: client_field_id.into(),
            assignee,
        })
    }

    pub fn from_settings() -> RustTicketResult<Self> {
        Self::new(
            SETTINGS.rustticket_jira_url.clone(),
            SETTINGS.rustticket_jira_user.clone(),
            SETTINGS.rustticket_jira_api_token.clone(),
            SETTINGS.rustticket_jira_project_key.clone(),
            SETTINGS.rustticket_jira_client_field_id.clone(),
            SETTINGS.rustticket_jira_assignee.clone(),
        )
    }
}

#[async_trait]
impl TicketTracker for JiraClient {
    async fn create_ticket(
        &self,
        summary: &str,
        description: &AdfDocument,
        client: &str,
        issue_type: IssueType,
        labels: &[String],
    ) -> Option<String> {
        let url = format!("{}/rest/api/3/issue", self.base_url);
        let mut fields = json!({
            "project": {"key": self.project_key},
            "summary": summary,
            "description": description,
            "issuetype": {"name": issue_type.as_str()},
            "labels": labels,
            "priority": {"name": "Medium"},
        });
        fields[self.client_field_id.as_str()] = json!([{"value": client}]);
        if let Some(assignee) = &self.assignee {
            fields["assignee"] = json!({"emailAddress": assignee});
        }
        let payload = json!({ "fields": fields });

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.user, Some(&self.api_token))
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await;
        match response {
            Ok(response) if response.status() == reqwest::StatusCode::CREATED => {
                let value: serde_json::Value = response.json().await.ok()?;
                let key = value.get("key").and_then(|k| k.as_str())?.to_string();
                info!("Jira ticket created: {}", key);
                Some(key)
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!("Failed to create Jira ticket: {} {}", status, body);
                None
            }
            Err(e) => {
                error!("Request to Jira failed: {:#?}", e);
                None
            }
        }
    }

    async fn upload_attachment(
        &self,
        ticket_key: &str,
        filename: &str,
        data: Vec<u8>,
        mime_type: &str,
    ) -> UploadOutcome {
        let url = format!(
            "{}/rest/api/3/issue/{}/attachments",
            self.base_url, ticket_key
        );
        let part = match reqwest::multipart::Part::bytes(data.clone())
            .file_name(filename.to_string())
            .mime_str(mime_type)
        {
            Ok(part) => part,
            // An unparseable MIME type falls back to an untyped part.
            Err(_) => reqwest::multipart::Part::bytes(data).file_name(filename.to_string()),
        };
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.user, Some(&self.api_token))
            .header("X-Atlassian-Token", "no-check")
            .multipart(form)
            .send()
            .await;
        match response {
            Ok(response) if response.status().is_success() => UploadOutcome::Uploaded,
            Ok(response) => {
                let status = response.status();
                error!(
                    "Jira refused attachment '{}' on {}: {}",
                    filename, ticket_key, status
                );
                UploadOutcome::Rejected(status.as_u16())
            }
            Err(e) => {
                error!(
                    "Failed to upload attachment '{}' to {}: {:#?}",
                    filename, ticket_key, e
                );
                UploadOutcome::TransportError
            }
        }
    }

    async fn update_description(
        &self,
        ticket_key: &str,
        description: &AdfDocument,
    ) -> RustTicketResult<()> {
        let url = format!("{}/rest/api/3/issue/{}", self.base_url, ticket_key);
        let payload = json!({ "fields": { "description": description } });
        let response = self
            .http
            .put(&url)
            .basic_auth(&self.user, Some(&self.api_token))
            .json(&payload)
            .send()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::NetworkError))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(raise_error!(
                format!(
                    "Failed to update description of {}: {} {}",
                    ticket_key, status, body
                ),
                ErrorCode::JiraApiCallFailed
            ));
        }
        Ok(())
    }
}
