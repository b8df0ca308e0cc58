// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::settings::cli::SETTINGS;
use crate::raise_error;
use crate::{
    modules::error::{code::ErrorCode, RustTicketResult},
    rustticket_version,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum IssueType {
    Bug,
    #[default]
    Task,
    Story,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Bug => "Bug",
            IssueType::Task => "Task",
            IssueType::Story => "Story",
        }
    }

    /// Anything the classifier emits outside the known set falls back to Task.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Bug" => IssueType::Bug,
            "Story" => IssueType::Story,
            _ => IssueType::Task,
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub issue_type: IssueType,
    pub client: String,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            issue_type: IssueType::Task,
            client: "N/A".to_string(),
        }
    }
}

/// The classification contract. An absent result is a valid outcome, not an
/// error; callers fall back to `Classification::default()`.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, subject: &str, body: &str) -> Option<Classification>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(rename = "issueType")]
    issue_type: Option<String>,
    client: Option<String>,
}

/// Parses the model's reply, which must be a bare JSON object.
pub(crate) fn parse_classification(content: &str) -> Option<Classification> {
    let raw: RawClassification = serde_json::from_str(content).ok()?;
    Some(Classification {
        issue_type: raw
            .issue_type
            .map(|label| IssueType::from_label(&label))
            .unwrap_or_default(),
        client: raw.client.unwrap_or_else(|| "N/A".to_string()),
    })
}

pub struct OpenAiClassifier {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    known_clients: Vec<String>,
}

impl OpenAiClassifier {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        known_clients: Vec<String>,
    ) -> RustTicketResult<Self> {
        let http = reqwest::ClientBuilder::new()
            .user_agent(format!("RustTicket/{}", rustticket_version!()))
            .timeout(Duration::from_secs(30))
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
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            known_clients,
        })
    }

    pub fn from_settings() -> RustTicketResult<Self> {
        Self::new(
            SETTINGS.rustticket_openai_api_url.clone(),
            SETTINGS.rustticket_openai_api_key.clone(),
            SETTINGS.rustticket_openai_model.clone(),
            SETTINGS.rustticket_known_clients.clone(),
        )
    }

    fn build_prompt(&self, subject: &str, body: &str) -> String {
        format!(
            r#"
You are an assistant that classifies emails into JIRA tickets.
Based on the following subject and body, return a JSON object with:
- issueType: "Bug", "Task", or "Story"
- client: Determine the client from the email address or email body. Use the domain part (e.g., oetraining.com -> OETraining). Match against this list of known clients: [{}], if not found - put "N/A"

Email subject: {}
Email body: {}

Respond only with a JSON object, nothing else.
"#,
            self.known_clients.join(", "),
            subject,
            body
        )
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, subject: &str, body: &str) -> Option<Classification> {
        let payload = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": self.build_prompt(subject, body)}],
            "temperature": 0.2,
        });
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await;
        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!("Classifier call failed: {} {}", status, body);
                return None;
            }
            Err(e) => {
                error!("Classifier call failed: {:#?}", e);
                return None;
            }
        };
        let chat: ChatResponse = match response.json().await {
            Ok(chat) => chat,
            Err(e) => {
                error!("Failed to parse classifier response: {:#?}", e);
                return None;
            }
        };
        let content = chat
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_else(|| "{}".to_string());
        info!("Classifier response: {}", content);
        parse_classification(&content)
    }
}
