// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::render::RenderFormat;
use clap::{builder::ValueParser, Parser};
use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "rustticket",
    about = "A service that turns inbound Gmail notifications into Jira tickets,
    converting each message into a structured description exactly once.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// rustticket log level (default: "info")
    #[clap(
        long,
        default_value = "info",
        env,
        help = "Set the log level for rustticket"
    )]
    pub rustticket_log_level: String,

    /// Enable ANSI logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub rustticket_ansi_logs: bool,

    /// Enable log file output (default: false)
    /// If false, logs will be printed to stdout
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable log file output (otherwise logs go to stdout)"
    )]
    pub rustticket_log_to_file: bool,

    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of rotated server log files to keep"
    )]
    pub rustticket_max_server_log_files: usize,

    /// rustticket HTTP port (default: 15730)
    #[clap(
        long,
        default_value = "15730",
        env,
        help = "Set the HTTP port for rustticket"
    )]
    pub rustticket_http_port: i32,

    /// The IP address that the service binds to, in IPv4 format (e.g., 192.168.1.1).
    #[clap(
        long,
        env,
        default_value = "0.0.0.0",
        help = "The IP address that the service binds to, in IPv4 format (e.g., 192.168.1.1).",
        value_parser = ValueParser::new(|s: &str| {
            if s.parse::<std::net::Ipv4Addr>().is_err() {
                return Err("The bind IP address must be a valid IPv4 address.".to_string());
            }
            Ok(s.to_string())
        })
    )]
    pub rustticket_bind_ip: Option<String>,

    /// Root directory for persisted state and logs
    #[clap(
        long,
        default_value = "rustticket_data",
        env,
        help = "Set the root data directory for rustticket"
    )]
    pub rustticket_root_dir: String,

    /// Base URL of the Gmail REST API
    #[clap(
        long,
        default_value = "https://gmail.googleapis.com/gmail/v1",
        env,
        help = "Set the base URL of the Gmail REST API"
    )]
    pub rustticket_gmail_api_url: String,

    /// Gmail user id to act as (default: "me")
    #[clap(
        long,
        default_value = "me",
        env,
        help = "Set the Gmail user id the service reads mail for"
    )]
    pub rustticket_gmail_user_id: String,

    /// Path of the JSON file holding the Gmail OAuth2 access token
    #[clap(
        long,
        default_value = "token.json",
        env,
        help = "Set the path of the Gmail OAuth2 token file"
    )]
    pub rustticket_gmail_token_file: String,

    /// GCP project hosting the Pub/Sub topic used by the Gmail watch
    #[clap(long, env, help = "Set the GCP project id for the Gmail watch topic")]
    pub rustticket_gcp_project_id: Option<String>,

    /// Pub/Sub topic the Gmail watch publishes notifications to
    #[clap(long, env, help = "Set the Pub/Sub topic name for the Gmail watch")]
    pub rustticket_pubsub_topic: Option<String>,

    /// Sender addresses allowed to open tickets (empty = accept all)
    #[clap(
        long,
        default_value = "",
        env,
        help = "Set the allowed sender addresses (comma-separated list; empty accepts all senders)",
        value_parser = ValueParser::new(|s: &str| -> Result<HashSet<String>, String> {
            let set: HashSet<String> = s
                .split(',')
                .map(|sender| sender.trim().to_ascii_lowercase())
                .filter(|sender| !sender.is_empty())
                .collect();
            Ok(set)
        })
    )]
    pub rustticket_allowed_senders: HashSet<String>,

    /// JSON object mapping sender domains to client names, e.g. {"example.com": "Example"}
    #[clap(
        long,
        default_value = "{}",
        env,
        help = "Set the sender-domain to client-name mapping as a JSON object",
        value_parser = ValueParser::new(|s: &str| -> Result<HashMap<String, String>, String> {
            serde_json::from_str::<HashMap<String, String>>(s)
                .map_err(|e| format!("The domain-to-client mapping must be a JSON object of strings: {}", e))
        })
    )]
    pub rustticket_domain_client_map: HashMap<String, String>,

    /// Jira site URL, e.g. https://yourcompany.atlassian.net
    #[clap(long, env, help = "Set the Jira site URL")]
    pub rustticket_jira_url: String,

    /// Jira account used for API calls
    #[clap(long, env, help = "Set the Jira user (email) used for basic auth")]
    pub rustticket_jira_user: String,

    /// Jira API token paired with the Jira user
    #[clap(long, env, help = "Set the Jira API token used for basic auth")]
    pub rustticket_jira_api_token: String,

    /// Project key new tickets are created under
    #[clap(long, env, help = "Set the Jira project key for created tickets")]
    pub rustticket_jira_project_key: String,

    /// Custom field id carrying the client value, e.g. customfield_10000
    #[clap(long, env, help = "Set the Jira custom field id that stores the client")]
    pub rustticket_jira_client_field_id: String,

    /// Default assignee email for created tickets
    #[clap(long, env, help = "Set the default assignee email for created tickets")]
    pub rustticket_jira_assignee: Option<String>,

    /// Maximum attachment size forwarded to Jira, in bytes (default: 10 MiB)
    #[clap(
        long,
        default_value = "10485760",
        env,
        help = "Set the maximum attachment size uploaded to Jira, in bytes"
    )]
    pub rustticket_max_attachment_bytes: u64,

    /// MIME types allowed for attachment upload (empty = accept all)
    #[clap(
        long,
        default_value = "application/pdf,image/png,image/jpeg,application/vnd.openxmlformats-officedocument.wordprocessingml.document,application/msword",
        env,
        help = "Set the MIME types allowed for attachment upload (comma-separated; empty accepts all)",
        value_parser = ValueParser::new(|s: &str| -> Result<Vec<String>, String> {
            let list: Vec<String> = s
                .split(',')
                .map(|mime| mime.trim().to_string())
                .filter(|mime| !mime.is_empty())
                .collect();
            Ok(list)
        })
    )]
    pub rustticket_allowed_attachment_mime: Vec<String>,

    /// Globally enable or disable attachment upload (default: true)
    #[clap(
        long,
        default_value = "true",
        env,
        help = "Enable or disable attachment upload to Jira"
    )]
    pub rustticket_attachment_upload_enabled: bool,

    /// Upload inline images as regular attachments (default: true)
    #[clap(
        long,
        default_value = "true",
        env,
        help = "Upload inline images as regular ticket attachments"
    )]
    pub rustticket_attach_inline_images: bool,

    /// Attach a full-fidelity rendering of the HTML body (default: true)
    #[clap(
        long,
        default_value = "true",
        env,
        help = "Attach a full-fidelity rendering of the source HTML to each ticket"
    )]
    pub rustticket_preserve_html_render: bool,

    /// Format of the full-fidelity rendering (default: pdf)
    #[clap(
        long,
        value_enum,
        default_value = "pdf",
        env,
        help = "Set the format of the full-fidelity rendering (pdf or png)"
    )]
    pub rustticket_html_render_format: RenderFormat,

    /// Chat-completions endpoint used for classification
    #[clap(
        long,
        default_value = "https://api.openai.com/v1/chat/completions",
        env,
        help = "Set the chat-completions endpoint used for classification"
    )]
    pub rustticket_openai_api_url: String,

    /// API key for the classification endpoint
    #[clap(long, env, help = "Set the API key for the classification endpoint")]
    pub rustticket_openai_api_key: String,

    /// Model used for classification (default: gpt-4)
    #[clap(
        long,
        default_value = "gpt-4",
        env,
        help = "Set the model used for classification"
    )]
    pub rustticket_openai_model: String,

    /// Known client names offered to the classifier (comma-separated)
    #[clap(
        long,
        default_value = "",
        env,
        help = "Set the known client names offered to the classifier (comma-separated)",
        value_parser = ValueParser::new(|s: &str| -> Result<Vec<String>, String> {
            let list: Vec<String> = s
                .split(',')
                .map(|client| client.trim().to_string())
                .filter(|client| !client.is_empty())
                .collect();
            Ok(list)
        })
    )]
    pub rustticket_known_clients: Vec<String>,
}

impl Settings {
    #[cfg(test)]
    fn new_for_test() -> Self {
        Self {
            rustticket_log_level: "info".to_string(),
            rustticket_ansi_logs: false,
            rustticket_log_to_file: false,
            rustticket_max_server_log_files: 5,
            rustticket_http_port: 15730,
            rustticket_bind_ip: None,
            rustticket_root_dir: std::env::temp_dir()
                .join("rustticket_test_data")
                .to_string_lossy()
                .into_owned(),
            rustticket_gmail_api_url: "https://gmail.googleapis.com/gmail/v1".to_string(),
            rustticket_gmail_user_id: "me".to_string(),
            rustticket_gmail_token_file: "token.json".to_string(),
            rustticket_gcp_project_id: None,
            rustticket_pubsub_topic: None,
            rustticket_allowed_senders: HashSet::new(),
            rustticket_domain_client_map: HashMap::new(),
            rustticket_jira_url: "https://example.atlassian.net".to_string(),
            rustticket_jira_user: "user@example.com".to_string(),
            rustticket_jira_api_token: "token".to_string(),
            rustticket_jira_project_key: "TEST".to_string(),
            rustticket_jira_client_field_id: "customfield_10000".to_string(),
            rustticket_jira_assignee: None,
            rustticket_max_attachment_bytes: 10 * 1024 * 1024,
            rustticket_allowed_attachment_mime: vec![
                "application/pdf".to_string(),
                "image/png".to_string(),
                "image/jpeg".to_string(),
            ],
            rustticket_attachment_upload_enabled: true,
            rustticket_attach_inline_images: true,
            rustticket_preserve_html_render: true,
            rustticket_html_render_format: RenderFormat::Pdf,
            rustticket_openai_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            rustticket_openai_api_key: "sk-test".to_string(),
            rustticket_openai_model: "gpt-4".to_string(),
            rustticket_known_clients: Vec::new(),
        }
    }
}
