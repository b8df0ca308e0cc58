// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::RustTicketResult;
use crate::modules::gmail::MailProvider;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::state::StateStore;
use crate::utc_now;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const RENEWAL_CHECK_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);
const RENEWAL_THRESHOLD_MS: i64 = 24 * 60 * 60 * 1000;

/// Periodically keeps the Gmail push-notification watch alive. Gmail expires
/// a watch after about seven days; renewal happens once less than a day
/// remains.
pub struct WatchRenewalTask;

impl WatchRenewalTask {
    pub fn start(mail: Arc<dyn MailProvider>, state: Arc<StateStore>) {
        let (Some(project), Some(topic)) = (
            SETTINGS.rustticket_gcp_project_id.clone(),
            SETTINGS.rustticket_pubsub_topic.clone(),
        ) else {
            info!("Watch renewal task skipped: no GCP project or Pub/Sub topic configured");
            return;
        };
        info!("Task 'watch-renewal' started");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RENEWAL_CHECK_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(e) = renew_if_needed(mail.as_ref(), &state, &project, &topic).await {
                    warn!("Task 'watch-renewal' failed: {:?}", e);
                }
            }
        });
    }
}

pub async fn register_watch(
    mail: &dyn MailProvider,
    state: &StateStore,
    project_id: &str,
    topic: &str,
) -> RustTicketResult<()> {
    let registration = mail.register_watch(project_id, topic).await?;
    state
        .set_watch(registration.history_id, registration.expiration)
        .await?;
    state.set_watermark(registration.history_id).await?;
    info!(
        "Registered Gmail watch: historyId={} expiration={}",
        registration.history_id, registration.expiration
    );
    Ok(())
}

pub async fn renew_if_needed(
    mail: &dyn MailProvider,
    state: &StateStore,
    project_id: &str,
    topic: &str,
) -> RustTicketResult<()> {
    let Some(watch) = state.watch().await? else {
        info!("No existing watch; registering new one");
        return register_watch(mail, state, project_id, topic).await;
    };
    let millis_left = watch.expiration - utc_now!();
    if millis_left < RENEWAL_THRESHOLD_MS {
        info!("Watch expiring in {} ms; renewing", millis_left);
        register_watch(mail, state, project_id, topic).await
    } else {
        info!("Watch still valid for {} ms", millis_left);
        Ok(())
    }
}
