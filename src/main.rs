// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use mimalloc::MiMalloc;
use modules::{
    classify::{Classifier, OpenAiClassifier},
    database::manager::DatabaseManager,
    error::RustTicketResult,
    gmail::{client::GmailClient, watch::WatchRenewalTask, MailProvider},
    jira::{JiraClient, TicketTracker},
    logger,
    processor::{MessageProcessor, ProcessorConfig},
    rest::start_http_server,
    settings::dir::{DataDirManager, DATA_DIR_MANAGER},
    state::StateStore,
    sync::SyncController,
};
use std::sync::Arc;
use tracing::info;

mod modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

static LOGO: &str = r#"
  ____            _  _____ _      _        _
 |  _ \ _   _ ___| ||_   _(_) ___| | _____| |_
 | |_) | | | / __| __|| | | |/ __| |/ / _ \ __|
 |  _ <| |_| \__ \ |_ | | | | (__|   <  __/ |_
 |_| \_\\__,_|___/\__||_| |_|\___|_|\_\___|\__|

"#;

#[tokio::main]
async fn main() -> RustTicketResult<()> {
    logger::initialize_logging();
    info!("{}", LOGO);
    info!("Starting rustticket-server");
    info!("Version:  {}", rustticket_version!());
    info!("Git:      [{}]", env!("GIT_HASH"));

    if let Err(error) = run().await {
        eprintln!("{:?}", error);
        return Err(error);
    }
    Ok(())
}

async fn run() -> RustTicketResult<()> {
    DataDirManager::initialize()?;
    let database = DatabaseManager::open(&DATA_DIR_MANAGER.meta_db)?;
    let state = Arc::new(StateStore::new(database));

    let mail: Arc<dyn MailProvider> = Arc::new(GmailClient::from_settings()?);
    let classifier: Arc<dyn Classifier> = Arc::new(OpenAiClassifier::from_settings()?);
    let tracker: Arc<dyn TicketTracker> = Arc::new(JiraClient::from_settings()?);
    info!("Configuration validated");

    let processor = Arc::new(MessageProcessor::new(
        mail.clone(),
        classifier,
        tracker,
        state.clone(),
        ProcessorConfig::from_settings(),
    ));
    let controller = Arc::new(SyncController::new(mail.clone(), processor, state.clone()));

    WatchRenewalTask::start(mail, state);

    start_http_server(controller).await
}
