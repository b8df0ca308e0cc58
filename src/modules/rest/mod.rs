// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::{code::ErrorCode, RustTicketResult};
use crate::modules::settings::cli::SETTINGS;
use crate::modules::sync::SyncController;
use crate::raise_error;
use handlers::{healthz, pubsub_handler};
use poem::listener::TcpListener;
use poem::middleware::CatchPanic;
use poem::{get, post, EndpointExt, Route, Server};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod handlers;

pub async fn start_http_server(controller: Arc<SyncController>) -> RustTicketResult<()> {
    let listener = TcpListener::bind((
        SETTINGS
            .rustticket_bind_ip
            .clone()
            .unwrap_or("0.0.0.0".into()),
        SETTINGS.rustticket_http_port as u16,
    ));

    let app = Route::new()
        .at("/pubsub", post(pubsub_handler))
        .at("/healthz", get(healthz))
        .with(CatchPanic::new())
        .data(controller);

    info!(
        "HTTP server listening on port {}",
        SETTINGS.rustticket_http_port
    );
    Server::new(listener)
        .run_with_graceful_shutdown(app, shutdown_signal(), Some(Duration::from_secs(5)))
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
