// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::sync::{NotificationStatus, SyncController};
use poem::http::StatusCode;
use poem::web::{Data, Json};
use poem::{handler, IntoResponse, Response};
use std::sync::Arc;

#[handler]
pub async fn pubsub_handler(
    Data(controller): Data<&Arc<SyncController>>,
    Json(envelope): Json<serde_json::Value>,
) -> Response {
    match controller.on_notification(envelope).await {
        NotificationStatus::BadRequest => {
            (StatusCode::BAD_REQUEST, "Bad Request").into_response()
        }
        NotificationStatus::NoContent => StatusCode::NO_CONTENT.into_response(),
    }
}

#[handler]
pub async fn healthz() -> &'static str {
    "ok"
}
